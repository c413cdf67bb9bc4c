//! CLI command implementations.

mod config;
mod play;
mod recent;

pub use config::run_config;
pub use play::run_play;
pub use recent::run_recent;
