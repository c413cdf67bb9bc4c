//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, mut settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            if let Err(e) = settings.set_value(key, value) {
                Output::error(&e.to_string());
                return Err(e.into());
            }
            if settings.save_if_changed(config_path)? {
                Output::success(&format!("Set {} in {}", key, config_path.display()));
            } else {
                Output::info(&format!("{} is unchanged", key));
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
