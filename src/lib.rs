//! Podsub - Audio Player with Synchronized Subtitles
//!
//! Plays an audio file with speaker-labeled subtitles that follow playback
//! word by word, with a translation under every subtitle.
//!
//! # Overview
//!
//! Podsub allows you to:
//! - Transcribe a local audio file with speaker diarization and word timings
//! - Translate every utterance through one of several backends
//! - Follow playback with utterance and word highlighting
//! - Replay any previously opened file instantly from its cache
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `transcript` - Utterance, word and translation data model
//! - `cache` - Content-hash keyed subtitle cache
//! - `transcription` - Speech-to-text transcription
//! - `translation` - Translation backends
//! - `playback` - Media playback abstraction
//! - `sync` - Timeline index, document model, reveal, highlight and merge
//! - `session` - Event loop tying the pieces together
//!
//! # Example
//!
//! ```rust,no_run
//! use podsub::config::Settings;
//! use podsub::playback::ClockPlayback;
//! use podsub::session::{Session, SessionObserver, UserNotice};
//! use podsub::sync::TextSurface;
//! use podsub::transcription::AssemblyAiTranscriber;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl SessionObserver for Printer {
//!     fn notice(&mut self, notice: UserNotice) {
//!         eprintln!("{}", notice);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let transcriber = Arc::new(AssemblyAiTranscriber::new("your-key")?);
//!     let playback = Arc::new(ClockPlayback::new(None));
//!
//!     let mut session = Session::new(
//!         settings,
//!         transcriber,
//!         playback,
//!         TextSurface::new(),
//!         Box::new(Printer),
//!     )?;
//!     session.load_file("episode.mp3".as_ref()).await?;
//!     session.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod playback;
pub mod session;
pub mod sync;
pub mod transcript;
pub mod transcription;
pub mod translation;

pub use error::{PodsubError, Result};
