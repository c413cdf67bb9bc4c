//! CLI module for Podsub.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Podsub - audio player with synchronized, translated subtitles
///
/// Transcribes an audio file once, caches the result by content hash, and
/// follows playback word by word. Run without a command to list recent files.
#[derive(Parser, Debug)]
#[command(name = "podsub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play an audio file with live subtitles
    Play {
        /// Audio file (.wav or .mp3), or a content hash with --hash
        input: String,

        /// Treat the input as a cached content hash
        #[arg(long)]
        hash: bool,

        /// Do not translate a fresh transcription automatically
        #[arg(long)]
        no_translate: bool,

        /// Translation backend (google, gemini, silicon_cloud)
        #[arg(short, long)]
        translator: Option<String>,

        /// Start with translations hidden
        #[arg(long)]
        hide_translation: bool,
    },

    /// List recently played files
    Recent,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value (e.g. translation.provider gemini)
    Set {
        /// Dotted configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_is_allowed() {
        let cli = Cli::try_parse_from(["podsub", "-vv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_play_flags() {
        let cli = Cli::try_parse_from([
            "podsub",
            "play",
            "episode.mp3",
            "--translator",
            "gemini",
            "--hide-translation",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Play {
                input,
                hash,
                translator,
                hide_translation,
                no_translate,
            }) => {
                assert_eq!(input, "episode.mp3");
                assert!(!hash);
                assert!(!no_translate);
                assert!(hide_translation);
                assert_eq!(translator.as_deref(), Some("gemini"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_config_set() {
        let cli =
            Cli::try_parse_from(["podsub", "config", "set", "translation.provider", "gemini"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Set { .. }
            })
        ));
    }
}
