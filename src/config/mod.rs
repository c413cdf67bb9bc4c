//! Configuration module for Podsub.
//!
//! Handles loading and saving application settings and API credentials.

mod settings;

pub use settings::{
    Credentials, GeneralSettings, PlaybackSettings, Settings, TranslationSettings,
};
