//! Recent command implementation.

use crate::cache::CacheStore;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the recent command.
pub fn run_recent(settings: &Settings) -> Result<()> {
    let store = match CacheStore::open(&settings.data_dir()) {
        Ok(store) => store,
        Err(e) => {
            Output::error(&format!("Failed to open subtitle cache: {}", e));
            return Err(e.into());
        }
    };

    let files = store.recent_files();
    if files.is_empty() {
        Output::info("No files played yet. Use 'podsub play <file>' to get started.");
        return Ok(());
    }

    Output::header(&format!("Recent Files ({})", files.len()));
    println!();
    for file in &files {
        Output::recent_file(file);
    }
    println!();
    Output::info("Replay one with 'podsub play --hash <hash>'.");

    Ok(())
}
