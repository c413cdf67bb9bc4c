//! Per-audio-file cache of transcriptions and translations.
//!
//! Layout under the data directory:
//!
//! - `audio_index.json`: content hash -> `{file_path, subtitle_file}`, the
//!   source of the recent-files list.
//! - `subtitles/<hash>.json`: one [`CacheRecord`] per audio file.
//!
//! Files are keyed by the MD5 of their full contents, so a renamed or moved
//! file still hits its cache.

use crate::error::{PodsubError, Result};
use crate::transcript::{TranslationMap, Utterance};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const INDEX_FILE: &str = "audio_index.json";
const SUBTITLE_DIR: &str = "subtitles";
const HASH_CHUNK_SIZE: usize = 4096;

/// Everything cached for one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CacheRecord {
    /// Transcribed utterances in time order.
    pub subtitles: Vec<Utterance>,
    /// Translations keyed by utterance index.
    #[serde(default)]
    pub translations: TranslationMap,
    /// Where the audio file lived when it was cached.
    #[serde(default)]
    pub file_path: String,
}

/// Audio index entry pointing at a cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file_path: String,
    pub subtitle_file: String,
    /// When the entry was last written. Missing in older indexes.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A cached file as shown in the recent-files list.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentFile {
    pub hash: String,
    pub file_path: PathBuf,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RecentFile {
    /// File name for display.
    pub fn display_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_path.to_string_lossy().to_string())
    }
}

/// Compute the lowercase hex MD5 of a file's contents.
pub fn file_hash(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PodsubError::FileNotFound(path.display().to_string())
        } else {
            PodsubError::Io(e)
        }
    })?;

    let mut hasher = Md5::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// On-disk cache rooted at the data directory.
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    index: BTreeMap<String, IndexEntry>,
}

impl CacheStore {
    /// Open the cache, creating the directory layout and an empty index if needed.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root.join(SUBTITLE_DIR))?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let content = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&content)
                .map_err(|e| PodsubError::Cache(format!("Corrupt audio index: {}", e)))?
        } else {
            BTreeMap::new()
        };

        let store = Self {
            root: root.to_path_buf(),
            index,
        };
        if !index_path.exists() {
            store.save_index()?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for a hash.
    pub fn record_path(&self, hash: &str) -> PathBuf {
        self.root.join(SUBTITLE_DIR).join(format!("{}.json", hash))
    }

    pub fn entry(&self, hash: &str) -> Option<&IndexEntry> {
        self.index.get(hash)
    }

    /// Whether a usable record exists for this hash.
    pub fn contains(&self, hash: &str) -> bool {
        self.index.contains_key(hash) && self.record_path(hash).exists()
    }

    /// Load the record for a hash.
    pub fn load_record(&self, hash: &str) -> Result<CacheRecord> {
        let path = self
            .entry(hash)
            .map(|e| PathBuf::from(&e.subtitle_file))
            .filter(|p| p.exists())
            .unwrap_or_else(|| self.record_path(hash));

        if !path.exists() {
            return Err(PodsubError::Cache(format!(
                "Subtitle file does not exist: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let record: CacheRecord = serde_json::from_str(&content)
            .map_err(|e| PodsubError::Cache(format!("Corrupt subtitle cache {}: {}", path.display(), e)))?;
        debug!(
            "Loaded {} utterances and {} translations from {}",
            record.subtitles.len(),
            record.translations.len(),
            path.display()
        );
        Ok(record)
    }

    /// Write the record for a hash.
    pub fn save_record(&self, hash: &str, record: &CacheRecord) -> Result<PathBuf> {
        let path = self.record_path(hash);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(record)?)?;
        info!("Subtitle cache saved to {}", path.display());
        Ok(path)
    }

    /// Record that `hash` belongs to `file_path` and persist the index.
    pub fn register(&mut self, hash: &str, file_path: &Path) -> Result<()> {
        let entry = IndexEntry {
            file_path: file_path.to_string_lossy().to_string(),
            subtitle_file: self.record_path(hash).to_string_lossy().to_string(),
            updated_at: Some(Utc::now()),
        };
        self.index.insert(hash.to_string(), entry);
        self.save_index()
    }

    /// Cached files, most recently updated first.
    pub fn recent_files(&self) -> Vec<RecentFile> {
        let mut files: Vec<RecentFile> = self
            .index
            .iter()
            .map(|(hash, entry)| RecentFile {
                hash: hash.clone(),
                file_path: PathBuf::from(&entry.file_path),
                updated_at: entry.updated_at,
            })
            .collect();
        files.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        files
    }

    fn save_index(&self) -> Result<()> {
        let path = self.root.join(INDEX_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&self.index)?)?;
        Ok(())
    }
}
