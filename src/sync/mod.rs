//! Subtitle synchronization engine.
//!
//! - [`TimelineIndex`]: timestamp to utterance/word lookup.
//! - [`SubtitleDocument`]: rendered blocks and their character offsets.
//! - [`ProgressiveRenderer`]: one-block-per-tick reveal of new transcripts.
//! - [`HighlightController`]: keeps the surface highlight on the spoken word.
//! - [`TranslationMerge`]: concurrent translation and out-of-order merging.

pub mod document;
pub mod highlight;
pub mod merge;
pub mod renderer;
pub mod surface;
pub mod timeline;

pub use document::{Block, ReplaceOutcome, SubtitleDocument, WordPosition};
pub use highlight::{HighlightController, SyncChange};
pub use merge::{MergeProgress, MergeUpdate, TranslationEvent, TranslationMerge};
pub use renderer::{ProgressiveRenderer, RevealProgress, RevealState};
pub use surface::{Background, DisplaySurface, SpeakerTone, TextStyle, TextSurface};
pub use timeline::TimelineIndex;
