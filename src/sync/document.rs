//! Rendered subtitle document and its position bookkeeping.
//!
//! Every utterance renders as one block:
//!
//! ```text
//! A: word word word\n
//! translation
//! ```
//!
//! Blocks after the first are preceded by a single `\n` separator that
//! belongs to no block. Blocks live in an arena indexed by utterance index;
//! each stores only segment lengths, and its words store offsets relative to
//! the block start. Absolute offsets come from a per-block start table that
//! is shifted when a translation changes length and rebuilt from scratch by
//! [`SubtitleDocument::rebuild`].

use super::surface::{DisplaySurface, SpeakerTone, TextStyle};
use crate::error::{PodsubError, Result};
use crate::transcript::{TranslationMap, Utterance};
use std::collections::HashMap;
use tracing::{debug, trace};

const PARAGRAPH_BREAK: &str = "\n";

/// Absolute character offsets of one rendered block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Utterance index.
    pub index: usize,
    pub document_start: usize,
    pub content_start: usize,
    pub translation_start: usize,
    pub translation_end: usize,
    pub document_end: usize,
    pub speaker: String,
}

/// Absolute character offsets and timing of one rendered word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordPosition {
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_time: i64,
    pub end_time: i64,
    /// Utterance (and block) the word belongs to.
    pub utterance_index: usize,
}

/// What `replace_translation` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Text was replaced; later offsets moved by `delta`.
    Applied { delta: isize },
    /// The block is not rendered yet; the text waits in the pending queue.
    Deferred,
    /// Translations are hidden; nothing on screen changed.
    Hidden,
}

#[derive(Debug, Clone)]
struct BlockSlot {
    speaker: String,
    label_len: usize,
    content_len: usize,
    translation_len: usize,
}

impl BlockSlot {
    fn translation_offset(&self) -> usize {
        self.label_len + self.content_len + PARAGRAPH_BREAK.len()
    }

    fn len(&self) -> usize {
        self.translation_offset() + self.translation_len
    }
}

#[derive(Debug, Clone, Copy)]
struct WordSlot {
    block: usize,
    rel_start: usize,
    rel_end: usize,
    start_time: i64,
    end_time: i64,
}

/// Subtitle blocks rendered onto a display surface.
pub struct SubtitleDocument<S> {
    surface: S,
    blocks: Vec<BlockSlot>,
    starts: Vec<usize>,
    words: Vec<WordSlot>,
    pending: HashMap<usize, String>,
    show_translation: bool,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl<S: DisplaySurface> SubtitleDocument<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            blocks: Vec::new(),
            starts: Vec::new(),
            words: Vec::new(),
            pending: HashMap::new(),
            show_translation: true,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn show_translation(&self) -> bool {
        self.show_translation
    }

    /// Change translation visibility. Takes effect on the next rebuild.
    pub fn set_show_translation(&mut self, show: bool) {
        self.show_translation = show;
    }

    /// Remove all blocks and text, keeping pending translations.
    pub fn clear(&mut self) {
        self.surface.clear();
        self.blocks.clear();
        self.starts.clear();
        self.words.clear();
    }

    /// Remove everything, including pending translations.
    pub fn reset(&mut self) {
        self.clear();
        self.pending.clear();
    }

    /// Replace the document with a plain status message and no blocks.
    pub fn show_message(&mut self, message: &str) {
        self.reset();
        self.surface.insert(0, message, TextStyle::Plain);
    }

    /// Character length of the rendered document.
    pub fn len(&self) -> usize {
        match (self.starts.last(), self.blocks.last()) {
            (Some(start), Some(slot)) => start + slot.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Append the block for utterance `index`.
    ///
    /// Blocks must be appended in utterance order. With no explicit
    /// translation, a pending one queued by [`replace_translation`] is used.
    /// The pending entry is dropped either way.
    ///
    /// [`replace_translation`]: SubtitleDocument::replace_translation
    pub fn append_block(
        &mut self,
        index: usize,
        utterance: &Utterance,
        translation: Option<&str>,
    ) -> Result<Block> {
        if index != self.blocks.len() {
            return Err(PodsubError::Sync(format!(
                "Block {} appended out of order (expected {})",
                index,
                self.blocks.len()
            )));
        }

        let mut offset = self.len();
        if index > 0 {
            self.surface.insert(offset, PARAGRAPH_BREAK, TextStyle::Plain);
            offset += PARAGRAPH_BREAK.len();
        }
        let block_start = offset;
        let tone = SpeakerTone::for_speaker(&utterance.speaker);

        let label = format!("{}: ", utterance.speaker);
        self.surface.insert(offset, &label, TextStyle::Speaker(tone));
        offset += char_len(&label);
        let content_start = offset;

        if utterance.words.is_empty() {
            self.surface
                .insert(offset, &utterance.text, TextStyle::Content(tone));
            offset += char_len(&utterance.text);
        }
        for (i, word) in utterance.words.iter().enumerate() {
            if i > 0 {
                self.surface.insert(offset, " ", TextStyle::Content(tone));
                offset += 1;
            }
            let word_len = char_len(&word.text);
            self.surface
                .insert(offset, &word.text, TextStyle::Content(tone));
            self.words.push(WordSlot {
                block: index,
                rel_start: offset - block_start,
                rel_end: offset + word_len - block_start,
                start_time: word.start,
                end_time: word.end,
            });
            offset += word_len;
        }
        let content_len = offset - content_start;

        self.surface.insert(offset, PARAGRAPH_BREAK, TextStyle::Plain);
        offset += PARAGRAPH_BREAK.len();

        let mut translation_len = 0;
        let pending = self.pending.remove(&index);
        if self.show_translation {
            let text = translation.map(str::to_string).or(pending);
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                self.surface.insert(offset, &text, TextStyle::Translation);
                translation_len = char_len(&text);
            }
        }

        self.blocks.push(BlockSlot {
            speaker: utterance.speaker.clone(),
            label_len: char_len(&label),
            content_len,
            translation_len,
        });
        self.starts.push(block_start);

        trace!("Appended block {} at {}", index, block_start);
        self.block(index)
            .ok_or_else(|| PodsubError::Sync(format!("Block {} missing after append", index)))
    }

    /// Replace the translation text of block `index` in place.
    ///
    /// Every later block (and its words) shifts by the change in length. If
    /// the block does not exist yet, the text is queued and used when the
    /// block is appended.
    pub fn replace_translation(&mut self, index: usize, text: &str) -> ReplaceOutcome {
        if index >= self.blocks.len() {
            self.pending.insert(index, text.to_string());
            debug!("Translation {} deferred until its block is rendered", index);
            return ReplaceOutcome::Deferred;
        }
        if !self.show_translation {
            return ReplaceOutcome::Hidden;
        }

        let start = self.starts[index] + self.blocks[index].translation_offset();
        let old_len = self.blocks[index].translation_len;
        let new_len = char_len(text);

        self.surface
            .replace(start, start + old_len, text, TextStyle::Translation);
        self.blocks[index].translation_len = new_len;

        let delta = new_len as isize - old_len as isize;
        if delta != 0 {
            for later in &mut self.starts[index + 1..] {
                *later = later.saturating_add_signed(delta);
            }
        }
        ReplaceOutcome::Applied { delta }
    }

    /// Rebuild every block from scratch.
    ///
    /// Stale offsets never survive a rebuild; translations come from the map
    /// first, then from the pending queue.
    pub fn rebuild(&mut self, utterances: &[Utterance], translations: &TranslationMap) -> Result<()> {
        self.clear();
        for (index, utterance) in utterances.iter().enumerate() {
            let text = translations.get(&index).map(|t| t.text.as_str());
            self.append_block(index, utterance, text)?;
        }
        debug!(
            "Document rebuilt: {} blocks, {} words",
            self.blocks.len(),
            self.words.len()
        );
        Ok(())
    }

    /// Absolute offsets of block `index`.
    pub fn block(&self, index: usize) -> Option<Block> {
        let slot = self.blocks.get(index)?;
        let start = *self.starts.get(index)?;
        let translation_start = start + slot.translation_offset();
        Some(Block {
            index,
            document_start: start,
            content_start: start + slot.label_len,
            translation_start,
            translation_end: translation_start + slot.translation_len,
            document_end: start + slot.len(),
            speaker: slot.speaker.clone(),
        })
    }

    /// All blocks in order.
    pub fn blocks(&self) -> Vec<Block> {
        (0..self.blocks.len()).filter_map(|i| self.block(i)).collect()
    }

    /// Absolute offsets of word `index` (global, in utterance order).
    pub fn word(&self, index: usize) -> Option<WordPosition> {
        let slot = self.words.get(index)?;
        let start = *self.starts.get(slot.block)?;
        Some(WordPosition {
            start_offset: start + slot.rel_start,
            end_offset: start + slot.rel_end,
            start_time: slot.start_time,
            end_time: slot.end_time,
            utterance_index: slot.block,
        })
    }

    /// Block containing a character offset (block ends inclusive).
    pub fn block_at(&self, offset: usize) -> Option<usize> {
        let index = self.starts.partition_point(|&s| s <= offset).checked_sub(1)?;
        let block = self.block(index)?;
        (offset <= block.document_end).then_some(index)
    }

    /// Pending translation for a block that is not rendered yet.
    pub fn pending_translation(&self, index: usize) -> Option<&str> {
        self.pending.get(&index).map(String::as_str)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
