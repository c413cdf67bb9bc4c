//! Timestamp to utterance/word lookup.

use crate::transcript::Utterance;

/// Sorted start times of every utterance and every word.
///
/// Words are flattened in utterance order, so a word index here is the same
/// global index the document uses for its word positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineIndex {
    utterance_starts: Vec<i64>,
    word_starts: Vec<i64>,
}

impl TimelineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index for a complete utterance list.
    pub fn from_utterances(utterances: &[Utterance]) -> Self {
        let mut index = Self::new();
        for utterance in utterances {
            index.push_utterance(utterance);
        }
        index
    }

    /// Append one utterance and its words.
    ///
    /// Utterances arrive in time order, so appending keeps both arrays sorted.
    pub fn push_utterance(&mut self, utterance: &Utterance) {
        debug_assert!(self
            .utterance_starts
            .last()
            .map_or(true, |&last| last <= utterance.start_time));

        self.utterance_starts.push(utterance.start_time);
        self.word_starts.extend(utterance.words.iter().map(|w| w.start));
    }

    pub fn clear(&mut self) {
        self.utterance_starts.clear();
        self.word_starts.clear();
    }

    /// Index of the last utterance starting at or before `timestamp`.
    ///
    /// `None` before the first utterance. Past the end this is the last index.
    pub fn resolve_utterance(&self, timestamp: i64) -> Option<usize> {
        last_not_after(&self.utterance_starts, timestamp)
    }

    /// Global index of the last word starting at or before `timestamp`.
    pub fn resolve_word(&self, timestamp: i64) -> Option<usize> {
        last_not_after(&self.word_starts, timestamp)
    }

    pub fn utterance_count(&self) -> usize {
        self.utterance_starts.len()
    }

    pub fn word_count(&self) -> usize {
        self.word_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterance_starts.is_empty()
    }
}

/// Rightmost position whose value is `<= timestamp`.
fn last_not_after(starts: &[i64], timestamp: i64) -> Option<usize> {
    starts.partition_point(|&start| start <= timestamp).checked_sub(1)
}
