//! Playback-position driven highlighting.

use super::document::SubtitleDocument;
use super::surface::{Background, DisplaySurface};
use super::timeline::TimelineIndex;
use crate::config::PlaybackSettings;
use crate::playback::Playback;
use tracing::trace;

/// What a highlight pass changed.
///
/// The outer `Option` says whether that level changed at all; the inner one
/// is the newly active index (`None` before the first start time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncChange {
    pub utterance: Option<Option<usize>>,
    pub word: Option<Option<usize>>,
}

impl SyncChange {
    pub fn is_empty(&self) -> bool {
        self.utterance.is_none() && self.word.is_none()
    }
}

/// Tracks the active utterance and word and keeps the surface in sync.
#[derive(Debug, Clone)]
pub struct HighlightController {
    update_interval: i64,
    seek_threshold: i64,
    last_time: Option<i64>,
    utterance: Option<usize>,
    word: Option<usize>,
}

impl HighlightController {
    pub fn new(update_interval: i64, seek_threshold: i64) -> Self {
        Self {
            update_interval,
            seek_threshold,
            last_time: None,
            utterance: None,
            word: None,
        }
    }

    pub fn from_settings(settings: &PlaybackSettings) -> Self {
        Self::new(settings.update_interval_ms, settings.seek_threshold_ms)
    }

    pub fn current_utterance(&self) -> Option<usize> {
        self.utterance
    }

    pub fn current_word(&self) -> Option<usize> {
        self.word
    }

    /// Forget the active indices and the last processed time.
    pub fn reset(&mut self) {
        self.last_time = None;
        self.utterance = None;
        self.word = None;
    }

    /// Remove every highlight from the surface and reset.
    pub fn clear<S: DisplaySurface>(&mut self, document: &mut SubtitleDocument<S>) {
        document.surface_mut().clear_backgrounds();
        self.reset();
    }

    /// Process one position sample.
    ///
    /// Small movements below the update interval are skipped unless
    /// `forced`. Jumps beyond the seek threshold are always processed.
    pub fn on_tick<S: DisplaySurface>(
        &mut self,
        time: i64,
        document: &mut SubtitleDocument<S>,
        timeline: &TimelineIndex,
        forced: bool,
    ) -> SyncChange {
        if !forced {
            if let Some(last) = self.last_time {
                let jump = (time - last).abs();
                if jump < self.update_interval && jump <= self.seek_threshold {
                    return SyncChange::default();
                }
            }
        }
        self.last_time = Some(time);

        let mut change = SyncChange::default();

        let utterance = clamp_index(timeline.resolve_utterance(time), document.block_count());
        if utterance != self.utterance {
            if let Some(block) = self.utterance.and_then(|i| document.block(i)) {
                document.surface_mut().set_background(
                    block.document_start,
                    block.document_end,
                    Background::Transparent,
                );
            }
            if let Some(block) = utterance.and_then(|i| document.block(i)) {
                let surface = document.surface_mut();
                surface.set_background(block.document_start, block.document_end, Background::Utterance);
                surface.scroll_to(block.document_start);
            }
            trace!("Utterance highlight {:?} -> {:?}", self.utterance, utterance);
            self.utterance = utterance;
            change.utterance = Some(utterance);
        }

        let word = clamp_index(timeline.resolve_word(time), document.word_count());
        if word != self.word {
            if let Some(previous) = self.word.and_then(|i| document.word(i)) {
                let background = if Some(previous.utterance_index) == self.utterance {
                    Background::Utterance
                } else {
                    Background::Transparent
                };
                document
                    .surface_mut()
                    .set_background(previous.start_offset, previous.end_offset, background);
            }
            self.word = word;
            change.word = Some(word);
        }

        // A new utterance highlight paints over the active word.
        if change.word.is_some() || change.utterance.is_some() {
            if let Some(position) = self.word.and_then(|i| document.word(i)) {
                if Some(position.utterance_index) == self.utterance {
                    document.surface_mut().set_background(
                        position.start_offset,
                        position.end_offset,
                        Background::Word,
                    );
                }
            }
        }

        change
    }

    /// Jump to `time`: clear all highlights, resync immediately and move
    /// the player.
    pub fn seek<S: DisplaySurface>(
        &mut self,
        time: i64,
        document: &mut SubtitleDocument<S>,
        timeline: &TimelineIndex,
        playback: &dyn Playback,
    ) -> SyncChange {
        self.clear(document);
        let mut change = self.on_tick(time, document, timeline, true);
        change.utterance.get_or_insert(self.utterance);
        change.word.get_or_insert(self.word);
        playback.seek(time);
        change
    }
}

/// Clamp a resolved index to what is actually rendered.
fn clamp_index(index: Option<usize>, count: usize) -> Option<usize> {
    let last = count.checked_sub(1)?;
    index.map(|i| i.min(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::ClockPlayback;
    use crate::sync::surface::TextSurface;
    use crate::transcript::{TranslationMap, Utterance, Word};

    fn setup() -> (SubtitleDocument<TextSurface>, TimelineIndex) {
        let utterances = vec![
            Utterance::from_words(
                "A",
                0,
                2000,
                vec![Word::new("Hi", 0, 500), Word::new("there", 600, 1200)],
            ),
            Utterance::from_words("B", 2000, 4000, vec![Word::new("Bye", 2000, 2500)]),
        ];
        let mut doc = SubtitleDocument::new(TextSurface::new());
        doc.rebuild(&utterances, &TranslationMap::new()).unwrap();
        (doc, TimelineIndex::from_utterances(&utterances))
    }

    fn block_has(doc: &SubtitleDocument<TextSurface>, index: usize, background: Background) -> bool {
        let block = doc.block(index).unwrap();
        doc.surface()
            .range_has_background(block.document_start, block.document_end, background)
    }

    #[test]
    fn test_tick_highlights_utterance_and_word() {
        let (mut doc, timeline) = setup();
        let mut controller = HighlightController::new(100, 1000);

        let change = controller.on_tick(100, &mut doc, &timeline, false);
        assert_eq!(change.utterance, Some(Some(0)));
        assert_eq!(change.word, Some(Some(0)));

        let hi = doc.word(0).unwrap();
        assert_eq!(doc.surface().background_at(hi.start_offset), Some(Background::Word));
        let there = doc.word(1).unwrap();
        assert_eq!(doc.surface().background_at(there.start_offset), Some(Background::Utterance));
        assert_eq!(doc.surface().scroll_calls(), 1);
    }

    #[test]
    fn test_translation_in_active_block_stays_highlighted() {
        let (mut doc, timeline) = setup();
        let mut controller = HighlightController::new(100, 1000);
        controller.on_tick(100, &mut doc, &timeline, false);

        doc.replace_translation(0, "嗨你好");
        controller.on_tick(300, &mut doc, &timeline, false);

        let block = doc.block(0).unwrap();
        assert_eq!(
            doc.surface().slice(block.translation_start, block.translation_end),
            "嗨你好"
        );
        assert!(doc.surface().range_has_background(
            block.translation_start,
            block.translation_end,
            Background::Utterance
        ));
        assert!(block_has(&doc, 1, Background::Transparent));
    }

    #[test]
    fn test_word_reverts_to_utterance_background() {
        let (mut doc, timeline) = setup();
        let mut controller = HighlightController::new(100, 1000);
        controller.on_tick(100, &mut doc, &timeline, false);

        let change = controller.on_tick(700, &mut doc, &timeline, false);
        assert_eq!(change.utterance, None);
        assert_eq!(change.word, Some(Some(1)));

        let hi = doc.word(0).unwrap();
        assert!(doc
            .surface()
            .range_has_background(hi.start_offset, hi.end_offset, Background::Utterance));
        let there = doc.word(1).unwrap();
        assert!(doc
            .surface()
            .range_has_background(there.start_offset, there.end_offset, Background::Word));
    }

    #[test]
    fn test_debounce_skips_small_moves() {
        let (mut doc, timeline) = setup();
        let mut controller = HighlightController::new(100, 1000);
        controller.on_tick(550, &mut doc, &timeline, false);

        // 50ms later the second word has started, but the tick is skipped
        assert!(controller.on_tick(600, &mut doc, &timeline, false).is_empty());
        assert_eq!(controller.current_word(), Some(0));

        assert!(!controller.on_tick(600, &mut doc, &timeline, true).is_empty());
        assert_eq!(controller.current_word(), Some(1));
    }

    #[test]
    fn test_before_first_utterance_highlights_nothing() {
        let utterances = vec![Utterance::from_words("A", 500, 900, vec![Word::new("x", 500, 900)])];
        let mut doc = SubtitleDocument::new(TextSurface::new());
        doc.rebuild(&utterances, &TranslationMap::new()).unwrap();
        let timeline = TimelineIndex::from_utterances(&utterances);
        let mut controller = HighlightController::new(100, 1000);

        let change = controller.on_tick(100, &mut doc, &timeline, false);
        assert!(change.is_empty());
        assert!(doc
            .surface()
            .range_has_background(0, doc.len(), Background::Transparent));
        assert_eq!(doc.surface().scroll_calls(), 0);
    }

    #[test]
    fn test_end_of_audio_clamps_to_last_block() {
        let (mut doc, timeline) = setup();
        let mut controller = HighlightController::new(100, 1000);

        controller.on_tick(90_000, &mut doc, &timeline, false);
        assert_eq!(controller.current_utterance(), Some(1));
        assert!(block_has(&doc, 0, Background::Transparent));
    }

    #[test]
    fn test_timeline_ahead_of_document_is_clamped() {
        let (_, timeline) = setup();
        let utterances = vec![Utterance::from_words(
            "A",
            0,
            2000,
            vec![Word::new("Hi", 0, 500), Word::new("there", 600, 1200)],
        )];
        let mut doc = SubtitleDocument::new(TextSurface::new());
        doc.rebuild(&utterances, &TranslationMap::new()).unwrap();
        let mut controller = HighlightController::new(100, 1000);

        controller.on_tick(3000, &mut doc, &timeline, false);
        assert_eq!(controller.current_utterance(), Some(0));
        assert_eq!(controller.current_word(), Some(1));
    }

    #[test]
    fn test_seek_moves_highlight_with_one_scroll() {
        let (mut doc, timeline) = setup();
        let player = ClockPlayback::new(Some(4000));
        let mut controller = HighlightController::new(100, 1000);

        controller.on_tick(1500, &mut doc, &timeline, false);
        assert_eq!(controller.current_utterance(), Some(0));
        let scrolls_before = doc.surface().scroll_calls();

        let change = controller.seek(2000, &mut doc, &timeline, &player);

        assert_eq!(change.utterance, Some(Some(1)));
        assert_eq!(change.word, Some(Some(2)));
        assert!(block_has(&doc, 0, Background::Transparent));
        let bye = doc.word(2).unwrap();
        assert!(doc
            .surface()
            .range_has_background(bye.start_offset, bye.end_offset, Background::Word));
        let block = doc.block(1).unwrap();
        assert!(doc
            .surface()
            .range_has_background(block.document_start, bye.start_offset, Background::Utterance));
        assert_eq!(doc.surface().scroll_calls(), scrolls_before + 1);
        assert_eq!(doc.surface().scroll_position(), Some(block.document_start));
        assert_eq!(player.position(), 2000);
    }

    #[test]
    fn test_seek_within_same_utterance_rehighlights() {
        let (mut doc, timeline) = setup();
        let player = ClockPlayback::new(None);
        let mut controller = HighlightController::new(100, 1000);
        controller.on_tick(100, &mut doc, &timeline, false);

        let change = controller.seek(150, &mut doc, &timeline, &player);
        assert_eq!(change.utterance, Some(Some(0)));
        assert!(!block_has(&doc, 0, Background::Transparent));
    }
}
