//! Progressive reveal of freshly transcribed subtitles.

use super::document::SubtitleDocument;
use super::surface::DisplaySurface;
use super::timeline::TimelineIndex;
use crate::error::{PodsubError, Result};
use crate::transcript::{TranslationMap, Utterance};
use tracing::debug;

/// Reveal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealState {
    #[default]
    Idle,
    Revealing,
    Complete,
}

/// Blocks revealed so far out of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealProgress {
    pub revealed: usize,
    pub total: usize,
}

impl RevealProgress {
    pub fn is_complete(&self) -> bool {
        self.revealed >= self.total
    }
}

/// Appends one block per tick until every utterance is shown.
///
/// The timeline grows in lockstep with the document, so a highlight pass
/// during the reveal only ever resolves to blocks that exist.
#[derive(Debug, Default)]
pub struct ProgressiveRenderer {
    state: RevealState,
    revealed: usize,
    total: usize,
}

impl ProgressiveRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn is_revealing(&self) -> bool {
        self.state == RevealState::Revealing
    }

    pub fn progress(&self) -> RevealProgress {
        RevealProgress {
            revealed: self.revealed,
            total: self.total,
        }
    }

    /// Begin revealing `total` utterances. An empty result completes at once.
    pub fn start(&mut self, total: usize) {
        self.revealed = 0;
        self.total = total;
        self.state = if total == 0 {
            RevealState::Complete
        } else {
            RevealState::Revealing
        };
        debug!("Reveal started for {} utterances", total);
    }

    /// Stop revealing and forget progress.
    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    /// Reveal the next utterance.
    ///
    /// Returns the new progress, or `None` when not revealing.
    pub fn tick<S: DisplaySurface>(
        &mut self,
        utterances: &[Utterance],
        translations: &TranslationMap,
        document: &mut SubtitleDocument<S>,
        timeline: &mut TimelineIndex,
    ) -> Result<Option<RevealProgress>> {
        if self.state != RevealState::Revealing {
            return Ok(None);
        }

        let index = self.revealed;
        let utterance = match utterances.get(index) {
            Some(u) => u,
            None => {
                self.state = RevealState::Complete;
                return Err(PodsubError::Sync(format!(
                    "Reveal ran past the utterance list at {}",
                    index
                )));
            }
        };

        let translation = translations.get(&index).map(|t| t.text.as_str());
        document.append_block(index, utterance, translation)?;
        timeline.push_utterance(utterance);
        self.revealed += 1;

        if self.revealed >= self.total {
            self.state = RevealState::Complete;
            debug!("Reveal complete: {} blocks", self.revealed);
        }
        Ok(Some(self.progress()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::surface::TextSurface;
    use crate::transcript::Word;

    fn utterances() -> Vec<Utterance> {
        vec![
            Utterance::from_words("A", 0, 2000, vec![Word::new("Hi", 0, 500)]),
            Utterance::from_words("B", 2000, 4000, vec![Word::new("Bye", 2000, 2500)]),
            Utterance::from_words("A", 4000, 5000, vec![Word::new("Ok", 4000, 4300)]),
        ]
    }

    #[test]
    fn test_reveals_one_block_per_tick() {
        let utterances = utterances();
        let translations = TranslationMap::new();
        let mut doc = SubtitleDocument::new(TextSurface::new());
        let mut timeline = TimelineIndex::new();
        let mut renderer = ProgressiveRenderer::new();
        assert_eq!(renderer.state(), RevealState::Idle);

        renderer.start(utterances.len());
        for expected in 1..=3 {
            let progress = renderer
                .tick(&utterances, &translations, &mut doc, &mut timeline)
                .unwrap()
                .unwrap();
            assert_eq!(progress, RevealProgress { revealed: expected, total: 3 });
            assert_eq!(doc.block_count(), expected);
            assert_eq!(timeline.utterance_count(), expected);
        }

        assert_eq!(renderer.state(), RevealState::Complete);
        assert!(renderer
            .tick(&utterances, &translations, &mut doc, &mut timeline)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_pending_translation_lands_on_reveal() {
        let utterances = utterances();
        let translations = TranslationMap::new();
        let mut doc = SubtitleDocument::new(TextSurface::new());
        let mut timeline = TimelineIndex::new();
        let mut renderer = ProgressiveRenderer::new();
        renderer.start(utterances.len());

        renderer
            .tick(&utterances, &translations, &mut doc, &mut timeline)
            .unwrap();
        doc.replace_translation(2, "好");
        renderer
            .tick(&utterances, &translations, &mut doc, &mut timeline)
            .unwrap();
        renderer
            .tick(&utterances, &translations, &mut doc, &mut timeline)
            .unwrap();

        assert_eq!(doc.surface().text(), "A: Hi\n\nB: Bye\n\nA: Ok\n好");
    }

    #[test]
    fn test_empty_result_completes_immediately() {
        let mut renderer = ProgressiveRenderer::new();
        renderer.start(0);
        assert_eq!(renderer.state(), RevealState::Complete);
        assert!(renderer.progress().is_complete());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut renderer = ProgressiveRenderer::new();
        renderer.start(4);
        renderer.cancel();
        assert_eq!(renderer.state(), RevealState::Idle);
        assert_eq!(renderer.progress().total, 0);
    }
}
