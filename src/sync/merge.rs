//! Concurrent translation dispatch and in-order-agnostic merging.
//!
//! Each translatable utterance gets its own task. Tasks never touch the
//! document; they send a [`TranslationEvent`] back over the session channel
//! and [`TranslationMerge::apply`] folds it in on the controlling task.

use super::document::{ReplaceOutcome, SubtitleDocument};
use super::surface::DisplaySurface;
use crate::config::TranslationSettings;
use crate::transcript::{Translation, TranslationMap, Utterance};
use crate::translation::{RequestThrottle, Translator, TranslatorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// Completion signal from one translation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationEvent {
    Done {
        batch: u64,
        index: usize,
        text: String,
        translator: TranslatorKind,
    },
    Failed {
        batch: u64,
        index: usize,
        error: String,
    },
}

impl TranslationEvent {
    pub fn batch(&self) -> u64 {
        match self {
            TranslationEvent::Done { batch, .. } | TranslationEvent::Failed { batch, .. } => *batch,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            TranslationEvent::Done { index, .. } | TranslationEvent::Failed { index, .. } => *index,
        }
    }
}

/// Counters for the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeProgress {
    /// Finished requests, failures included.
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl MergeProgress {
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeUpdate {
    pub index: usize,
    pub progress: MergeProgress,
    /// Error message when this item failed.
    pub failure: Option<String>,
    /// What happened on screen, for successful items.
    pub outcome: Option<ReplaceOutcome>,
    /// Every dispatched item has now completed.
    pub finished: bool,
}

/// Owns one translation batch at a time.
#[derive(Debug, Default)]
pub struct TranslationMerge {
    batch: u64,
    active: Option<Arc<AtomicBool>>,
    progress: MergeProgress,
    translator: Option<TranslatorKind>,
}

impl TranslationMerge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is in flight.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn progress(&self) -> MergeProgress {
        self.progress
    }

    /// Backend of the current or last batch.
    pub fn translator(&self) -> Option<TranslatorKind> {
        self.translator
    }

    pub fn batch(&self) -> u64 {
        self.batch
    }

    /// Mark the current batch inactive. Its tasks keep running but their
    /// results are never sent.
    pub fn cancel(&mut self) {
        if let Some(flag) = self.active.take() {
            flag.store(false, Ordering::SeqCst);
            debug!("Translation batch {} cancelled", self.batch);
        }
    }

    /// Spawn one translation task per translatable utterance.
    ///
    /// At most `max_concurrent` requests are in flight; rate-limited
    /// backends additionally share a [`RequestThrottle`]. Returns how many
    /// tasks were dispatched. Must be called inside a Tokio runtime.
    pub fn dispatch<E>(
        &mut self,
        translator: Arc<dyn Translator>,
        utterances: &[Utterance],
        settings: &TranslationSettings,
        events: mpsc::UnboundedSender<E>,
    ) -> usize
    where
        E: From<TranslationEvent> + Send + 'static,
    {
        self.cancel();
        self.batch += 1;

        let active = Arc::new(AtomicBool::new(true));
        let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        let throttle = translator
            .rate_limited()
            .then(|| Arc::new(RequestThrottle::new(settings.min_request_interval())));
        let kind = translator.kind();

        let mut total = 0;
        for (index, utterance) in utterances.iter().enumerate() {
            if !utterance.is_translatable() {
                continue;
            }
            total += 1;

            let batch = self.batch;
            let text = utterance.text.clone();
            let translator = Arc::clone(&translator);
            let active = Arc::clone(&active);
            let permits = Arc::clone(&permits);
            let throttle = throttle.clone();
            let events = events.clone();

            tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if !active.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(throttle) = &throttle {
                    throttle.acquire().await;
                }

                let result = translator.translate(&text).await;
                if !active.load(Ordering::SeqCst) {
                    debug!("Dropping translation {} from cancelled batch {}", index, batch);
                    return;
                }

                let event = match result {
                    Ok(text) => TranslationEvent::Done {
                        batch,
                        index,
                        text,
                        translator: kind,
                    },
                    Err(e) => TranslationEvent::Failed {
                        batch,
                        index,
                        error: e.to_string(),
                    },
                };
                if events.send(event.into()).is_err() {
                    debug!("Session closed before translation {} arrived", index);
                }
            });
        }

        self.progress = MergeProgress {
            completed: 0,
            failed: 0,
            total,
        };
        self.translator = Some(kind);
        self.active = (total > 0).then_some(active);

        info!(
            "Dispatched {} translations with {} (batch {})",
            total, kind, self.batch
        );
        total
    }

    /// Fold one completion into the translation map and the document.
    ///
    /// Events from an older or cancelled batch return `None`.
    pub fn apply<S: DisplaySurface>(
        &mut self,
        event: TranslationEvent,
        translations: &mut TranslationMap,
        document: &mut SubtitleDocument<S>,
    ) -> Option<MergeUpdate> {
        if event.batch() != self.batch || !self.is_active() {
            debug!(
                "Ignoring stale translation {} from batch {}",
                event.index(),
                event.batch()
            );
            return None;
        }

        let index = event.index();
        let (failure, outcome) = match event {
            TranslationEvent::Done {
                text, translator, ..
            } => {
                let outcome = document.replace_translation(index, &text);
                translations.insert(index, Translation::new(text, translator));
                (None, Some(outcome))
            }
            TranslationEvent::Failed { error, .. } => {
                warn!("Translation {} failed: {}", index, error);
                self.progress.failed += 1;
                (Some(error), None)
            }
        };
        self.progress.completed += 1;

        let finished = self.progress.is_finished();
        if finished {
            self.active = None;
            info!(
                "Translation batch {} finished: {} done, {} failed",
                self.batch,
                self.progress.completed - self.progress.failed,
                self.progress.failed
            );
        }

        Some(MergeUpdate {
            index,
            progress: self.progress,
            failure,
            outcome,
            finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PodsubError, Result};
    use crate::sync::surface::TextSurface;
    use crate::transcript::Word;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct UppercaseTranslator {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl UppercaseTranslator {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Translator for UppercaseTranslator {
        async fn translate(&self, text: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if text.contains("fail") {
                return Err(PodsubError::Translation("backend said no".to_string()));
            }
            Ok(text.to_uppercase())
        }

        fn kind(&self) -> TranslatorKind {
            TranslatorKind::Gemini
        }
    }

    fn utterances(texts: &[&str]) -> Vec<Utterance> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let start = i as i64 * 1000;
                let words = text
                    .split_whitespace()
                    .map(|w| Word::new(w, start, start + 100))
                    .collect();
                Utterance::from_words("A", start, start + 900, words)
            })
            .collect()
    }

    fn rendered(utterances: &[Utterance]) -> SubtitleDocument<TextSurface> {
        let mut doc = SubtitleDocument::new(TextSurface::new());
        doc.rebuild(utterances, &TranslationMap::new()).unwrap();
        doc
    }

    fn started(merge: &mut TranslationMerge, total: usize) {
        // a dispatched batch without tasks, for driving apply by hand
        merge.batch += 1;
        merge.active = Some(Arc::new(AtomicBool::new(true)));
        merge.progress = MergeProgress {
            completed: 0,
            failed: 0,
            total,
        };
    }

    fn done(batch: u64, index: usize, text: &str) -> TranslationEvent {
        TranslationEvent::Done {
            batch,
            index,
            text: text.to_string(),
            translator: TranslatorKind::Google,
        }
    }

    #[test]
    fn test_out_of_order_completions() {
        let utts = utterances(&["zero", "one", "two", "three"]);
        let mut doc = rendered(&utts);
        let mut translations = TranslationMap::new();
        let mut merge = TranslationMerge::new();
        started(&mut merge, 2);
        let batch = merge.batch();

        let first = merge
            .apply(done(batch, 3, "三"), &mut translations, &mut doc)
            .unwrap();
        assert!(!first.finished);
        let second = merge
            .apply(done(batch, 1, "一"), &mut translations, &mut doc)
            .unwrap();
        assert!(second.finished);

        assert_eq!(translations[&3].text, "三");
        assert_eq!(translations[&1].text, "一");
        assert_eq!(translations.len(), 2);
        assert_eq!(doc.surface().text(), "A: zero\n\nA: one\n一\nA: two\n\nA: three\n三");
    }

    #[test]
    fn test_failure_counts_toward_completion() {
        let utts = utterances(&["zero", "one"]);
        let mut doc = rendered(&utts);
        let mut translations = TranslationMap::new();
        let mut merge = TranslationMerge::new();
        started(&mut merge, 2);
        let batch = merge.batch();

        merge.apply(done(batch, 0, "零"), &mut translations, &mut doc);
        let update = merge
            .apply(
                TranslationEvent::Failed {
                    batch,
                    index: 1,
                    error: "timeout".to_string(),
                },
                &mut translations,
                &mut doc,
            )
            .unwrap();

        assert!(update.finished);
        assert_eq!(update.failure.as_deref(), Some("timeout"));
        assert_eq!(update.progress.failed, 1);
        // the earlier success is kept
        assert_eq!(translations[&0].text, "零");
        assert!(!merge.is_active());
    }

    #[test]
    fn test_stale_batch_is_dropped() {
        let utts = utterances(&["zero"]);
        let mut doc = rendered(&utts);
        let mut translations = TranslationMap::new();
        let mut merge = TranslationMerge::new();
        started(&mut merge, 1);
        let old = merge.batch();
        started(&mut merge, 1);

        assert!(merge
            .apply(done(old, 0, "旧"), &mut translations, &mut doc)
            .is_none());
        assert!(translations.is_empty());

        merge.cancel();
        let current = merge.batch();
        assert!(merge
            .apply(done(current, 0, "新"), &mut translations, &mut doc)
            .is_none());
    }

    #[test]
    fn test_translation_for_unrendered_block_is_deferred() {
        let utts = utterances(&["zero", "one"]);
        let mut doc = SubtitleDocument::new(TextSurface::new());
        doc.append_block(0, &utts[0], None).unwrap();
        let mut translations = TranslationMap::new();
        let mut merge = TranslationMerge::new();
        started(&mut merge, 2);

        let update = merge
            .apply(done(merge.batch(), 1, "一"), &mut translations, &mut doc)
            .unwrap();
        assert_eq!(update.outcome, Some(ReplaceOutcome::Deferred));
        assert_eq!(translations[&1].text, "一");
    }

    #[tokio::test]
    async fn test_dispatch_translates_every_nonempty_utterance() {
        let mut utts = utterances(&["hello there", "", "fail please", "bye"]);
        utts[1].text = "   ".to_string();
        let mut doc = rendered(&utts);
        let mut translations = TranslationMap::new();
        let mut merge = TranslationMerge::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<TranslationEvent>();

        let translator = Arc::new(UppercaseTranslator::new(Duration::from_millis(5)));
        let total = merge.dispatch(translator, &utts, &TranslationSettings::default(), tx);
        assert_eq!(total, 3);

        let mut finished = false;
        while let Some(event) = rx.recv().await {
            let update = merge.apply(event, &mut translations, &mut doc).unwrap();
            finished = update.finished;
        }

        assert!(finished);
        assert_eq!(merge.progress().failed, 1);
        assert_eq!(translations[&0].text, "HELLO THERE");
        assert_eq!(translations[&0].translator, TranslatorKind::Gemini);
        assert_eq!(translations[&3].text, "BYE");
        assert!(!translations.contains_key(&1));
        assert!(!translations.contains_key(&2));
    }

    #[tokio::test]
    async fn test_dispatch_respects_concurrency_limit() {
        let texts: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let utts = utterances(&refs);
        let settings = TranslationSettings {
            max_concurrent: 2,
            ..Default::default()
        };
        let translator = Arc::new(UppercaseTranslator::new(Duration::from_millis(10)));
        let mut merge = TranslationMerge::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<TranslationEvent>();

        merge.dispatch(translator.clone(), &utts, &settings, tx);
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }

        assert_eq!(received, 8);
        assert!(translator.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cancelled_batch_sends_nothing() {
        let utts = utterances(&["one", "two"]);
        let translator = Arc::new(UppercaseTranslator::new(Duration::from_millis(20)));
        let mut merge = TranslationMerge::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<TranslationEvent>();

        merge.dispatch(translator, &utts, &TranslationSettings::default(), tx);
        merge.cancel();

        assert!(rx.recv().await.is_none());
        assert!(!merge.is_active());
    }
}
