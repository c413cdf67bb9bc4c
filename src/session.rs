//! Playback session: the single task that owns every piece of subtitle state.
//!
//! Background work (transcription, translation, position polling) runs in
//! spawned tasks that report back over one channel; only the session mutates
//! the document, the timeline and the highlight state.

use crate::cache::{file_hash, CacheRecord, CacheStore};
use crate::config::Settings;
use crate::error::{ErrorCategory, MediaErrorKind, PodsubError, Result};
use crate::playback::Playback;
use crate::sync::{
    DisplaySurface, HighlightController, MergeProgress, ProgressiveRenderer, RevealProgress,
    RevealState, SubtitleDocument, SyncChange, TimelineIndex, TranslationEvent, TranslationMerge,
};
use crate::transcript::{Translation, TranslationMap, Utterance, Word};
use crate::transcription::Transcriber;
use crate::translation::{create_translator, Translator, TranslatorKind};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Message delivered to the session task.
#[derive(Debug)]
pub enum SessionEvent {
    /// The transcription worker finished.
    Transcribed {
        generation: u64,
        result: Result<Vec<Utterance>>,
    },
    /// A translation worker finished.
    Translation(TranslationEvent),
    /// The poller sampled the player.
    Position { generation: u64, position_ms: i64 },
}

impl From<TranslationEvent> for SessionEvent {
    fn from(event: TranslationEvent) -> Self {
        SessionEvent::Translation(event)
    }
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// Cache or file trouble; the operation was abandoned.
    Io(String),
    TranscriptionFailed(String),
    TranslationFailed { index: usize, message: String },
    /// The translator needs a key that is not configured.
    MissingCredential(TranslatorKind),
    Media(MediaErrorKind),
    /// Transcription succeeded but found no speech.
    EmptyTranscript,
    /// Every subtitle is blank.
    NothingToTranslate,
}

impl UserNotice {
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            UserNotice::Io(_) => Some(ErrorCategory::Io),
            UserNotice::TranscriptionFailed(_) => Some(ErrorCategory::Transcription),
            UserNotice::TranslationFailed { .. } | UserNotice::MissingCredential(_) => {
                Some(ErrorCategory::Translation)
            }
            UserNotice::Media(_) => Some(ErrorCategory::Media),
            UserNotice::EmptyTranscript | UserNotice::NothingToTranslate => None,
        }
    }
}

impl std::fmt::Display for UserNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserNotice::Io(message) => write!(f, "{}", message),
            UserNotice::TranscriptionFailed(message) => write!(f, "{}", message),
            UserNotice::TranslationFailed { index, message } => {
                write!(f, "Translation of subtitle {} failed: {}", index + 1, message)
            }
            UserNotice::MissingCredential(kind) => {
                write!(f, "No API key configured for the {} translator", kind)
            }
            UserNotice::Media(kind) => write!(f, "{}", kind.user_message()),
            UserNotice::EmptyTranscript => write!(f, "No speech was found in this file"),
            UserNotice::NothingToTranslate => write!(f, "No subtitle text to translate"),
        }
    }
}

/// The subtitle that is active after a sync change.
#[derive(Debug, Clone, Copy)]
pub struct SubtitleView<'a> {
    pub index: usize,
    pub utterance: &'a Utterance,
    pub translation: Option<&'a Translation>,
    pub word: Option<&'a Word>,
}

/// Receives everything a front end needs to show.
pub trait SessionObserver: Send {
    fn notice(&mut self, notice: UserNotice);

    fn reveal_progress(&mut self, _progress: RevealProgress) {}

    fn translation_progress(&mut self, _progress: MergeProgress) {}

    fn sync_changed(&mut self, _change: SyncChange, _active: Option<SubtitleView<'_>>) {}
}

/// Builds a translator for a backend.
pub type TranslatorFactory =
    Box<dyn Fn(TranslatorKind, &Settings) -> Result<Arc<dyn Translator>> + Send + Sync>;

/// How `load_file` satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Subtitles came from the cache.
    Cached { utterances: usize, translations: usize },
    /// A transcription worker was started.
    Transcribing,
}

/// The audio file currently loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub hash: String,
    pub path: PathBuf,
}

fn default_translator(kind: TranslatorKind, settings: &Settings) -> Result<Arc<dyn Translator>> {
    create_translator(kind, &settings.credentials, &settings.translation)
}

struct Poller {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// One audio file's subtitles, translations and playback sync.
pub struct Session<S: DisplaySurface> {
    settings: Settings,
    cache: CacheStore,
    transcriber: Arc<dyn Transcriber>,
    translator_factory: TranslatorFactory,
    playback: Arc<dyn Playback>,
    observer: Box<dyn SessionObserver>,

    document: SubtitleDocument<S>,
    timeline: TimelineIndex,
    renderer: ProgressiveRenderer,
    highlighter: HighlightController,
    merge: TranslationMerge,

    utterances: Vec<Utterance>,
    translations: TranslationMap,
    translator_kind: TranslatorKind,
    current: Option<LoadedFile>,

    generation: u64,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    reveal_timer: Option<Interval>,
    transcription: Option<JoinHandle<()>>,
    poller: Option<Poller>,

    auto_translate: bool,
    playback_enabled: bool,
    translation_toggle_enabled: bool,
}

impl<S: DisplaySurface> Session<S> {
    /// Create a session over the cache in the configured data directory.
    pub fn new(
        settings: Settings,
        transcriber: Arc<dyn Transcriber>,
        playback: Arc<dyn Playback>,
        surface: S,
        observer: Box<dyn SessionObserver>,
    ) -> Result<Self> {
        let cache = CacheStore::open(&settings.data_dir())?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            highlighter: HighlightController::from_settings(&settings.playback),
            translator_kind: settings.translation.provider,
            settings,
            cache,
            transcriber,
            translator_factory: Box::new(default_translator),
            playback,
            observer,
            document: SubtitleDocument::new(surface),
            timeline: TimelineIndex::new(),
            renderer: ProgressiveRenderer::new(),
            merge: TranslationMerge::new(),
            utterances: Vec::new(),
            translations: TranslationMap::new(),
            current: None,
            generation: 0,
            events_tx,
            events_rx,
            reveal_timer: None,
            transcription: None,
            poller: None,
            auto_translate: true,
            playback_enabled: false,
            translation_toggle_enabled: false,
        })
    }

    /// Replace how translators are built.
    pub fn with_translator_factory(mut self, factory: TranslatorFactory) -> Self {
        self.translator_factory = factory;
        self
    }

    /// Choose translation visibility ahead of a load.
    pub fn set_show_translation(&mut self, show: bool) {
        self.document.set_show_translation(show);
    }

    /// Whether a fresh transcription is translated automatically.
    pub fn set_auto_translate(&mut self, enabled: bool) {
        self.auto_translate = enabled;
    }

    pub fn document(&self) -> &SubtitleDocument<S> {
        &self.document
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn translations(&self) -> &TranslationMap {
        &self.translations
    }

    pub fn translator_kind(&self) -> TranslatorKind {
        self.translator_kind
    }

    pub fn current_file(&self) -> Option<&LoadedFile> {
        self.current.as_ref()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn playback(&self) -> &Arc<dyn Playback> {
        &self.playback
    }

    pub fn reveal_state(&self) -> RevealState {
        self.renderer.state()
    }

    pub fn translation_progress(&self) -> MergeProgress {
        self.merge.progress()
    }

    /// Whether a transcription worker is running.
    pub fn is_transcribing(&self) -> bool {
        self.transcription.is_some()
    }

    pub fn is_translating(&self) -> bool {
        self.merge.is_active()
    }

    pub fn is_playback_enabled(&self) -> bool {
        self.playback_enabled
    }

    pub fn is_translation_toggle_enabled(&self) -> bool {
        self.translation_toggle_enabled
    }

    /// Load an audio file, from the cache when its content hash is known.
    pub async fn load_file(&mut self, path: &Path) -> Result<LoadOutcome> {
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            return Err(PodsubError::InvalidInput(format!(
                "Unsupported audio file (expected .wav or .mp3): {}",
                path.display()
            )));
        }

        let hash = file_hash(path)?;
        self.begin_generation().await;
        self.current = Some(LoadedFile {
            hash: hash.clone(),
            path: path.to_path_buf(),
        });

        if self.cache.entry(&hash).is_some() {
            match self.install_cached(&hash) {
                Ok(outcome) => {
                    self.start_poller();
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!("Cached subtitles unusable, transcribing again: {}", e);
                    self.observer.notice(UserNotice::Io(e.to_string()));
                }
            }
        }

        self.start_transcription(path);
        self.start_poller();
        Ok(LoadOutcome::Transcribing)
    }

    /// Load a cached entry by its content hash without touching the audio.
    pub async fn load_cached(&mut self, hash: &str) -> Result<LoadOutcome> {
        if !self.cache.contains(hash) {
            return Err(PodsubError::Cache(format!("No cached subtitles for {}", hash)));
        }

        self.begin_generation().await;
        let path = self
            .cache
            .entry(hash)
            .map(|e| PathBuf::from(&e.file_path))
            .unwrap_or_default();
        self.current = Some(LoadedFile {
            hash: hash.to_string(),
            path,
        });

        let outcome = self.install_cached(hash)?;
        self.start_poller();
        Ok(outcome)
    }

    /// Fold one background event into the session state.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transcribed { generation, result } => {
                if generation != self.generation {
                    debug!("Dropping transcription from generation {}", generation);
                    return;
                }
                self.transcription = None;
                self.on_transcribed(result);
            }
            SessionEvent::Translation(event) => self.on_translation(event),
            SessionEvent::Position {
                generation,
                position_ms,
            } => {
                if generation == self.generation {
                    self.position_tick(position_ms, false);
                }
            }
        }
    }

    /// Translate every non-empty utterance with `kind`.
    ///
    /// Returns how many requests were dispatched. A missing credential is
    /// reported as a notice and dispatches nothing.
    pub fn start_translation(&mut self, kind: TranslatorKind) -> usize {
        if self.utterances.is_empty() {
            return 0;
        }
        if !self.utterances.iter().any(Utterance::is_translatable) {
            self.observer.notice(UserNotice::NothingToTranslate);
            return 0;
        }
        if kind.requires_api_key() && self.settings.credentials.for_translator(kind).is_none() {
            self.observer.notice(UserNotice::MissingCredential(kind));
            return 0;
        }

        let translator = match (self.translator_factory)(kind, &self.settings) {
            Ok(translator) => translator,
            Err(e) => {
                warn!("Could not create {} translator: {}", kind, e);
                self.observer.notice(UserNotice::Io(e.to_string()));
                return 0;
            }
        };

        self.translator_kind = kind;
        let dispatched = self.merge.dispatch(
            translator,
            &self.utterances,
            &self.settings.translation,
            self.events_tx.clone(),
        );
        self.observer.translation_progress(self.merge.progress());
        dispatched
    }

    /// Reveal the next subtitle of a fresh transcription.
    pub fn reveal_tick(&mut self) {
        match self.renderer.tick(
            &self.utterances,
            &self.translations,
            &mut self.document,
            &mut self.timeline,
        ) {
            Ok(Some(progress)) => {
                self.observer.reveal_progress(progress);
                if progress.is_complete() {
                    self.translation_toggle_enabled = true;
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Reveal tick failed: {}", e),
        }
    }

    /// Sync highlighting to a polled position.
    pub fn position_tick(&mut self, position_ms: i64, forced: bool) {
        if !self.playback_enabled {
            return;
        }
        let change = self
            .highlighter
            .on_tick(position_ms, &mut self.document, &self.timeline, forced);
        self.report_sync(change);
    }

    /// Jump playback to `position_ms` and resync immediately.
    pub fn seek(&mut self, position_ms: i64) {
        if !self.playback_enabled {
            return;
        }
        let change = self.highlighter.seek(
            position_ms,
            &mut self.document,
            &self.timeline,
            self.playback.as_ref(),
        );
        self.report_sync(change);
    }

    /// Seek to the subtitle under a character offset and make sure it plays.
    ///
    /// Returns the clicked utterance index.
    pub fn click(&mut self, offset: usize) -> Option<usize> {
        if !self.playback_enabled {
            return None;
        }
        let index = self.document.block_at(offset)?;
        let start = self.utterances.get(index)?.start_time;
        self.seek(start);
        if !self.playback.is_playing() {
            self.playback.play();
        }
        Some(index)
    }

    /// Toggle playback. Returns whether the player is now playing.
    pub fn play_pause(&mut self) -> bool {
        if !self.playback_enabled {
            return false;
        }
        if self.playback.is_playing() {
            self.playback.pause();
            false
        } else {
            self.playback.play();
            self.position_tick(self.playback.position(), true);
            true
        }
    }

    /// Show or hide translations and redraw everything.
    pub fn toggle_translation(&mut self, show: bool) -> Result<()> {
        if !self.translation_toggle_enabled {
            return Ok(());
        }
        self.document.set_show_translation(show);
        self.redisplay()
    }

    /// The player reported a failure; playback stays disabled until the
    /// next load.
    pub fn on_media_error(&mut self, kind: MediaErrorKind) {
        warn!("Playback error: {}", kind);
        self.playback.pause();
        self.playback_enabled = false;
        self.observer.notice(UserNotice::Media(kind));
    }

    /// Wait for the next event or reveal tick and process it.
    pub async fn step(&mut self) {
        enum Step {
            Event(Option<SessionEvent>),
            Reveal,
        }

        let reveal_interval = self.settings.playback.reveal_interval();
        let revealing = self.renderer.is_revealing();
        let step = {
            let timer = self.reveal_timer.get_or_insert_with(|| {
                let mut timer = tokio::time::interval(reveal_interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                timer
            });
            tokio::select! {
                event = self.events_rx.recv() => Step::Event(event),
                _ = timer.tick(), if revealing => Step::Reveal,
            }
        };

        match step {
            Step::Event(Some(event)) => self.handle_event(event),
            Step::Event(None) => {}
            Step::Reveal => self.reveal_tick(),
        }
    }

    /// Run the session until `shutdown` resolves, then stop every worker.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.step() => {}
            }
        }
        self.shutdown().await;
    }

    /// Stop polling and transcription and drop in-flight translations.
    pub async fn shutdown(&mut self) {
        self.stop_workers().await;
        self.merge.cancel();
        self.playback.pause();
        info!("Session stopped");
    }

    async fn stop_workers(&mut self) {
        if let Some(handle) = self.transcription.take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(poller) = self.poller.take() {
            let _ = poller.stop.send(true);
            let _ = poller.handle.await;
        }
    }

    /// Stop everything belonging to the previous file and clear its state.
    async fn begin_generation(&mut self) {
        self.stop_workers().await;
        self.merge.cancel();
        self.renderer.cancel();
        self.generation += 1;

        self.highlighter.reset();
        self.document.reset();
        self.timeline.clear();
        self.utterances.clear();
        self.translations.clear();
        self.current = None;
        self.playback_enabled = false;
        self.translation_toggle_enabled = false;
        self.playback.pause();
        self.playback.seek(0);
    }

    fn install_cached(&mut self, hash: &str) -> Result<LoadOutcome> {
        let record = self.cache.load_record(hash)?;
        if let Some(current) = self.current.as_mut() {
            if current.path.as_os_str().is_empty() && !record.file_path.is_empty() {
                current.path = PathBuf::from(&record.file_path);
            }
        }

        if let Some(first) = record.translations.values().next() {
            self.translator_kind = first.translator;
        }
        self.utterances = record.subtitles;
        self.translations = record.translations;
        self.timeline = TimelineIndex::from_utterances(&self.utterances);
        self.document.rebuild(&self.utterances, &self.translations)?;

        self.playback_enabled = true;
        self.translation_toggle_enabled = !self.utterances.is_empty();
        info!(
            "Loaded {} subtitles and {} translations from cache",
            self.utterances.len(),
            self.translations.len()
        );
        self.position_tick(self.playback.position(), true);

        Ok(LoadOutcome::Cached {
            utterances: self.utterances.len(),
            translations: self.translations.len(),
        })
    }

    fn start_transcription(&mut self, path: &Path) {
        self.document.show_message("Transcribing...");
        let transcriber = Arc::clone(&self.transcriber);
        let events = self.events_tx.clone();
        let generation = self.generation;
        let path = path.to_path_buf();

        info!("Transcribing {}", path.display());
        self.transcription = Some(tokio::spawn(async move {
            let result = transcriber.transcribe(&path).await;
            let _ = events.send(SessionEvent::Transcribed { generation, result });
        }));
    }

    fn start_poller(&mut self) {
        let (stop, mut stopped) = watch::channel(false);
        let playback = Arc::clone(&self.playback);
        let events = self.events_tx.clone();
        let generation = self.generation;
        let interval = self.settings.playback.poll_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        if !playback.is_playing() {
                            continue;
                        }
                        let position_ms = playback.position();
                        if events.send(SessionEvent::Position { generation, position_ms }).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.poller = Some(Poller { stop, handle });
    }

    fn on_transcribed(&mut self, result: Result<Vec<Utterance>>) {
        let utterances = match result {
            Ok(utterances) => utterances,
            Err(e) => {
                warn!("Transcription failed: {}", e);
                self.document.show_message(&e.to_string());
                self.playback_enabled = false;
                self.observer
                    .notice(UserNotice::TranscriptionFailed(e.to_string()));
                return;
            }
        };

        info!("Transcription finished: {} utterances", utterances.len());
        self.document.clear();
        self.timeline.clear();
        self.utterances = utterances;
        self.translations.clear();
        self.playback_enabled = true;
        self.persist();

        self.renderer.start(self.utterances.len());
        if self.utterances.is_empty() {
            self.translation_toggle_enabled = false;
            self.observer.notice(UserNotice::EmptyTranscript);
            return;
        }

        if self.auto_translate {
            self.start_translation(self.settings.translation.provider);
        }
    }

    fn on_translation(&mut self, event: TranslationEvent) {
        let update = match self
            .merge
            .apply(event, &mut self.translations, &mut self.document)
        {
            Some(update) => update,
            None => return,
        };

        if let Some(message) = update.failure {
            self.observer.notice(UserNotice::TranslationFailed {
                index: update.index,
                message,
            });
        }
        self.observer.translation_progress(update.progress);

        if update.finished {
            self.persist();
            if let Err(e) = self.redisplay() {
                debug!("Redisplay after translation failed: {}", e);
            }
        }
    }

    /// Rebuild the document from scratch and resync to the player.
    ///
    /// During a reveal only the blocks shown so far are rebuilt; the rest
    /// pick up their translations as they appear.
    fn redisplay(&mut self) -> Result<()> {
        self.highlighter.clear(&mut self.document);
        let shown = match self.renderer.state() {
            RevealState::Revealing => self.renderer.progress().revealed,
            _ => self.utterances.len(),
        };
        let shown = shown.min(self.utterances.len());
        self.document
            .rebuild(&self.utterances[..shown], &self.translations)?;
        self.position_tick(self.playback.position(), true);
        Ok(())
    }

    fn persist(&mut self) {
        let current = match &self.current {
            Some(current) => current.clone(),
            None => return,
        };
        let record = CacheRecord {
            subtitles: self.utterances.clone(),
            translations: self.translations.clone(),
            file_path: current.path.to_string_lossy().to_string(),
        };

        let result = self
            .cache
            .save_record(&current.hash, &record)
            .and_then(|_| self.cache.register(&current.hash, &current.path));
        if let Err(e) = result {
            warn!("Failed to save subtitle cache: {}", e);
            self.observer.notice(UserNotice::Io(e.to_string()));
        }
    }

    fn report_sync(&mut self, change: SyncChange) {
        if change.is_empty() {
            return;
        }
        let utterances = &self.utterances;
        let translations = &self.translations;
        let word_index = self.highlighter.current_word();

        let active = self.highlighter.current_utterance().and_then(|index| {
            let utterance = utterances.get(index)?;
            let first_word: usize = utterances[..index].iter().map(|u| u.words.len()).sum();
            let word = word_index
                .and_then(|w| w.checked_sub(first_word))
                .and_then(|w| utterance.words.get(w));
            Some(SubtitleView {
                index,
                utterance,
                translation: translations.get(&index),
                word,
            })
        });
        self.observer.sync_changed(change, active);
    }
}
