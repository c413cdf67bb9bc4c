//! Play command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{PodsubError, Result as PodsubResult};
use crate::playback::{ClockPlayback, Playback};
use crate::session::{LoadOutcome, Session, SessionObserver, SubtitleView, UserNotice};
use crate::sync::{MergeProgress, RevealProgress, RevealState, SyncChange, TextSurface};
use crate::transcript::Utterance;
use crate::transcription::{AssemblyAiTranscriber, Transcriber};
use crate::translation::TranslatorKind;
use anyhow::Result;
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;

/// How long to keep going after the last subtitle ends.
const TAIL_MS: i64 = 2000;

/// Stand-in used when no transcription key is configured; cached files
/// still play.
struct UnconfiguredTranscriber;

#[async_trait]
impl Transcriber for UnconfiguredTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> PodsubResult<Vec<Utterance>> {
        Err(PodsubError::Transcription(
            "No AssemblyAI API key configured. Set credentials.asr_api_key or ASSEMBLYAI_API_KEY."
                .to_string(),
        ))
    }
}

/// Prints session activity to the terminal.
#[derive(Default)]
struct TerminalObserver {
    reveal_bar: Option<ProgressBar>,
    translation_bar: Option<ProgressBar>,
}

impl SessionObserver for TerminalObserver {
    fn notice(&mut self, notice: UserNotice) {
        match notice {
            UserNotice::EmptyTranscript | UserNotice::NothingToTranslate => {
                Output::warning(&notice.to_string())
            }
            UserNotice::MissingCredential(_) => Output::warning(&notice.to_string()),
            _ => Output::error(&notice.to_string()),
        }
    }

    fn reveal_progress(&mut self, progress: RevealProgress) {
        let bar = self
            .reveal_bar
            .get_or_insert_with(|| Output::progress_bar(progress.total as u64, "subtitles"));
        bar.set_position(progress.revealed as u64);
        if progress.is_complete() {
            bar.finish_and_clear();
            self.reveal_bar = None;
        }
    }

    fn translation_progress(&mut self, progress: MergeProgress) {
        if progress.total == 0 {
            return;
        }
        let bar = self
            .translation_bar
            .get_or_insert_with(|| Output::progress_bar(progress.total as u64, "translated"));
        bar.set_position(progress.completed as u64);
        if progress.is_finished() {
            bar.finish_and_clear();
            self.translation_bar = None;
            if progress.failed > 0 {
                Output::warning(&format!(
                    "{} of {} translations failed",
                    progress.failed, progress.total
                ));
            } else {
                Output::success(&format!("Translated {} subtitles", progress.total));
            }
        }
    }

    fn sync_changed(&mut self, change: SyncChange, active: Option<SubtitleView<'_>>) {
        if change.utterance.is_none() {
            return;
        }
        if let Some(view) = active {
            Output::subtitle(&view);
        }
    }
}

/// Run the play command.
pub async fn run_play(
    input: &str,
    by_hash: bool,
    no_translate: bool,
    translator: Option<&str>,
    hide_translation: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(name) = translator {
        settings.translation.provider = name
            .parse::<TranslatorKind>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    let transcriber: Arc<dyn Transcriber> = match settings.credentials.asr() {
        Some(key) => Arc::new(AssemblyAiTranscriber::new(&key)?),
        None => Arc::new(UnconfiguredTranscriber),
    };
    let playback: Arc<dyn Playback> = Arc::new(ClockPlayback::new(None));

    let mut session = Session::new(
        settings,
        transcriber,
        Arc::clone(&playback),
        TextSurface::new(),
        Box::new(TerminalObserver::default()),
    )?;
    session.set_auto_translate(!no_translate);
    session.set_show_translation(!hide_translation);

    let outcome = if by_hash {
        session.load_cached(input).await
    } else {
        session.load_file(Path::new(input)).await
    };
    let mut spinner = None;
    match outcome {
        Ok(LoadOutcome::Cached {
            utterances,
            translations,
        }) => Output::success(&format!(
            "Loaded {} subtitles and {} translations from cache",
            utterances, translations
        )),
        Ok(LoadOutcome::Transcribing) => {
            spinner = Some(Output::spinner(&format!("Transcribing {}...", input)));
        }
        Err(e) => {
            Output::error(&format!("Failed to load {}: {}", input, e));
            return Err(e.into());
        }
    }
    if let Some(file) = session.current_file() {
        Output::kv("Hash", &file.hash);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut started = false;
    let mut failed = false;

    loop {
        if !session.is_transcribing() {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
        }

        if !started
            && session.is_playback_enabled()
            && session.reveal_state() != RevealState::Revealing
        {
            session.play_pause();
            started = true;
            Output::info("Playing. Press Ctrl-C to stop.");
        }

        if started {
            let end = session.utterances().last().map(|u| u.end_time).unwrap_or(0);
            if !session.is_playback_enabled() || playback.position() > end + TAIL_MS {
                break;
            }
        } else if !session.is_transcribing() && !session.is_playback_enabled() {
            failed = true;
            break;
        }

        tokio::select! {
            _ = &mut shutdown => {
                println!();
                break;
            }
            _ = session.step() => {}
        }
    }

    session.shutdown().await;
    if failed {
        return Err(anyhow::anyhow!("Could not transcribe {}", input));
    }
    Output::success("Done.");
    Ok(())
}
