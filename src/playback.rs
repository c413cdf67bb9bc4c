//! Media playback collaborator.
//!
//! The subtitle engine only needs a position to poll and a way to seek, so
//! decoding and output live behind the [`Playback`] trait. [`ClockPlayback`]
//! is a wall-clock implementation used by the terminal front end and tests.

use std::sync::Mutex;
use std::time::Instant;

/// Trait for media players driven by the subtitle session.
///
/// Implementations are shared with the position-polling worker, so every
/// method takes `&self`.
pub trait Playback: Send + Sync {
    /// Current position in milliseconds.
    fn position(&self) -> i64;

    /// Jump to a position in milliseconds.
    fn seek(&self, position_ms: i64);

    fn play(&self);

    fn pause(&self);

    fn is_playing(&self) -> bool;

    /// Total duration in milliseconds, if known.
    fn duration(&self) -> Option<i64>;
}

#[derive(Debug)]
struct ClockState {
    /// Position at the moment of the last play/pause/seek.
    anchor_position: i64,
    /// When playback last started, if it is running.
    playing_since: Option<Instant>,
}

/// A player whose position advances with wall-clock time.
#[derive(Debug)]
pub struct ClockPlayback {
    state: Mutex<ClockState>,
    duration: Option<i64>,
}

impl ClockPlayback {
    /// Create a paused player at position zero.
    pub fn new(duration: Option<i64>) -> Self {
        Self {
            state: Mutex::new(ClockState {
                anchor_position: 0,
                playing_since: None,
            }),
            duration,
        }
    }

    fn clamp(&self, position: i64) -> i64 {
        match self.duration {
            Some(d) => position.clamp(0, d),
            None => position.max(0),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ClockState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn current(&self, state: &ClockState) -> i64 {
        let elapsed = state
            .playing_since
            .map(|since| since.elapsed().as_millis() as i64)
            .unwrap_or(0);
        self.clamp(state.anchor_position + elapsed)
    }
}

impl Playback for ClockPlayback {
    fn position(&self) -> i64 {
        self.with_state(|state| self.current(state))
    }

    fn seek(&self, position_ms: i64) {
        let position = self.clamp(position_ms);
        self.with_state(|state| {
            state.anchor_position = position;
            if state.playing_since.is_some() {
                state.playing_since = Some(Instant::now());
            }
        });
    }

    fn play(&self) {
        self.with_state(|state| {
            if state.playing_since.is_none() {
                state.playing_since = Some(Instant::now());
            }
        });
    }

    fn pause(&self) {
        self.with_state(|state| {
            state.anchor_position = self.current(state);
            state.playing_since = None;
        });
    }

    fn is_playing(&self) -> bool {
        self.with_state(|state| state.playing_since.is_some())
    }

    fn duration(&self) -> Option<i64> {
        self.duration
    }
}
