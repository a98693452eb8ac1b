use std::fmt;

use crate::errors::PlaybackError;

/// Five-state playback lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

impl PlaybackState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event pushed to the [`PlaybackStream`](crate::PlaybackStream) of a session.
///
/// Times are in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct PlaybackProgress {
    pub current_time: f64,
    pub duration: Option<f64>,
    pub buffered_end: f64,
    /// 0..=100; 0 when the duration is unknown or zero.
    pub percentage: f64,
    pub state: PlaybackState,
}

impl PlaybackProgress {
    pub fn new(
        current_time: f64,
        duration: Option<f64>,
        buffered_end: f64,
        state: PlaybackState,
    ) -> Self {
        let percentage = match duration {
            Some(total) if total.is_finite() && total > 0.0 => {
                (current_time / total * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };
        Self {
            current_time,
            duration,
            buffered_end,
            percentage,
            state,
        }
    }

    pub(crate) fn with_state(self, state: PlaybackState) -> Self {
        Self::new(self.current_time, self.duration, self.buffered_end, state)
    }
}

/// Snapshot published on every state change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub epoch: u64,
    /// Set while `state` is [`PlaybackState::Error`].
    pub error: Option<PlaybackError>,
}
