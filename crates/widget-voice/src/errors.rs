use widget_gateway::GatewayError;

use crate::status::PlaybackState;

/// Failure of a playback session.
///
/// Every variant except `InvalidTransition` moves the engine to
/// [`PlaybackState::Error`] and stays in its status until the next
/// `speak()` or `stop()`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    /// Speech endpoint answered with a non-success status.
    #[error(transparent)]
    Upstream(GatewayError),
    /// Speech request could not be sent or its body could not be read.
    #[error("audio request failed: {0}")]
    Transport(String),
    /// Payload is not a playable audio resource.
    #[error("audio could not be decoded: {0}")]
    Decode(String),
    /// Media backend failed while playing.
    #[error("media playback failed: {0}")]
    Media(String),
    /// Operation not valid from the current state; the state is unchanged.
    #[error("cannot {op} while {state}")]
    InvalidTransition {
        op: &'static str,
        state: PlaybackState,
    },
}
