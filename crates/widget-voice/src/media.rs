//! Adapter seam over the platform's audio decoding and playback primitive.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::errors::PlaybackError;

/// Lifecycle notification from a loaded media resource.
#[derive(Clone, Debug, PartialEq)]
pub enum MediaEvent {
    /// Enough data is buffered to start playing.
    CanPlay,
    /// Position update, in seconds.
    Progress {
        current_time: f64,
        duration: Option<f64>,
        buffered_end: f64,
    },
    /// Playback reached the end of the audio.
    Ended,
    /// Decoding or output failed.
    Failed(String),
}

/// Turns a complete audio payload into a playable resource.
pub trait MediaBackend: Send + Sync {
    fn load(&self, audio: Bytes) -> Result<Box<dyn MediaHandle>, PlaybackError>;
}

/// A loaded, playable resource.
///
/// `release` consumes the handle, so it runs exactly once.
pub trait MediaHandle: Send {
    /// Attaches the lifecycle listener and begins buffering.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MediaEvent>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self) -> Result<(), PlaybackError>;
    /// Stops output, detaches listeners and frees the resource.
    fn release(self: Box<Self>);
}
