//! Cancellable speech playback for the chat/voice widget SDK.
//!
//! [`AudioPlaybackEngine`] fetches one complete synthesized payload per
//! `speak()` and drives it through Idle, Loading, Playing, Paused and Error.
//! The engine is an owned value; build one at the composition root and pass
//! it to whatever needs voice output.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use widget_gateway::GatewayClient;
//! use widget_voice::{AudioPlaybackEngine, GatewaySpeech, HeadlessBackend};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GatewayClient::from_env()?;
//! let engine = AudioPlaybackEngine::new(
//!     Arc::new(GatewaySpeech::new(&client)),
//!     Arc::new(HeadlessBackend::new()),
//! );
//!
//! let mut progress = engine.speak("Hello there", "alloy");
//! while let Some(update) = progress.next_progress().await {
//!     println!("{:.0}% ({})", update.percentage, update.state);
//! }
//! # Ok(())
//! # }
//! ```

/// Playback engine and its progress stream.
pub mod engine;
/// Playback error type.
pub mod errors;
/// Clock-driven backend for WAVE payloads.
pub mod headless;
/// Media backend and handle traits.
pub mod media;
/// Speech synthesis seam and the gateway implementation.
pub mod speech;
/// Playback state, progress and status snapshots.
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{AudioPlaybackEngine, PlaybackStream};
pub use errors::PlaybackError;
pub use headless::{HeadlessBackend, WavInfo, parse_wav};
pub use media::{MediaBackend, MediaEvent, MediaHandle};
pub use speech::{GatewaySpeech, SpeechRequest, SpeechSynthesizer};
pub use status::{PlaybackProgress, PlaybackState, PlaybackStatus};
