//! Streaming chat transport for the chat/voice widget SDK.
//!
//! Requests go to one gateway; responses are read incrementally, split into
//! lines, decoded into frames and normalized from the provider's wire dialect
//! into [`ChatChunk`] events.
//!
//! # Streaming a reply
//!
//! ```no_run
//! use widget_gateway::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GatewayClient::from_env()?;
//! let mut session = client.session();
//!
//! let mut stream = session.start(
//!     StreamRequest::chat("openai", "gpt-4o-mini")
//!         .message(ChatMessage::system("Answer briefly."))
//!         .message(ChatMessage::user("Say hello")),
//! )?;
//!
//! while let Some(event) = stream.next_event().await {
//!     if let Some(text) = event?.content() {
//!         print!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Gateway client, builder and availability check.
pub mod client;
/// Endpoint configuration and credential sources.
pub mod config;
/// Chat messages, content parts and image helpers.
pub mod content;
/// Provider dialect table and frame normalizers.
pub mod dialect;
/// Error taxonomy and upstream failure normalization.
pub mod errors;
/// Line framing and sentinel detection.
pub mod frame;
/// Provider ids, endpoint kinds and decoding options.
pub mod model;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Stream requests and the outbound body.
pub mod request;
/// Stream sessions, event streams and cancellation.
pub mod session;
/// Normalized stream events.
pub mod stream;
/// HTTP transport seam and incremental line reader.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{GatewayClient, GatewayClientBuilder};
pub use config::{CredentialSource, GatewayConfig, NoCredentials, StaticToken};
pub use content::{ChatMessage, ContentPart, ImageDetail, ImageUrl, MessageContent};
pub use dialect::Dialect;
pub use errors::{ConfigError, GatewayError, StreamError, TransportError, normalize_failure};
pub use frame::{Frame, FrameError};
pub use model::{DecodingOptions, EndpointKind, ProviderId};
pub use observability::init_observability;
pub use request::StreamRequest;
pub use session::{AbortHandle, ChatStream, StreamSession};
pub use stream::{ChatChunk, ChatCompletion, ChunkChoice, Delta, Usage};
pub use transport::{HttpRequest, HttpTransport, LineReader, Transport, TransportResponse};
