//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, ChatChunk, ChatCompletion, ChatMessage, ChatStream, ContentPart, EndpointKind,
    GatewayClient, GatewayConfig, ProviderId, StreamError, StreamRequest, StreamSession,
};
