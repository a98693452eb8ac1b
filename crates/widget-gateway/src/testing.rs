//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::channel::mpsc as fmpsc;

use crate::client::GatewayClient;
use crate::config::{GatewayConfig, StaticToken};
use crate::errors::TransportError;
use crate::transport::{ByteStream, HttpRequest, Transport, TransportResponse};

pub(crate) enum Scripted {
    Body { status: u16, chunks: Vec<Vec<u8>> },
    Live {
        status: u16,
        feed: fmpsc::UnboundedReceiver<Result<Bytes, TransportError>>,
    },
    Refused(String),
    Hang,
}

impl Scripted {
    pub(crate) fn body(status: u16, chunks: Vec<String>) -> Self {
        Self::Body {
            status,
            chunks: chunks.into_iter().map(String::into_bytes).collect(),
        }
    }

    pub(crate) fn raw(status: u16, chunks: Vec<Vec<u8>>) -> Self {
        Self::Body { status, chunks }
    }

    /// Response whose body is fed by the returned sender.
    pub(crate) fn live(
        status: u16,
    ) -> (Self, fmpsc::UnboundedSender<Result<Bytes, TransportError>>) {
        let (tx, rx) = fmpsc::unbounded();
        (Self::Live { status, feed: rx }, tx)
    }
}

pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn response(status: u16, url: String, body: ByteStream) -> TransportResponse {
    let status_text = match status {
        200 => "OK",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    };
    TransportResponse {
        status,
        status_text: status_text.to_string(),
        url,
        body,
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().expect("requests lock").push(request);
        let next = self.script.lock().expect("script lock").pop_front();
        match next {
            Some(Scripted::Body { status, chunks }) => {
                let body = futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))));
                Ok(response(status, url, Box::pin(body)))
            }
            Some(Scripted::Live { status, feed }) => Ok(response(status, url, Box::pin(feed))),
            Some(Scripted::Refused(message)) => Err(TransportError::new(message)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(TransportError::new("no scripted response left")),
        }
    }
}

/// Client against `http://gateway.test` with a static test token.
pub(crate) fn client_with(transport: Arc<ScriptedTransport>) -> GatewayClient {
    GatewayClient::builder(GatewayConfig::new("http://gateway.test"))
        .transport(transport)
        .credentials(Arc::new(StaticToken::new("test-token")))
        .build()
        .expect("test client")
}
