use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::client::ClientInner;
use crate::dialect::{Dialect, FrameFailure, FrameNormalizer};
use crate::errors::{GatewayError, StreamError, normalize_failure};
use crate::frame::{self, Frame};
use crate::model::ProviderId;
use crate::request::{StreamRequest, build_request_body};
use crate::stream::{ChatChunk, ChatCompletion};
use crate::transport::{HttpRequest, LineReader, Transport};

type EventItem = Result<ChatChunk, StreamError>;

/// Handle used to cancel a running stream.
///
/// Cancellation is not an error: the stream simply completes and nothing
/// queued behind the abort is delivered.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Owns at most one in-flight streaming request.
///
/// Independent sessions share nothing but the client's static configuration.
pub struct StreamSession {
    client: Arc<ClientInner>,
    session_id: uuid::Uuid,
    active: Option<AbortHandle>,
}

impl StreamSession {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self {
            client,
            session_id: uuid::Uuid::new_v4(),
            active: None,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Starts streaming `request`, cancelling any request this session still
    /// has in flight.
    ///
    /// Must be called inside a tokio runtime; the network exchange runs on a
    /// spawned task and events are pushed as soon as each chunk is parsed.
    pub fn start(&mut self, request: StreamRequest) -> Result<ChatStream, StreamError> {
        request.validate()?;
        self.cancel();

        let config = &self.client.config;
        let body = build_request_body(&request, &config.default_model);
        let body = serde_json::to_value(&body)
            .map_err(|e| StreamError::Validation(format!("failed to serialize request: {e}")))?;
        let url = config.endpoint_url(request.endpoint);
        let http_request = HttpRequest::post_json(url, body)
            .bearer_token(self.client.credentials.bearer_token());

        let request_id = uuid::Uuid::new_v4();
        let dialect = Dialect::for_provider(&request.provider);
        let (abort, abort_rx) = AbortHandle::new();
        let (tx, rx) = mpsc::unbounded_channel();
        info!(
            %request_id,
            session_id = %self.session_id,
            provider = %request.provider,
            model = %request.model,
            ?dialect,
            endpoint = ?request.endpoint,
            "starting chat stream"
        );

        let pump = Pump {
            request_id,
            provider: request.provider.clone(),
            dialect,
            normalize: dialect.normalizer(),
            completion_id: format!("chatcmpl-{}", request_id.simple()),
            tx,
            abort_rx,
            seq: 0,
            status: 200,
            status_text: String::new(),
            url: http_request.url.clone(),
        };
        tokio::spawn(pump_session(
            self.client.transport.clone(),
            http_request,
            pump,
        ));

        self.active = Some(abort.clone());
        Ok(ChatStream {
            request_id,
            provider: request.provider,
            model: request.model,
            rx,
            abort,
            finished: false,
        })
    }

    /// Aborts the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.active.take()
            && !handle.is_aborted()
        {
            debug!(session_id = %self.session_id, "cancelling in-flight chat stream");
            handle.abort();
        }
    }
}

/// Ordered event stream of one request.
///
/// Yields `Ok` chunks in parse order, at most one `Err`, then `None`.
/// Dropping the stream cancels the request.
pub struct ChatStream {
    request_id: uuid::Uuid,
    provider: ProviderId,
    model: String,
    rx: mpsc::UnboundedReceiver<EventItem>,
    abort: AbortHandle,
    finished: bool,
}

impl ChatStream {
    pub fn request_id(&self) -> uuid::Uuid {
        self.request_id
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Cancels the request; subsequent calls to `next_event` return `None`.
    pub fn cancel(&mut self) {
        self.abort.abort();
        self.close();
    }

    /// Waits for the next event; `None` once the stream completed or was
    /// cancelled.
    pub async fn next_event(&mut self) -> Option<EventItem> {
        if self.finished || self.abort.is_aborted() {
            self.close();
            return None;
        }
        let item = self.rx.recv().await;
        self.accept(item)
    }

    /// Drains the stream into one aggregated completion.
    ///
    /// A cancelled stream yields whatever arrived before the abort.
    pub async fn collect(mut self) -> Result<ChatCompletion, StreamError> {
        let mut completion = ChatCompletion::default();
        while let Some(item) = self.next_event().await {
            completion.absorb(&item?);
        }
        Ok(completion)
    }

    fn accept(&mut self, item: Option<EventItem>) -> Option<EventItem> {
        match item {
            Some(_) if self.abort.is_aborted() => {
                self.close();
                None
            }
            Some(Err(err)) => {
                self.close();
                Some(Err(err))
            }
            Some(Ok(chunk)) => Some(Ok(chunk)),
            None => {
                self.close();
                None
            }
        }
    }

    fn close(&mut self) {
        self.finished = true;
        self.rx.close();
    }
}

impl futures::Stream for ChatStream {
    type Item = EventItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished || this.abort.is_aborted() {
            this.close();
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(item) => Poll::Ready(this.accept(item)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

struct Pump {
    request_id: uuid::Uuid,
    provider: ProviderId,
    dialect: Dialect,
    normalize: FrameNormalizer,
    completion_id: String,
    tx: mpsc::UnboundedSender<EventItem>,
    abort_rx: watch::Receiver<bool>,
    seq: u64,
    status: u16,
    status_text: String,
    url: String,
}

impl Pump {
    fn aborted(&self) -> bool {
        *self.abort_rx.borrow()
    }

    /// Pushes one item unless the session was aborted or the consumer left.
    fn emit(&mut self, item: EventItem) -> bool {
        if self.aborted() {
            return false;
        }
        self.tx.send(item).is_ok()
    }

    fn fail(&mut self, err: StreamError) -> Flow {
        warn!(request_id = %self.request_id, provider = %self.provider, error = %err, "chat stream failed");
        self.emit(Err(err));
        Flow::Finished
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        let value = match frame::parse_line(line) {
            Ok(None) => return Flow::Continue,
            Ok(Some(Frame::Done)) => {
                debug!(request_id = %self.request_id, "completion sentinel received");
                return Flow::Finished;
            }
            Ok(Some(Frame::Payload(value))) => value,
            Err(err) => {
                let err = StreamError::protocol(self.provider.clone(), err.to_string());
                return self.fail(err);
            }
        };

        match (self.normalize)(&value) {
            Ok(None) => Flow::Continue,
            Ok(Some(mut chunk)) => {
                if chunk.id.is_empty() {
                    chunk.id = self.completion_id.clone();
                }
                let terminal = chunk.is_terminal();
                debug!(request_id = %self.request_id, seq = self.seq, terminal, "chat chunk");
                self.seq = self.seq.saturating_add(1);
                if !self.emit(Ok(chunk)) {
                    return Flow::Finished;
                }
                if terminal && self.dialect.ends_on_terminal_event() {
                    Flow::Finished
                } else {
                    Flow::Continue
                }
            }
            Err(FrameFailure::Upstream(message)) => {
                debug!(request_id = %self.request_id, %message, "in-band upstream error frame");
                let err = StreamError::Upstream(GatewayError {
                    status: self.status,
                    status_text: self.status_text.clone(),
                    body: value,
                    url: self.url.clone(),
                });
                self.fail(err)
            }
            Err(FrameFailure::Shape(message)) => {
                let err = StreamError::protocol(self.provider.clone(), message);
                self.fail(err)
            }
        }
    }
}

async fn wait_for_abort(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn pump_session(transport: Arc<dyn Transport>, request: HttpRequest, mut pump: Pump) {
    let request_id = pump.request_id;
    let aborted = wait_for_abort(pump.abort_rx.clone());
    tokio::pin!(aborted);

    let sent = tokio::select! {
        biased;
        _ = &mut aborted => {
            debug!(%request_id, "chat stream cancelled before response");
            return;
        }
        sent = transport.send(request) => sent,
    };
    let response = match sent {
        Ok(response) => response,
        Err(err) => {
            let err = StreamError::transport(pump.provider.clone(), err.message);
            pump.fail(err);
            return;
        }
    };

    if !response.is_success() {
        let failure = tokio::select! {
            biased;
            _ = &mut aborted => return,
            failure = normalize_failure(response) => failure,
        };
        pump.fail(StreamError::Upstream(failure));
        return;
    }

    pump.status = response.status;
    pump.status_text = response.status_text;
    pump.url = response.url;
    let mut body = response.body;
    let mut reader = LineReader::default();
    loop {
        let next = tokio::select! {
            biased;
            _ = &mut aborted => {
                debug!(%request_id, pending_bytes = reader.pending_len(), "chat stream cancelled");
                return;
            }
            next = body.next() => next,
        };
        match next {
            Some(Ok(chunk)) => {
                for line in reader.push_chunk(&chunk) {
                    if pump.handle_line(&line) == Flow::Finished {
                        return;
                    }
                }
            }
            Some(Err(err)) => {
                let err = StreamError::transport(pump.provider.clone(), err.message);
                pump.fail(err);
                return;
            }
            None => {
                if let Some(line) = reader.finish() {
                    pump.handle_line(&line);
                }
                debug!(%request_id, events = pump.seq, "chat stream reached end of body");
                return;
            }
        }
    }
}
