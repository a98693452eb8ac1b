//! Fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::errors::PlaybackError;
use crate::media::{MediaBackend, MediaEvent, MediaHandle};
use crate::speech::{SpeechRequest, SpeechSynthesizer};

type Reply = Result<Bytes, PlaybackError>;

/// Synthesizer whose replies are released by the test, per text.
#[derive(Default)]
pub(crate) struct FakeSpeech {
    replies: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
    requests: Mutex<Vec<SpeechRequest>>,
}

impl FakeSpeech {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn script(&self, text: &str) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.replies
            .lock()
            .expect("replies lock")
            .insert(text.to_string(), rx);
        tx
    }

    pub(crate) fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, request: SpeechRequest) -> Result<Bytes, PlaybackError> {
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .remove(&request.text);
        self.requests.lock().expect("requests lock").push(request);
        match reply {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(PlaybackError::Transport("reply dropped".into()))),
            None => Err(PlaybackError::Transport("no scripted reply".into())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Counts {
    pub(crate) plays: usize,
    pub(crate) pauses: usize,
    pub(crate) releases: usize,
}

#[derive(Default)]
struct Log {
    counts: Counts,
    loaded: Vec<Bytes>,
    events: Option<mpsc::UnboundedSender<MediaEvent>>,
    pause_failure: Option<String>,
}

/// Backend whose media events are pushed by the test. Payload `bad` fails
/// to decode.
#[derive(Default)]
pub(crate) struct FakeBackend {
    log: Arc<Mutex<Log>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose handles fail every `pause` with a media error.
    pub(crate) fn failing_pause(message: &str) -> Arc<Self> {
        let backend = Self::default();
        backend.log.lock().expect("log lock").pause_failure = Some(message.to_string());
        Arc::new(backend)
    }

    pub(crate) fn counts(&self) -> Counts {
        self.log.lock().expect("log lock").counts
    }

    pub(crate) fn loaded(&self) -> Vec<Bytes> {
        self.log.lock().expect("log lock").loaded.clone()
    }

    /// Sends `event` to the most recent subscriber.
    pub(crate) fn emit(&self, event: MediaEvent) {
        if let Some(tx) = self.log.lock().expect("log lock").events.as_ref() {
            let _ = tx.send(event);
        }
    }

    pub(crate) fn listener_detached(&self) -> bool {
        self.log
            .lock()
            .expect("log lock")
            .events
            .as_ref()
            .is_none_or(|tx| tx.is_closed())
    }
}

impl MediaBackend for FakeBackend {
    fn load(&self, audio: Bytes) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        if &audio[..] == b"bad" {
            return Err(PlaybackError::Decode("unsupported container".into()));
        }
        self.log.lock().expect("log lock").loaded.push(audio);
        Ok(Box::new(FakeHandle {
            log: self.log.clone(),
        }))
    }
}

struct FakeHandle {
    log: Arc<Mutex<Log>>,
}

impl MediaHandle for FakeHandle {
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MediaEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.log.lock().expect("log lock").events = Some(tx);
        rx
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.log.lock().expect("log lock").counts.plays += 1;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        let mut log = self.log.lock().expect("log lock");
        log.counts.pauses += 1;
        match log.pause_failure.clone() {
            Some(message) => Err(PlaybackError::Media(message)),
            None => Ok(()),
        }
    }

    fn release(self: Box<Self>) {
        self.log.lock().expect("log lock").counts.releases += 1;
    }
}

/// Mono 8-bit PCM WAVE of `seconds` at `sample_rate`.
pub(crate) fn wav(sample_rate: u32, seconds: u32) -> Bytes {
    let data_len = sample_rate * seconds;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0x80);
    Bytes::from(out)
}
