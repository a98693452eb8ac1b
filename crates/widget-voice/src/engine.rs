//! Cancellable speech playback.
//!
//! One engine owns at most one playback session. Every `speak()` and `stop()`
//! bumps the epoch; fetch results and media events carry the epoch they were
//! started under and are dropped once it is stale.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::PlaybackError;
use crate::media::{MediaBackend, MediaEvent, MediaHandle};
use crate::speech::{SpeechRequest, SpeechSynthesizer};
use crate::status::{PlaybackProgress, PlaybackState, PlaybackStatus};

/// Playback engine handle. Clones drive the same session.
#[derive(Clone)]
pub struct AudioPlaybackEngine {
    shared: Arc<Shared>,
}

struct Shared {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    backend: Arc<dyn MediaBackend>,
    inner: Mutex<Inner>,
    status: watch::Sender<PlaybackStatus>,
}

#[derive(Default)]
struct Inner {
    epoch: u64,
    state: PlaybackState,
    error: Option<PlaybackError>,
    progress: PlaybackProgress,
    handle: Option<Box<dyn MediaHandle>>,
    fetch: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    progress_tx: Option<mpsc::UnboundedSender<PlaybackProgress>>,
}

impl AudioPlaybackEngine {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, backend: Arc<dyn MediaBackend>) -> Self {
        let (status, _) = watch::channel(PlaybackStatus::default());
        Self {
            shared: Arc::new(Shared {
                synthesizer,
                backend,
                inner: Mutex::new(Inner::default()),
                status,
            }),
        }
    }

    /// Replaces any current session and starts fetching `text` in `voice`.
    ///
    /// The previous session is torn down before this returns. Must be called
    /// inside a tokio runtime.
    pub fn speak(&self, text: impl Into<String>, voice: impl Into<String>) -> PlaybackStream {
        let request = SpeechRequest::new(text, voice);
        let shared = &self.shared;
        let mut inner = shared.lock();
        shared.teardown(&mut inner);
        inner.epoch += 1;
        let epoch = inner.epoch;
        shared.transition(&mut inner, PlaybackState::Loading);

        let (tx, rx) = mpsc::unbounded_channel();
        inner.progress_tx = Some(tx);
        info!(epoch, voice = %request.voice, chars = request.text.chars().count(), "speak");

        let task_shared = shared.clone();
        inner.fetch = Some(tokio::spawn(async move {
            let result = task_shared.synthesizer.synthesize(request).await;
            task_shared.on_audio(epoch, result);
        }));
        PlaybackStream { epoch, rx }
    }

    /// Pauses playback. Valid only while playing.
    pub fn pause(&self) -> Result<(), PlaybackError> {
        self.shared
            .toggle("pause", PlaybackState::Playing, PlaybackState::Paused)
    }

    /// Resumes paused playback. Valid only while paused.
    pub fn resume(&self) -> Result<(), PlaybackError> {
        self.shared
            .toggle("resume", PlaybackState::Paused, PlaybackState::Playing)
    }

    /// Aborts any fetch, releases the media resource and returns to Idle.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        inner.epoch += 1;
        if inner.state != PlaybackState::Idle {
            info!(epoch = inner.epoch, state = %inner.state, "stop");
        }
        shared.teardown(&mut inner);
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    pub fn epoch(&self) -> u64 {
        self.shared.lock().epoch
    }

    /// Last progress snapshot of the current session.
    pub fn progress(&self) -> PlaybackProgress {
        self.shared.lock().progress
    }

    /// State-change subscription; errors are carried in the status.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.shared.status.subscribe()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.status.send_replace(PlaybackStatus {
            state: inner.state,
            epoch: inner.epoch,
            error: inner.error.clone(),
        });
    }

    fn transition(&self, inner: &mut Inner, state: PlaybackState) {
        if inner.state != state {
            debug!(epoch = inner.epoch, from = %inner.state, to = %state, "playback transition");
        }
        inner.state = state;
        inner.progress = inner.progress.with_state(state);
        self.publish(inner);
    }

    fn emit_progress(inner: &Inner) {
        if let Some(tx) = inner.progress_tx.as_ref() {
            let _ = tx.send(inner.progress);
        }
    }

    /// Releases everything the session owns and goes to Idle.
    ///
    /// The fetch and listener tasks are aborted unless the caller already
    /// took them out of `inner`.
    fn teardown(&self, inner: &mut Inner) {
        if let Some(fetch) = inner.fetch.take() {
            fetch.abort();
        }
        if let Some(listener) = inner.listener.take() {
            listener.abort();
        }
        if let Some(handle) = inner.handle.take() {
            handle.release();
        }
        inner.progress_tx = None;
        inner.progress = PlaybackProgress::default();
        inner.error = None;
        self.transition(inner, PlaybackState::Idle);
    }

    fn fail(&self, inner: &mut Inner, error: PlaybackError) {
        warn!(epoch = inner.epoch, state = %inner.state, error = %error, "playback failed");
        self.teardown(inner);
        inner.error = Some(error);
        self.transition(inner, PlaybackState::Error);
    }

    fn toggle(
        &self,
        op: &'static str,
        from: PlaybackState,
        to: PlaybackState,
    ) -> Result<(), PlaybackError> {
        let mut inner = self.lock();
        if inner.state != from {
            return Err(PlaybackError::InvalidTransition {
                op,
                state: inner.state,
            });
        }
        let applied = match inner.handle.as_mut() {
            Some(handle) if to == PlaybackState::Playing => handle.play(),
            Some(handle) => handle.pause(),
            None => Err(PlaybackError::Media("media handle missing".into())),
        };
        if let Err(err) = applied {
            self.fail(&mut inner, err.clone());
            return Err(err);
        }
        self.transition(&mut inner, to);
        Self::emit_progress(&inner);
        Ok(())
    }

    /// Fetch completion for the session started under `epoch`.
    fn on_audio(self: &Arc<Self>, epoch: u64, result: Result<Bytes, PlaybackError>) {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(epoch, current = inner.epoch, "dropping stale audio response");
            return;
        }
        // Runs on the fetch task; teardown must not abort it.
        inner.fetch = None;

        let loaded = result.and_then(|audio| {
            debug!(epoch, bytes = audio.len(), "audio payload received");
            self.backend.load(audio)
        });
        let mut handle = match loaded {
            Ok(handle) => handle,
            Err(err) => {
                self.fail(&mut inner, err);
                return;
            }
        };

        let mut events = handle.subscribe();
        inner.handle = Some(handle);
        let shared = self.clone();
        inner.listener = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !shared.on_media_event(epoch, event) {
                    break;
                }
            }
        }));
    }

    /// Applies one media event; returns whether the listener should continue.
    fn on_media_event(&self, epoch: u64, event: MediaEvent) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(epoch, current = inner.epoch, ?event, "dropping stale media event");
            return false;
        }

        match event {
            MediaEvent::CanPlay => {
                if inner.state != PlaybackState::Loading {
                    return true;
                }
                let started = match inner.handle.as_mut() {
                    Some(handle) => handle.play(),
                    None => Err(PlaybackError::Media("media handle missing".into())),
                };
                if let Err(err) = started {
                    inner.listener = None;
                    self.fail(&mut inner, err);
                    return false;
                }
                self.transition(&mut inner, PlaybackState::Playing);
                Self::emit_progress(&inner);
                true
            }
            MediaEvent::Progress {
                current_time,
                duration,
                buffered_end,
            } => {
                inner.progress =
                    PlaybackProgress::new(current_time, duration, buffered_end, inner.state);
                Self::emit_progress(&inner);
                true
            }
            MediaEvent::Ended => {
                let last = inner.progress;
                let end = last.duration.unwrap_or(last.current_time);
                inner.progress =
                    PlaybackProgress::new(end, last.duration, last.buffered_end, PlaybackState::Idle);
                Self::emit_progress(&inner);
                info!(epoch, "playback finished");
                inner.listener = None;
                self.teardown(&mut inner);
                false
            }
            MediaEvent::Failed(message) => {
                inner.listener = None;
                self.fail(&mut inner, PlaybackError::Media(message));
                false
            }
        }
    }
}

/// Progress events of one playback session.
///
/// Ends when the session finishes, fails or is replaced.
pub struct PlaybackStream {
    epoch: u64,
    rx: mpsc::UnboundedReceiver<PlaybackProgress>,
}

impl PlaybackStream {
    /// Epoch the session was started under.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub async fn next_progress(&mut self) -> Option<PlaybackProgress> {
        self.rx.recv().await
    }
}

impl futures::Stream for PlaybackStream {
    type Item = PlaybackProgress;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
