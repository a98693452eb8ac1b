//! Device-free media backend for RIFF/WAVE payloads.
//!
//! Nothing is sent to an audio device; a tokio clock advances the position
//! while playing, so the engine sees the same event sequence a real output
//! would produce.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::PlaybackError;
use crate::media::{MediaBackend, MediaEvent, MediaHandle};

/// Header facts needed to clock a WAVE payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub data_len: usize,
}

impl WavInfo {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.data_len as f64 / f64::from(self.byte_rate))
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Walks the RIFF chunk list for `fmt ` and `data`.
///
/// A `data` size larger than the payload (streamed WAVE) is clamped to what
/// is present.
pub fn parse_wav(bytes: &[u8]) -> Result<WavInfo, PlaybackError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(PlaybackError::Decode("payload is not RIFF/WAVE".into()));
    }

    let mut format: Option<(u16, u32, u32)> = None;
    let mut data_len: Option<usize> = None;
    let mut at = 12;
    while at + 8 <= bytes.len() && data_len.is_none() {
        let id = &bytes[at..at + 4];
        let size = read_u32(bytes, at + 4).unwrap_or(0) as usize;
        let body = at + 8;
        match id {
            b"fmt " => {
                let channels = read_u16(bytes, body + 2);
                let sample_rate = read_u32(bytes, body + 4);
                let byte_rate = read_u32(bytes, body + 8);
                if let (Some(channels), Some(sample_rate), Some(byte_rate)) =
                    (channels, sample_rate, byte_rate)
                {
                    format = Some((channels, sample_rate, byte_rate));
                }
            }
            b"data" => data_len = Some(size.min(bytes.len() - body)),
            _ => {}
        }
        at = body.saturating_add(size).saturating_add(size % 2);
    }

    let (channels, sample_rate, byte_rate) =
        format.ok_or_else(|| PlaybackError::Decode("missing fmt chunk".into()))?;
    if byte_rate == 0 {
        return Err(PlaybackError::Decode("fmt chunk has zero byte rate".into()));
    }
    let data_len = data_len.ok_or_else(|| PlaybackError::Decode("missing data chunk".into()))?;
    Ok(WavInfo {
        channels,
        sample_rate,
        byte_rate,
        data_len,
    })
}

/// [`MediaBackend`] that clocks WAVE payloads without an output device.
#[derive(Clone, Debug)]
pub struct HeadlessBackend {
    tick: Duration,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            tick: Duration::from_millis(250),
        }
    }

    /// Interval between progress events while playing.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for HeadlessBackend {
    fn load(&self, audio: Bytes) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let info = parse_wav(&audio)?;
        debug!(
            channels = info.channels,
            sample_rate = info.sample_rate,
            duration_ms = info.duration().as_millis() as u64,
            "loaded wave payload"
        );
        let (playing, _) = watch::channel(false);
        Ok(Box::new(HeadlessHandle {
            duration: info.duration(),
            tick: self.tick,
            playing,
            clock: None,
        }))
    }
}

struct HeadlessHandle {
    duration: Duration,
    tick: Duration,
    playing: watch::Sender<bool>,
    clock: Option<JoinHandle<()>>,
}

impl MediaHandle for HeadlessHandle {
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MediaEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
        self.clock = Some(tokio::spawn(run_clock(
            self.duration,
            self.tick,
            self.playing.subscribe(),
            tx,
        )));
        rx
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.playing.send_replace(true);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.playing.send_replace(false);
        Ok(())
    }

    fn release(self: Box<Self>) {
        if let Some(clock) = self.clock {
            clock.abort();
        }
    }
}

async fn run_clock(
    duration: Duration,
    tick: Duration,
    mut playing: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<MediaEvent>,
) {
    let total = duration.as_secs_f64();
    let progress = |position: Duration| MediaEvent::Progress {
        current_time: position.as_secs_f64(),
        duration: Some(total),
        buffered_end: total,
    };

    // The whole payload is in memory, so it is fully buffered up front.
    if events.send(progress(Duration::ZERO)).is_err() || events.send(MediaEvent::CanPlay).is_err() {
        return;
    }

    let mut position = Duration::ZERO;
    loop {
        if !*playing.borrow_and_update() {
            if playing.changed().await.is_err() {
                return;
            }
            continue;
        }
        tokio::time::sleep(tick).await;
        if !*playing.borrow() {
            continue;
        }
        position = (position + tick).min(duration);
        if events.send(progress(position)).is_err() {
            return;
        }
        if position >= duration {
            let _ = events.send(MediaEvent::Ended);
            return;
        }
    }
}
