//! Frame sources feeding the sensor loop.
//!
//! The hand-tracking driver itself lives outside this crate. A
//! [`FrameSource`] is the seam: the sensor loop polls it with a timeout and
//! gets back sensor events, an idle tick or the end of the stream.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    sync::{Arc, PoisonError, RwLock, mpsc},
    thread,
    time::{Duration, Instant},
};

use handcursor_core::{HandFrame, SensorEvent};
use handcursor_proto::payloads::tracking::TrackingState;
use tracing::{debug, info};

use crate::error::ServerError;

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePoll {
    /// Something happened.
    Event(SensorEvent),
    /// Nothing within the timeout.
    Idle,
    /// The source will never produce another event.
    Finished,
}

/// Where sensor events come from.
pub trait FrameSource: Send {
    /// Wait at most `timeout` for the next event.
    fn poll(&mut self, timeout: Duration) -> SourcePoll;
}

/// Plays back a recording of frames, one JSON [`HandFrame`] per line.
///
/// Emits `Connected` first and `Disconnected` after the last frame. When
/// paced, frames are released at the spacing of their timestamps.
#[derive(Debug)]
pub struct ReplaySource {
    frames: std::vec::IntoIter<HandFrame>,
    paced: bool,
    clock: Option<(Instant, i64)>,
    pending: Option<HandFrame>,
    stage: ReplayStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplayStage {
    Start,
    Playing,
    Ended,
    Finished,
}

impl ReplaySource {
    /// Load a recording from disk.
    pub fn open(path: &Path) -> Result<Self, ServerError> {
        let reader = BufReader::new(File::open(path)?);
        let mut frames = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = serde_json::from_str::<HandFrame>(&line).map_err(|e| {
                ServerError::Recording { path: path.to_path_buf(), line: index + 1, reason: e.to_string() }
            })?;
            frames.push(frame);
        }
        info!(path = %path.display(), frames = frames.len(), "recording loaded");
        Ok(Self::from_frames(frames))
    }

    /// Play `frames` in order, paced.
    pub fn from_frames(frames: Vec<HandFrame>) -> Self {
        Self {
            frames: frames.into_iter(),
            paced: true,
            clock: None,
            pending: None,
            stage: ReplayStage::Start,
        }
    }

    /// Release frames as fast as they are polled.
    #[must_use]
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    fn next_frame(&mut self, timeout: Duration) -> SourcePoll {
        let Some(frame) = self.pending.take().or_else(|| self.frames.next()) else {
            self.stage = ReplayStage::Ended;
            return SourcePoll::Event(SensorEvent::Disconnected);
        };
        if !self.paced {
            return SourcePoll::Event(SensorEvent::Frame(frame));
        }

        let (started, first) = *self.clock.get_or_insert((Instant::now(), frame.timestamp_us));
        let offset = u64::try_from(frame.timestamp_us - first).unwrap_or(0);
        let due = started + Duration::from_micros(offset);
        let now = Instant::now();
        if due <= now {
            return SourcePoll::Event(SensorEvent::Frame(frame));
        }
        let wait = due - now;
        if wait > timeout {
            thread::sleep(timeout);
            self.pending = Some(frame);
            return SourcePoll::Idle;
        }
        thread::sleep(wait);
        SourcePoll::Event(SensorEvent::Frame(frame))
    }
}

impl FrameSource for ReplaySource {
    fn poll(&mut self, timeout: Duration) -> SourcePoll {
        match self.stage {
            ReplayStage::Start => {
                self.stage = ReplayStage::Playing;
                SourcePoll::Event(SensorEvent::Connected)
            },
            ReplayStage::Playing => self.next_frame(timeout),
            ReplayStage::Ended => {
                debug!("recording finished");
                self.stage = ReplayStage::Finished;
                SourcePoll::Finished
            },
            ReplayStage::Finished => SourcePoll::Finished,
        }
    }
}

/// Pushes events into a [`ChannelSource`] from any thread.
#[derive(Debug, Clone)]
pub struct SensorHandle {
    events: mpsc::Sender<SensorEvent>,
}

impl SensorHandle {
    /// Deliver an event. Returns `false` once the sensor loop has stopped.
    pub fn send(&self, event: SensorEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Report the sensor as connected.
    pub fn connect(&self) -> bool {
        self.send(SensorEvent::Connected)
    }

    /// Report the sensor as gone.
    pub fn disconnect(&self) -> bool {
        self.send(SensorEvent::Disconnected)
    }

    /// Deliver a tracking frame.
    pub fn frame(&self, frame: HandFrame) -> bool {
        self.send(SensorEvent::Frame(frame))
    }
}

/// Frame source fed through a [`SensorHandle`], for embedding drivers.
#[derive(Debug)]
pub struct ChannelSource {
    events: mpsc::Receiver<SensorEvent>,
}

impl ChannelSource {
    /// A source and the handle that feeds it.
    pub fn channel() -> (SensorHandle, Self) {
        let (events, receiver) = mpsc::channel();
        (SensorHandle { events }, Self { events: receiver })
    }
}

impl FrameSource for ChannelSource {
    fn poll(&mut self, timeout: Duration) -> SourcePoll {
        match self.events.recv_timeout(timeout) {
            Ok(event) => SourcePoll::Event(event),
            Err(mpsc::RecvTimeoutError::Timeout) => SourcePoll::Idle,
            Err(mpsc::RecvTimeoutError::Disconnected) => SourcePoll::Finished,
        }
    }
}

/// Sensor-level parameters set by clients and read by the sensor driver.
#[derive(Debug, Clone, Default)]
pub struct TrackingSettings(Arc<RwLock<TrackingState>>);

impl TrackingSettings {
    /// Current settings.
    pub fn get(&self) -> TrackingState {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the settings.
    pub fn set(&self, state: TrackingState) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn frames(n: i64, spacing_us: i64) -> Vec<HandFrame> {
        (0..n).map(|i| HandFrame { timestamp_us: 1_000 + i * spacing_us, hands: Vec::new() }).collect()
    }

    fn drain(source: &mut impl FrameSource) -> Vec<SourcePoll> {
        let mut seen = Vec::new();
        loop {
            let poll = source.poll(Duration::from_millis(100));
            if poll == SourcePoll::Finished {
                return seen;
            }
            if poll != SourcePoll::Idle {
                seen.push(poll);
            }
        }
    }

    #[test]
    fn replay_brackets_frames_with_connection_events() {
        let mut source = ReplaySource::from_frames(frames(3, 10)).unpaced();
        let seen = drain(&mut source);
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], SourcePoll::Event(SensorEvent::Connected));
        assert_eq!(seen[4], SourcePoll::Event(SensorEvent::Disconnected));
        assert_eq!(source.poll(Duration::ZERO), SourcePoll::Finished);
    }

    #[test]
    fn paced_replay_spans_recorded_time() {
        let mut source = ReplaySource::from_frames(frames(3, 20_000));
        let started = Instant::now();
        let seen = drain(&mut source);
        assert_eq!(seen.len(), 5);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn long_gap_yields_idle_polls() {
        let mut source = ReplaySource::from_frames(frames(2, 300_000));
        assert_eq!(source.poll(Duration::from_millis(10)), SourcePoll::Event(SensorEvent::Connected));
        assert!(matches!(source.poll(Duration::from_millis(10)), SourcePoll::Event(SensorEvent::Frame(_))));
        assert_eq!(source.poll(Duration::from_millis(10)), SourcePoll::Idle);
    }

    #[test]
    fn open_reads_json_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"timestamp_us":5,"hands":[]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"timestamp_us":6}}"#).unwrap();
        let mut source = ReplaySource::open(file.path()).unwrap().unpaced();
        assert_eq!(drain(&mut source).len(), 4);
    }

    #[test]
    fn open_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"timestamp_us":5}}"#).unwrap();
        writeln!(file, "oops").unwrap();
        let error = ReplaySource::open(file.path()).unwrap_err();
        assert!(matches!(error, ServerError::Recording { line: 2, .. }));
    }

    #[test]
    fn channel_source_relays_and_finishes() {
        let (handle, mut source) = ChannelSource::channel();
        assert!(handle.connect());
        assert_eq!(source.poll(Duration::ZERO), SourcePoll::Event(SensorEvent::Connected));
        assert_eq!(source.poll(Duration::from_millis(1)), SourcePoll::Idle);
        drop(handle);
        assert_eq!(source.poll(Duration::from_millis(1)), SourcePoll::Finished);
    }

    #[test]
    fn tracking_settings_are_shared() {
        let settings = TrackingSettings::default();
        let reader = settings.clone();
        settings.set(TrackingState { allow_images: true, ..TrackingState::default() });
        assert!(reader.get().allow_images);
    }
}
