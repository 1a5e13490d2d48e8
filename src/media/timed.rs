//! Timer-driven media backend for headless hosts
//!
//! Clips are not decoded. A one-shot clip "plays" for a fixed length and
//! then reports its end to the controller. Pausing cancels the timer, so a
//! preempted clip never reports an end.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::clips::VideoKey;
use super::stage::{MediaBackend, PlaybackError};
use crate::state::ControllerEvent;

/// Media backend that simulates playback with tokio timers
pub struct TimedBackend {
    video_dir: PathBuf,
    clip_length: Duration,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    /// Running end timers, keyed by clip
    timers: HashMap<VideoKey, JoinHandle<()>>,
}

impl TimedBackend {
    /// Create a backend reading clips from `video_dir`
    ///
    /// Must be driven from inside a tokio runtime.
    pub fn new(
        video_dir: PathBuf,
        clip_length: Duration,
        event_tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            video_dir,
            clip_length,
            event_tx,
            timers: HashMap::new(),
        }
    }
}

impl MediaBackend for TimedBackend {
    fn pause(&mut self, key: VideoKey) {
        if let Some(timer) = self.timers.remove(&key) {
            timer.abort();
            debug!(clip = %key, "clip paused");
        }
    }

    fn rewind(&mut self, key: VideoKey) {
        trace!(clip = %key, "clip rewound");
    }

    fn set_visible(&mut self, key: VideoKey, visible: bool) {
        trace!(clip = %key, visible, "clip visibility");
    }

    fn play(&mut self, key: VideoKey) -> Result<(), PlaybackError> {
        let source = key.source_in(&self.video_dir);
        if !source.is_file() {
            return Err(PlaybackError::SourceMissing(source));
        }

        if key.is_looping() {
            return Ok(());
        }

        let event_tx = self.event_tx.clone();
        let length = self.clip_length;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(length).await;
            if event_tx.send(ControllerEvent::ClipEnded(key)).is_err() {
                warn!(clip = %key, "controller gone, dropping clip end");
            }
        });

        if let Some(previous) = self.timers.insert(key, timer) {
            previous.abort();
        }

        Ok(())
    }
}

impl Drop for TimedBackend {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}
