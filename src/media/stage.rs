//! Clip stage: one visible clip at a time
//!
//! The stage sits between the controller and a host [`MediaBackend`].
//! Every `play` hides, pauses and rewinds all clips before showing the
//! requested one, so at most one clip is ever visible and playing.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::clips::VideoKey;

/// Errors a host backend may report when starting a clip
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("clip source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("host rejected playback: {0}")]
    Rejected(String),
}

/// Host media primitives, one element per [`VideoKey`]
///
/// Backends report one-shot clip completion out of band (as a
/// `ClipEnded` controller event). A paused clip must not report an end.
pub trait MediaBackend: Send {
    /// Pause the clip without resetting its position
    fn pause(&mut self, key: VideoKey);

    /// Seek the clip back to position zero
    fn rewind(&mut self, key: VideoKey);

    /// Show or hide the clip
    fn set_visible(&mut self, key: VideoKey, visible: bool);

    /// Start the clip from its current position
    fn play(&mut self, key: VideoKey) -> Result<(), PlaybackError>;
}

/// Owns the playback target and enforces the single-visible-clip invariant
pub struct ClipStage<B> {
    backend: B,
    /// Clip currently shown, if any
    target: Option<VideoKey>,
    /// Whether the target already reported its end
    finished: bool,
}

impl<B: MediaBackend> ClipStage<B> {
    /// Create a stage with nothing shown
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            target: None,
            finished: false,
        }
    }

    /// Clip currently shown
    pub fn target(&self) -> Option<VideoKey> {
        self.target
    }

    /// Swap the visible clip to `key`, preempting whatever was playing
    ///
    /// Start failures are logged and swallowed; no end event is produced
    /// for a clip that never started.
    pub fn play(&mut self, key: VideoKey) {
        for clip in VideoKey::ALL {
            self.backend.pause(clip);
            self.backend.rewind(clip);
            self.backend.set_visible(clip, false);
        }

        if let Some(previous) = self.target.filter(|prev| *prev != key && !self.finished) {
            debug!(%previous, next = %key, "preempting clip");
        }

        self.target = Some(key);
        self.finished = false;
        self.backend.set_visible(key, true);

        match self.backend.play(key) {
            Ok(()) => info!(clip = %key, looping = key.is_looping(), "clip started"),
            Err(e) => warn!(clip = %key, error = %e, "clip failed to start"),
        }
    }

    /// Filter a raw end report from the backend
    ///
    /// Returns `true` only for the first end of the current one-shot target.
    /// Ends from looping clips, preempted clips and repeats are dropped.
    pub fn accept_end(&mut self, key: VideoKey) -> bool {
        if key.is_looping() {
            debug!(clip = %key, "ignoring end of looping clip");
            return false;
        }

        if self.target != Some(key) || self.finished {
            debug!(clip = %key, target = ?self.target, "ignoring stale clip end");
            return false;
        }

        self.finished = true;
        true
    }
}
