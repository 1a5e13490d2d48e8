//! Media module for avatar clip playback
//!
//! Owns the fixed clip catalogue and the stage that keeps exactly one
//! clip visible. Host playback is abstracted behind [`MediaBackend`].

mod clips;
mod stage;
mod timed;

pub use clips::VideoKey;
pub use stage::{ClipStage, MediaBackend, PlaybackError};
pub use timed::TimedBackend;
