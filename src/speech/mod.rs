//! Speech module for single-utterance capture
//!
//! Wraps a host speech-to-text engine so that only one capture is live at
//! a time and late reports from superseded captures are discarded.

mod line;
mod session;

pub use line::LineEngine;
pub use session::{
    CaptureConfig, CaptureHandle, Recognition, SessionId, SpeechEngine, SpeechError,
    SpeechOutcome, SpeechReport, SpeechSession, SpeechSink,
};
