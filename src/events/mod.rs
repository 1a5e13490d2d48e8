//! Events module for conversation transitions
//!
//! Structured events emitted by the controller so the UI shell can follow
//! the conversation without touching controller state.

use serde::{Deserialize, Serialize};

use crate::media::VideoKey;
use crate::speech::SessionId;
use crate::state::ConversationState;

/// Events emitted by the controller while the conversation advances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// Conversation moved between states
    StateChanged {
        from: ConversationState,
        to: ConversationState,
    },

    /// A clip became the visible one
    ClipStarted { clip: VideoKey },

    /// The last utterance changed
    TranscriptUpdated { text: String },

    /// The transcript was reset on return to idle
    TranscriptCleared,

    /// A speech capture began
    CaptureStarted { session: SessionId },

    /// The live speech capture was stopped
    CaptureStopped,

    /// A stalled state was forced forward by the watchdog
    Recovered { state: ConversationState },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::StateChanged { from, to } => write!(f, "STATE_CHANGED ({} -> {})", from, to),
            StateEvent::ClipStarted { clip } => write!(f, "CLIP_STARTED ({})", clip),
            StateEvent::TranscriptUpdated { text } => write!(f, "TRANSCRIPT_UPDATED ({:?})", text),
            StateEvent::TranscriptCleared => write!(f, "TRANSCRIPT_CLEARED"),
            StateEvent::CaptureStarted { session } => write!(f, "CAPTURE_STARTED ({})", session),
            StateEvent::CaptureStopped => write!(f, "CAPTURE_STOPPED"),
            StateEvent::Recovered { state } => write!(f, "RECOVERED ({})", state),
        }
    }
}
