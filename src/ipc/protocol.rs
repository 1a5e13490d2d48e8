//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::StateEvent;
use crate::media::VideoKey;
use crate::state::ConversationState;

/// Requests from the UI shell to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request the current conversation status
    GetStatus,

    /// The user pressed start
    Start,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to state change notifications
    Subscribe,
}

/// Responses from the daemon to the UI shell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current conversation status
    Status(ChatStatus),

    /// Start request forwarded to the controller
    Started,

    /// Start request refused
    Rejected { reason: String },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification to subscribed clients
///
/// Adjacently tagged so the wrapped event keeps its own `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "event", rename_all = "snake_case")]
pub enum Notification {
    /// State event occurred
    StateEvent(StateEvent),
}

/// What the UI shell renders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStatus {
    /// Daemon version
    pub version: String,

    /// Current conversation state
    pub state: ConversationState,

    /// Last utterance; only shown when non-empty
    pub transcript: String,

    /// Drives the "Listening..." indicator
    pub listening: bool,

    /// Clip currently shown
    pub clip: Option<VideoKey>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for ChatStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: ConversationState::default(),
            transcript: String::new(),
            listening: false,
            clip: None,
            uptime_secs: 0,
        }
    }
}

impl ChatStatus {
    /// Fold one controller event into the status view
    pub fn apply(&mut self, event: &StateEvent) {
        match event {
            StateEvent::StateChanged { to, .. } => {
                self.state = *to;
                self.listening = *to == ConversationState::Listening;
            }
            StateEvent::ClipStarted { clip } => self.clip = Some(*clip),
            StateEvent::TranscriptUpdated { text } => self.transcript = text.clone(),
            StateEvent::TranscriptCleared => self.transcript.clear(),
            StateEvent::CaptureStarted { .. }
            | StateEvent::CaptureStopped
            | StateEvent::Recovered { .. } => {}
        }
    }
}
