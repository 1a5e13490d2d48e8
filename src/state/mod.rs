//! State machine module for the conversation loop
//!
//! Provides the conversation controller with five states:
//! - Idle: waiting for the user to press start
//! - Greeting: greeting clip playing
//! - Listening: speech capture live, listening clip looping
//! - Response: answer clip playing
//! - Goodbye: goodbye clip playing, then back to Idle

mod machine;

pub use machine::{
    ControllerEvent, ConversationController, ConversationSnapshot, ConversationState, Timeouts,
};
