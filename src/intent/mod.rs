//! Keyword intent rules
//!
//! Ordered, case-insensitive substring rules. The first matching rule wins.

use crate::media::VideoKey;
use crate::speech::SpeechOutcome;

/// Classification result for one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// The user is leaving; routes to the goodbye state
    Farewell,
    /// Answer with this clip
    Respond(VideoKey),
}

/// Rules after the farewell check, in priority order
const RESPONSE_RULES: &[(&[&str], VideoKey)] = &[
    (&["hello", "hi"], VideoKey::General),
    (&["weather", "today"], VideoKey::Weather),
    (&["task", "easter egg"], VideoKey::EasterEgg),
];

const FAREWELL_KEYWORDS: &[&str] = &["bye", "goodbye"];

/// Classify recognized text
pub fn classify(text: &str) -> Intent {
    let text = text.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|kw| text.contains(*kw));

    if contains_any(FAREWELL_KEYWORDS) {
        return Intent::Farewell;
    }

    RESPONSE_RULES
        .iter()
        .find(|(keywords, _)| contains_any(*keywords))
        .map(|(_, clip)| Intent::Respond(*clip))
        .unwrap_or(Intent::Respond(VideoKey::General))
}

/// Classify a capture outcome; failures skip the keyword rules
pub fn classify_outcome(outcome: &SpeechOutcome) -> Intent {
    match outcome {
        SpeechOutcome::Recognized(text) => classify(text),
        SpeechOutcome::Failed => Intent::Respond(VideoKey::Fallback),
    }
}
