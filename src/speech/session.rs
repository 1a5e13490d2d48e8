//! Speech capture sessions
//!
//! [`SpeechSession`] wraps one host [`SpeechEngine`] and keeps at most one
//! capture alive. Every capture gets a fresh [`SessionId`]; engines report
//! back through a [`SpeechSink`] tagged with that id, and the session only
//! accepts reports from the capture it currently holds.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::ControllerEvent;

/// Identity of one capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub(crate) u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capture settings handed to the engine on every start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// BCP 47 recognition locale
    pub language: String,
    /// Deliver partial hypotheses while the user speaks
    pub interim_results: bool,
    /// Keep capturing after the first utterance
    pub continuous: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            interim_results: false,
            continuous: false,
        }
    }
}

/// Raw engine output for one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Results in arrival order, each holding alternatives best-first
    Results(Vec<Vec<String>>),
    /// Engine-specific error description
    Error(String),
}

/// A recognition tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechReport {
    pub session: SessionId,
    pub recognition: Recognition,
}

/// What the controller sees once a report is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Lower-cased best hypothesis of the first result
    Recognized(String),
    /// The capture failed; the cause is not surfaced
    Failed,
}

/// Errors raised while starting a capture
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech recognition not supported on this host")]
    Unsupported,

    #[error("failed to start capture: {0}")]
    Start(String),
}

/// Return channel for a single capture
///
/// Delivering consumes the sink, so an engine can report at most once
/// per session.
#[derive(Debug)]
pub struct SpeechSink {
    session: SessionId,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl SpeechSink {
    pub(crate) fn new(session: SessionId, event_tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { session, event_tx }
    }

    /// Session this sink reports for
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Post the capture's only report to the controller
    pub fn deliver(self, recognition: Recognition) {
        let report = SpeechReport {
            session: self.session,
            recognition,
        };
        if self.event_tx.send(ControllerEvent::Speech(report)).is_err() {
            warn!(session = %self.session, "controller gone, dropping speech report");
        }
    }
}

/// Host speech-to-text capability
pub trait SpeechEngine: Send {
    /// Begin one capture that reports through `sink`
    fn begin(
        &mut self,
        config: &CaptureConfig,
        sink: SpeechSink,
    ) -> Result<Box<dyn CaptureHandle>, SpeechError>;
}

/// Control over a running capture
pub trait CaptureHandle: Send {
    /// Finish gracefully; a late report may still arrive
    fn stop(&mut self);

    /// Tear down immediately
    fn abort(&mut self);
}

struct ActiveCapture {
    id: SessionId,
    handle: Box<dyn CaptureHandle>,
}

/// Single-capture wrapper around a host engine
pub struct SpeechSession {
    /// `None` when the host has no speech capability
    engine: Option<Box<dyn SpeechEngine>>,
    config: CaptureConfig,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    last_id: u64,
    active: Option<ActiveCapture>,
}

impl SpeechSession {
    /// Create a session manager with no capture running
    pub fn new(
        engine: Option<Box<dyn SpeechEngine>>,
        config: CaptureConfig,
        event_tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            engine,
            config,
            event_tx,
            last_id: 0,
            active: None,
        }
    }

    /// Session whose reports are currently accepted
    pub fn current(&self) -> Option<SessionId> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Start a new capture, superseding any live one
    ///
    /// Returns `None` when no capture could be started. Nothing will ever be
    /// reported in that case.
    pub fn start(&mut self) -> Option<SessionId> {
        let Some(engine) = self.engine.as_mut() else {
            warn!("speech recognition not supported on this host");
            return None;
        };

        if let Some(mut previous) = self.active.take() {
            debug!(session = %previous.id, "superseding live capture");
            previous.handle.abort();
        }

        self.last_id += 1;
        let id = SessionId(self.last_id);
        let sink = SpeechSink::new(id, self.event_tx.clone());

        match engine.begin(&self.config, sink) {
            Ok(handle) => {
                info!(session = %id, language = %self.config.language, "capture started");
                self.active = Some(ActiveCapture { id, handle });
                Some(id)
            }
            Err(e) => {
                warn!(session = %id, error = %e, "capture failed to start");
                None
            }
        }
    }

    /// Stop the live capture, if any
    pub fn stop(&mut self) {
        match self.active.take() {
            Some(mut active) => {
                active.handle.stop();
                info!(session = %active.id, "capture stopped");
            }
            None => debug!("stop requested with no live capture"),
        }
    }

    /// Validate a report against the live capture
    ///
    /// Reports from superseded or stopped sessions yield `None`. An accepted
    /// report ends the session.
    pub fn accept(&mut self, report: SpeechReport) -> Option<SpeechOutcome> {
        match &self.active {
            Some(active) if active.id == report.session => {}
            _ => {
                debug!(
                    session = %report.session,
                    current = ?self.current(),
                    "dropping stale speech report"
                );
                return None;
            }
        }

        self.active = None;
        Some(outcome_of(report.recognition))
    }
}

fn outcome_of(recognition: Recognition) -> SpeechOutcome {
    match recognition {
        Recognition::Results(results) => {
            match results.into_iter().next().and_then(|alts| alts.into_iter().next()) {
                Some(best) => SpeechOutcome::Recognized(best.to_lowercase()),
                None => {
                    warn!("recognition carried no hypothesis");
                    SpeechOutcome::Failed
                }
            }
        }
        Recognition::Error(cause) => {
            debug!(%cause, "capture reported an error");
            SpeechOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;

    fn session_with_engine() -> (
        SpeechSession,
        ScriptedEngine,
        mpsc::UnboundedReceiver<ControllerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = ScriptedEngine::default();
        let session = SpeechSession::new(
            Some(Box::new(engine.clone())),
            CaptureConfig::default(),
            tx,
        );
        (session, engine, rx)
    }

    fn report(session: SessionId, text: &str) -> SpeechReport {
        SpeechReport {
            session,
            recognition: Recognition::Results(vec![vec![text.to_string()]]),
        }
    }

    #[test]
    fn test_start_without_engine_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = SpeechSession::new(None, CaptureConfig::default(), tx);

        assert_eq!(session.start(), None);
        assert_eq!(session.current(), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_uses_fixed_capture_config() {
        let (mut session, engine, _rx) = session_with_engine();
        session.start();

        let config = engine.last_config().unwrap();
        assert_eq!(config.language, "en-US");
        assert!(!config.interim_results);
        assert!(!config.continuous);
    }

    #[test]
    fn test_restart_supersedes_previous_capture() {
        let (mut session, engine, _rx) = session_with_engine();

        let first = session.start().unwrap();
        let second = session.start().unwrap();

        assert_ne!(first, second);
        assert_eq!(session.current(), Some(second));
        assert_eq!(engine.aborted(), vec![first]);
        assert_eq!(engine.live(), vec![second]);
    }

    #[test]
    fn test_only_latest_session_accepted() {
        let (mut session, _engine, _rx) = session_with_engine();

        let first = session.start().unwrap();
        let second = session.start().unwrap();

        assert_eq!(session.accept(report(first, "late")), None);
        assert_eq!(
            session.accept(report(second, "Hello")),
            Some(SpeechOutcome::Recognized("hello".to_string()))
        );
    }

    #[test]
    fn test_report_after_stop_ignored() {
        let (mut session, engine, _rx) = session_with_engine();

        let id = session.start().unwrap();
        session.stop();

        assert_eq!(engine.stopped(), vec![id]);
        assert_eq!(session.accept(report(id, "too late")), None);
    }

    #[test]
    fn test_stop_without_session_is_noop() {
        let (mut session, engine, _rx) = session_with_engine();

        session.stop();
        session.stop();

        assert_eq!(session.current(), None);
        assert!(engine.stopped().is_empty());
    }

    #[test]
    fn test_accepted_report_ends_session() {
        let (mut session, _engine, _rx) = session_with_engine();

        let id = session.start().unwrap();
        assert!(session.accept(report(id, "hi")).is_some());
        assert_eq!(session.current(), None);
        assert_eq!(session.accept(report(id, "hi again")), None);
    }

    #[test]
    fn test_only_first_result_best_hypothesis_used() {
        let (mut session, _engine, _rx) = session_with_engine();

        let id = session.start().unwrap();
        let outcome = session.accept(SpeechReport {
            session: id,
            recognition: Recognition::Results(vec![
                vec!["What's The WEATHER".to_string(), "watts the weather".to_string()],
                vec!["goodbye".to_string()],
            ]),
        });

        assert_eq!(
            outcome,
            Some(SpeechOutcome::Recognized("what's the weather".to_string()))
        );
    }

    #[test]
    fn test_engine_error_becomes_failure() {
        let (mut session, _engine, _rx) = session_with_engine();

        let id = session.start().unwrap();
        let outcome = session.accept(SpeechReport {
            session: id,
            recognition: Recognition::Error("network".to_string()),
        });

        assert_eq!(outcome, Some(SpeechOutcome::Failed));
    }

    #[test]
    fn test_empty_recognition_becomes_failure() {
        let (mut session, _engine, _rx) = session_with_engine();

        let id = session.start().unwrap();
        let outcome = session.accept(SpeechReport {
            session: id,
            recognition: Recognition::Results(vec![]),
        });

        assert_eq!(outcome, Some(SpeechOutcome::Failed));
    }

    #[test]
    fn test_sink_posts_tagged_report() {
        let (mut session, engine, mut rx) = session_with_engine();

        let id = session.start().unwrap();
        engine.respond("Hello");

        match rx.try_recv().unwrap() {
            ControllerEvent::Speech(report) => assert_eq!(report.session, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
