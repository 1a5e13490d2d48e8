//! Line-based capture engine
//!
//! Stands in for a microphone on headless hosts: every line read from the
//! input is one utterance with a single hypothesis. An empty line reports
//! an engine error. Runs on a dedicated thread, like a platform engine.

use std::io::BufRead;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

use super::session::{CaptureConfig, CaptureHandle, Recognition, SessionId, SpeechEngine, SpeechError, SpeechSink};

/// Sink of the capture waiting for input
type PendingSlot = Arc<Mutex<Option<SpeechSink>>>;

/// Speech engine fed by typed lines on stdin
pub struct LineEngine {
    pending: PendingSlot,
}

impl LineEngine {
    /// Spawn the stdin reader thread
    pub fn spawn() -> Result<Self, SpeechError> {
        let pending: PendingSlot = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&pending);

        thread::Builder::new()
            .name("speech-input".to_string())
            .spawn(move || {
                info!("speech input thread started");
                read_utterances(std::io::stdin().lock(), &slot);
                info!("speech input closed");
            })
            .map_err(|e| SpeechError::Start(e.to_string()))?;

        Ok(Self { pending })
    }
}

impl SpeechEngine for LineEngine {
    fn begin(
        &mut self,
        config: &CaptureConfig,
        sink: SpeechSink,
    ) -> Result<Box<dyn CaptureHandle>, SpeechError> {
        let session = sink.session();
        debug!(
            %session,
            language = %config.language,
            continuous = config.continuous,
            "waiting for typed utterance"
        );

        if lock(&self.pending).replace(sink).is_some() {
            debug!("replaced unanswered capture");
        }

        Ok(Box::new(LineCapture {
            session,
            pending: Arc::clone(&self.pending),
        }))
    }
}

struct LineCapture {
    session: SessionId,
    pending: PendingSlot,
}

impl LineCapture {
    /// Drop our sink if it is still the one waiting
    fn detach(&self) {
        let mut slot = lock(&self.pending);
        if slot.as_ref().map(SpeechSink::session) == Some(self.session) {
            *slot = None;
        }
    }
}

impl CaptureHandle for LineCapture {
    fn stop(&mut self) {
        self.detach();
    }

    fn abort(&mut self) {
        self.detach();
    }
}

/// Deliver each line to whichever capture is waiting
fn read_utterances<R: BufRead>(reader: R, slot: &Mutex<Option<SpeechSink>>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(?e, "failed to read speech input");
                break;
            }
        };

        let Some(sink) = lock(slot).take() else {
            debug!("no capture live, discarding input");
            continue;
        };

        let text = line.trim();
        let recognition = if text.is_empty() {
            Recognition::Error("no-speech".to_string())
        } else {
            Recognition::Results(vec![vec![text.to_string()]])
        };
        sink.deliver(recognition);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::sync::mpsc;

    use super::*;
    use crate::state::ControllerEvent;

    fn next_recognition(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Recognition {
        match rx.try_recv().unwrap() {
            ControllerEvent::Speech(report) => report.recognition,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_line_delivered_to_waiting_capture() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slot = Mutex::new(Some(SpeechSink::new(SessionId(1), tx)));

        read_utterances(Cursor::new("Hello There\n"), &slot);

        assert_eq!(
            next_recognition(&mut rx),
            Recognition::Results(vec![vec!["Hello There".to_string()]])
        );
    }

    #[test]
    fn test_empty_line_is_engine_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slot = Mutex::new(Some(SpeechSink::new(SessionId(1), tx)));

        read_utterances(Cursor::new("   \n"), &slot);

        assert!(matches!(next_recognition(&mut rx), Recognition::Error(_)));
    }

    #[test]
    fn test_input_without_capture_discarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slot = Mutex::new(Some(SpeechSink::new(SessionId(1), tx)));

        read_utterances(Cursor::new("first\nsecond\n"), &slot);

        assert!(matches!(next_recognition(&mut rx), Recognition::Results(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stopped_capture_detached() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = LineEngine {
            pending: Arc::new(Mutex::new(None)),
        };
        let pending = Arc::clone(&engine.pending);

        let mut handle = engine
            .begin(&CaptureConfig::default(), SpeechSink::new(SessionId(7), tx))
            .unwrap();
        assert!(lock(&pending).is_some());

        handle.stop();
        assert!(lock(&pending).is_none());
    }

    #[test]
    fn test_superseded_handle_leaves_new_capture_alone() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = LineEngine {
            pending: Arc::new(Mutex::new(None)),
        };
        let pending = Arc::clone(&engine.pending);

        let mut old = engine
            .begin(&CaptureConfig::default(), SpeechSink::new(SessionId(1), tx.clone()))
            .unwrap();
        let _new = engine
            .begin(&CaptureConfig::default(), SpeechSink::new(SessionId(2), tx))
            .unwrap();

        old.abort();
        assert_eq!(lock(&pending).as_ref().map(SpeechSink::session), Some(SessionId(2)));
    }
}
