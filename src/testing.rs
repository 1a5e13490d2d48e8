//! Test doubles for the host media and speech seams

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::media::{MediaBackend, PlaybackError, VideoKey};
use crate::speech::{
    CaptureConfig, CaptureHandle, Recognition, SessionId, SpeechEngine, SpeechError, SpeechSink,
};

/// What a [`RecordingBackend`] has been told to do
#[derive(Debug, Default)]
pub struct BackendLog {
    visible: BTreeSet<VideoKey>,
    playing: BTreeSet<VideoKey>,
    rejected: BTreeSet<VideoKey>,
    rewound: Vec<VideoKey>,
    started: Vec<VideoKey>,
}

impl BackendLog {
    /// Clips currently shown
    pub fn visible(&self) -> Vec<VideoKey> {
        self.visible.iter().copied().collect()
    }

    /// Clips currently playing
    pub fn playing(&self) -> Vec<VideoKey> {
        self.playing.iter().copied().collect()
    }

    /// Every successful start, in order
    pub fn started(&self) -> &[VideoKey] {
        &self.started
    }

    pub fn was_rewound(&self, key: VideoKey) -> bool {
        self.rewound.contains(&key)
    }

    /// Make every later start of `key` fail
    pub fn reject(&mut self, key: VideoKey) {
        self.rejected.insert(key);
    }
}

/// Media backend that only records calls
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<BackendLog>>,
}

impl RecordingBackend {
    pub fn log(&self) -> Arc<Mutex<BackendLog>> {
        Arc::clone(&self.log)
    }
}

impl MediaBackend for RecordingBackend {
    fn pause(&mut self, key: VideoKey) {
        self.log.lock().unwrap().playing.remove(&key);
    }

    fn rewind(&mut self, key: VideoKey) {
        self.log.lock().unwrap().rewound.push(key);
    }

    fn set_visible(&mut self, key: VideoKey, visible: bool) {
        let mut log = self.log.lock().unwrap();
        if visible {
            log.visible.insert(key);
        } else {
            log.visible.remove(&key);
        }
    }

    fn play(&mut self, key: VideoKey) -> Result<(), PlaybackError> {
        let mut log = self.log.lock().unwrap();
        if log.rejected.contains(&key) {
            return Err(PlaybackError::Rejected("autoplay blocked".to_string()));
        }
        log.playing.insert(key);
        log.started.push(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct EngineLog {
    configs: Vec<CaptureConfig>,
    begun: Vec<SessionId>,
    aborted: Vec<SessionId>,
    stopped: Vec<SessionId>,
    answered: Vec<SessionId>,
    /// Sinks of captures that have not reported yet
    sinks: Vec<SpeechSink>,
}

/// Speech engine answered by the test
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl ScriptedEngine {
    pub fn last_config(&self) -> Option<CaptureConfig> {
        self.log.lock().unwrap().configs.last().cloned()
    }

    pub fn aborted(&self) -> Vec<SessionId> {
        self.log.lock().unwrap().aborted.clone()
    }

    pub fn stopped(&self) -> Vec<SessionId> {
        self.log.lock().unwrap().stopped.clone()
    }

    /// Sessions begun and not yet aborted, stopped or answered
    pub fn live(&self) -> Vec<SessionId> {
        let log = self.log.lock().unwrap();
        log.begun
            .iter()
            .copied()
            .filter(|id| {
                !log.aborted.contains(id) && !log.stopped.contains(id) && !log.answered.contains(id)
            })
            .collect()
    }

    /// Answer the most recent capture with a single hypothesis
    pub fn respond(&self, text: &str) {
        self.deliver(Recognition::Results(vec![vec![text.to_string()]]));
    }

    /// Fail the most recent capture
    pub fn fail(&self, cause: &str) {
        self.deliver(Recognition::Error(cause.to_string()));
    }

    fn deliver(&self, recognition: Recognition) {
        let sink = {
            let mut log = self.log.lock().unwrap();
            let sink = log.sinks.pop().expect("no capture to answer");
            log.answered.push(sink.session());
            sink
        };
        sink.deliver(recognition);
    }
}

impl SpeechEngine for ScriptedEngine {
    fn begin(
        &mut self,
        config: &CaptureConfig,
        sink: SpeechSink,
    ) -> Result<Box<dyn CaptureHandle>, SpeechError> {
        let id = sink.session();
        let mut log = self.log.lock().unwrap();
        log.configs.push(config.clone());
        log.begun.push(id);
        log.sinks.push(sink);
        Ok(Box::new(ScriptedCapture {
            id,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedCapture {
    id: SessionId,
    log: Arc<Mutex<EngineLog>>,
}

impl CaptureHandle for ScriptedCapture {
    fn stop(&mut self) {
        self.log.lock().unwrap().stopped.push(self.id);
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().aborted.push(self.id);
    }
}
