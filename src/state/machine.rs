//! Conversation controller
//!
//! Drives Idle → Greeting → Listening → Response/Goodbye from four inbound
//! event sources: the UI start request, speech reports, clip ends and the
//! stall watchdog. Every event is handled to completion before the next one
//! is received, so transitions never interleave.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::StateEvent;
use crate::intent::{classify_outcome, Intent};
use crate::media::{ClipStage, MediaBackend, VideoKey};
use crate::speech::{SpeechOutcome, SpeechReport, SpeechSession};

/// The five conversation states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Waiting for the user to start a conversation
    #[default]
    Idle,
    /// Avatar is saying hello
    Greeting,
    /// Speech capture is live
    Listening,
    /// Avatar is answering the last utterance
    Response,
    /// Avatar is saying goodbye
    Goodbye,
}

impl ConversationState {
    /// Clip shown on entering this state
    ///
    /// `Response` picks its clip per utterance and has no fixed entry clip.
    pub fn entry_clip(&self) -> Option<VideoKey> {
        match self {
            ConversationState::Idle => Some(VideoKey::Idle),
            ConversationState::Greeting => Some(VideoKey::Greeting),
            ConversationState::Listening => Some(VideoKey::Listening),
            ConversationState::Response => None,
            ConversationState::Goodbye => Some(VideoKey::Goodbye),
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationState::Idle => write!(f, "Idle"),
            ConversationState::Greeting => write!(f, "Greeting"),
            ConversationState::Listening => write!(f, "Listening"),
            ConversationState::Response => write!(f, "Response"),
            ConversationState::Goodbye => write!(f, "Goodbye"),
        }
    }
}

/// Inbound events the controller reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The user pressed start
    StartRequested,
    /// A capture engine reported back
    Speech(SpeechReport),
    /// A clip reached its end
    ClipEnded(VideoKey),
    /// The watchdog for the given state entry fired
    Stalled { epoch: u64 },
}

/// How long a state may wait for its exit event before being forced on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Limit for Listening
    pub listen: Option<Duration>,
    /// Limit for Greeting, Response and Goodbye
    pub clip: Option<Duration>,
}

/// Read-only view for renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub state: ConversationState,
    pub transcript: String,
    pub clip: Option<VideoKey>,
    pub listening: bool,
}

/// Owns the conversation and both leaves
pub struct ConversationController<B> {
    state: ConversationState,
    /// Last recognized utterance
    transcript: String,
    stage: ClipStage<B>,
    speech: SpeechSession,
    timeouts: Timeouts,
    /// Bumped on every state entry; tags watchdog timers
    epoch: u64,
    watchdog: Option<JoinHandle<()>>,
    state_entered_at: Instant,
    event_tx: broadcast::Sender<StateEvent>,
    /// Loopback for watchdog timers
    inbound_tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl<B: MediaBackend> ConversationController<B> {
    /// Create a controller in Idle
    pub fn new(
        stage: ClipStage<B>,
        speech: SpeechSession,
        timeouts: Timeouts,
        event_tx: broadcast::Sender<StateEvent>,
        inbound_tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            state: ConversationState::Idle,
            transcript: String::new(),
            stage,
            speech,
            timeouts,
            epoch: 0,
            watchdog: None,
            state_entered_at: Instant::now(),
            event_tx,
            inbound_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Last recognized utterance, empty when none
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Snapshot for the UI
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            state: self.state,
            transcript: self.transcript.clone(),
            clip: self.stage.target(),
            listening: self.state == ConversationState::Listening,
        }
    }

    /// Run the controller until the inbound channel closes
    pub async fn run(&mut self, mut inbound_rx: mpsc::UnboundedReceiver<ControllerEvent>) {
        info!("conversation controller started in Idle state");
        self.boot();

        while let Some(event) = inbound_rx.recv().await {
            self.handle(event);
        }

        info!("conversation controller stopped");
    }

    /// Show the Idle clip before the first event
    pub fn boot(&mut self) {
        if let Some(clip) = self.state.entry_clip() {
            self.play(clip);
        }
    }

    /// Stop any capture and pending watchdog
    pub fn shutdown(&mut self) {
        self.disarm_watchdog();
        self.stop_capture();
    }

    /// Handle one inbound event to completion
    pub fn handle(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::StartRequested => self.on_start(),
            ControllerEvent::Speech(report) => self.on_speech(report),
            ControllerEvent::ClipEnded(clip) => self.on_clip_end(clip),
            ControllerEvent::Stalled { epoch } => self.on_stalled(epoch),
        }
    }

    fn on_start(&mut self) {
        if self.state != ConversationState::Idle {
            warn!(state = %self.state, "start ignored outside Idle");
            return;
        }
        self.transition_to(ConversationState::Greeting);
    }

    fn on_speech(&mut self, report: SpeechReport) {
        if self.state != ConversationState::Listening {
            debug!(state = %self.state, session = %report.session, "speech report ignored");
            return;
        }

        if let Some(outcome) = self.speech.accept(report) {
            self.respond_to(outcome);
        }
    }

    fn on_clip_end(&mut self, clip: VideoKey) {
        if !self.stage.accept_end(clip) {
            return;
        }

        match self.state {
            ConversationState::Greeting | ConversationState::Response | ConversationState::Goodbye => {
                self.advance_after_clip();
            }
            ConversationState::Idle | ConversationState::Listening => {
                debug!(state = %self.state, %clip, "clip end ignored");
            }
        }
    }

    fn on_stalled(&mut self, epoch: u64) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "stale watchdog ignored");
            return;
        }

        let state = self.state;
        warn!(
            %state,
            waited_ms = self.state_entered_at.elapsed().as_millis() as u64,
            "state stalled, forcing it on"
        );
        self.emit(StateEvent::Recovered { state });

        match state {
            ConversationState::Listening => self.respond_to(SpeechOutcome::Failed),
            ConversationState::Greeting | ConversationState::Response | ConversationState::Goodbye => {
                self.advance_after_clip();
            }
            ConversationState::Idle => {}
        }
    }

    /// Act on an accepted capture outcome while Listening
    fn respond_to(&mut self, outcome: SpeechOutcome) {
        if let SpeechOutcome::Recognized(text) = &outcome {
            self.transcript = text.clone();
            self.emit(StateEvent::TranscriptUpdated { text: text.clone() });
        }

        match classify_outcome(&outcome) {
            Intent::Farewell => self.transition_to(ConversationState::Goodbye),
            Intent::Respond(clip) => {
                self.stop_capture();
                self.transition_to(ConversationState::Response);
                self.play(clip);
            }
        }
    }

    /// Leave a clip-waiting state once its clip is over
    fn advance_after_clip(&mut self) {
        match self.state {
            ConversationState::Greeting | ConversationState::Response => {
                self.transition_to(ConversationState::Listening);
            }
            ConversationState::Goodbye => {
                self.transcript.clear();
                self.emit(StateEvent::TranscriptCleared);
                self.transition_to(ConversationState::Idle);
            }
            ConversationState::Idle | ConversationState::Listening => {}
        }
    }

    /// Perform a state transition and its entry actions
    fn transition_to(&mut self, new_state: ConversationState) {
        let old_state = self.state;
        let duration_ms = self.state_entered_at.elapsed().as_millis() as u64;

        info!(
            from = %old_state,
            to = %new_state,
            duration_ms = duration_ms,
            "state transition"
        );

        self.state = new_state;
        self.state_entered_at = Instant::now();
        self.epoch += 1;
        self.emit(StateEvent::StateChanged {
            from: old_state,
            to: new_state,
        });

        if new_state == ConversationState::Listening {
            self.start_capture();
        }
        if let Some(clip) = new_state.entry_clip() {
            self.play(clip);
        }
        self.arm_watchdog();
    }

    fn play(&mut self, clip: VideoKey) {
        self.stage.play(clip);
        self.emit(StateEvent::ClipStarted { clip });
    }

    fn start_capture(&mut self) {
        if let Some(session) = self.speech.start() {
            self.emit(StateEvent::CaptureStarted { session });
        }
    }

    fn stop_capture(&mut self) {
        let live = self.speech.current().is_some();
        self.speech.stop();
        if live {
            self.emit(StateEvent::CaptureStopped);
        }
    }

    fn arm_watchdog(&mut self) {
        self.disarm_watchdog();

        let limit = match self.state {
            ConversationState::Idle => None,
            ConversationState::Listening => self.timeouts.listen,
            ConversationState::Greeting | ConversationState::Response | ConversationState::Goodbye => {
                self.timeouts.clip
            }
        };
        let Some(limit) = limit else {
            return;
        };

        let epoch = self.epoch;
        let inbound_tx = self.inbound_tx.clone();
        self.watchdog = Some(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            let _ = inbound_tx.send(ControllerEvent::Stalled { epoch });
        }));
    }

    fn disarm_watchdog(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }

    fn emit(&self, event: StateEvent) {
        debug!(%event, "emitting state event");
        let _ = self.event_tx.send(event);
    }
}
