//! Core voice controller implementation
//!
//! Owns the capture and playback sessions, the silence and backoff timers,
//! and the delivery chain for each committed utterance. All inputs go
//! through `handle`; nothing else mutates controller state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapters::{AudioPayload, CaptureAdapter, DeliveryClient, DeliveryReply, PlaybackAdapter};
use crate::config::ControllerConfig;
use crate::error::{DeliveryError, VoiceError};
use crate::events::{NoticeKind, StatusLabel, VoiceEvent};
use crate::monitor::{NetworkState, PermissionState};

use super::conversation::{Conversation, Role};
use super::debounce::Debouncer;
use super::input::ControllerInput;
use super::retry::RetryPolicy;
use super::state::{Generation, State};
use super::timers::{TimerKind, Timers};

const INPUT_CHANNEL_CAPACITY: usize = 64;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// External collaborators driven by the controller
pub struct Collaborators {
    pub capture: Box<dyn CaptureAdapter>,
    pub playback: Box<dyn PlaybackAdapter>,
    pub delivery: Arc<dyn DeliveryClient>,
}

/// Where a delivered message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Committed from speech; a reply without audio is retried
    Mic,
    /// Typed into the chat box; a text-only reply is final
    Typed,
}

/// Live speech capture
#[derive(Debug, Default)]
struct CaptureSession {
    /// Latest final result, replaced by each newer final
    transcript: String,
    interim: String,
    silence_deadline: Option<Instant>,
    /// The engine stopped on its own while a commit was pending
    engine_ended: bool,
}

#[derive(Debug)]
struct PlaybackSession {
    resume_capture_on_end: bool,
}

/// One committed utterance and its retry chain
#[derive(Debug)]
struct DeliveryAttempt {
    id: u64,
    text: String,
    /// Retries performed so far, 0 on the first send
    attempt: u32,
    origin: Origin,
    resume_capture_after: bool,
    reply_turn: Option<u64>,
    in_flight: bool,
}

/// Serializable view of the controller for status queries
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub state: State,
    pub status: StatusLabel,
    pub transcript: String,
    /// Partial result currently being spoken
    pub interim: String,
    /// Time left before the buffered final result is committed
    pub commit_in_ms: Option<u64>,
    pub generation: Generation,
    pub turns: usize,
    pub armed_timers: usize,
    pub last_notice: Option<String>,
}

/// The voice interaction controller
pub struct VoiceController {
    config: ControllerConfig,
    state: State,
    state_entered_at: Instant,
    generation: Generation,

    capture: Box<dyn CaptureAdapter>,
    playback: Box<dyn PlaybackAdapter>,
    delivery: Arc<dyn DeliveryClient>,

    network: watch::Receiver<NetworkState>,
    permission: watch::Receiver<PermissionState>,

    session: Option<CaptureSession>,
    playback_session: Option<PlaybackSession>,
    pending: Option<DeliveryAttempt>,
    /// Delivery whose chain was cut by a stop while its request was in flight
    detached_delivery: Option<u64>,
    next_delivery_id: u64,
    last_committed_text: String,

    debounce: Debouncer,
    retry: RetryPolicy,
    timers: Timers,

    conversation: Conversation,
    transcript_display: String,
    last_notice: Option<String>,

    input_tx: mpsc::Sender<ControllerInput>,
    input_rx: Option<mpsc::Receiver<ControllerInput>>,
    event_tx: broadcast::Sender<VoiceEvent>,
}

impl VoiceController {
    /// Create a controller in `Idle`
    pub fn new(
        config: ControllerConfig,
        collaborators: Collaborators,
        network: watch::Receiver<NetworkState>,
        permission: watch::Receiver<PermissionState>,
        event_tx: broadcast::Sender<VoiceEvent>,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let retry = RetryPolicy::linear(config.max_retries, config.retry_base_delay);

        Self {
            debounce: Debouncer::new(config.debounce_window),
            retry,
            timers: Timers::new(input_tx.clone()),
            config,
            state: State::Idle,
            state_entered_at: Instant::now(),
            generation: Generation::default(),
            capture: collaborators.capture,
            playback: collaborators.playback,
            delivery: collaborators.delivery,
            network,
            permission,
            session: None,
            playback_session: None,
            pending: None,
            detached_delivery: None,
            next_delivery_id: 0,
            last_committed_text: String::new(),
            conversation: Conversation::new(),
            transcript_display: String::new(),
            last_notice: None,
            input_tx,
            input_rx: Some(input_rx),
            event_tx,
        }
    }

    /// Replace the delivery retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sender for posting inputs from adapters and the IPC layer
    pub fn sender(&self) -> mpsc::Sender<ControllerInput> {
        self.input_tx.clone()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playback_session.is_some()
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.armed_count()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let now = Instant::now();
        let session = self.session.as_ref();

        ControllerSnapshot {
            state: self.state,
            status: StatusLabel::for_state(self.state),
            transcript: self.transcript_display.clone(),
            interim: session.map(|s| s.interim.clone()).unwrap_or_default(),
            commit_in_ms: session
                .and_then(|s| s.silence_deadline)
                .map(|deadline| millis(deadline.saturating_duration_since(now))),
            generation: self.generation,
            turns: self.conversation.len(),
            armed_timers: self.timers.armed_count(),
            last_notice: self.last_notice.clone(),
        }
    }

    /// Run the controller, processing inputs and monitor changes
    pub async fn run(&mut self) {
        let Some(mut input_rx) = self.input_rx.take() else {
            warn!("voice controller is already running");
            return;
        };
        let mut network = self.network.clone();
        let mut permission = self.permission.clone();

        info!("voice controller started in Idle state");

        loop {
            tokio::select! {
                input = input_rx.recv() => match input {
                    Some(input) => self.handle(input),
                    None => break,
                },
                Ok(()) = network.changed() => {
                    let state = *network.borrow_and_update();
                    self.handle(ControllerInput::NetworkChanged(state));
                }
                Ok(()) = permission.changed() => {
                    let state = *permission.borrow_and_update();
                    self.handle(ControllerInput::PermissionChanged(state));
                }
            }
        }

        self.input_rx = Some(input_rx);
        info!("voice controller stopped");
    }

    /// Single dispatch entry point
    pub fn handle(&mut self, input: ControllerInput) {
        debug!(input = input.name(), state = %self.state, "controller input");

        match input {
            ControllerInput::Toggle => self.toggle(),
            ControllerInput::Start => self.start(),
            ControllerInput::Stop => self.stop(),
            ControllerInput::SendText(text) => self.send_text(text),

            ControllerInput::CapturePartial { generation, text } => {
                if self.is_current(generation, "capture_partial") {
                    self.on_partial(text);
                }
            }
            ControllerInput::CaptureFinal { generation, text } => {
                if self.is_current(generation, "capture_final") {
                    self.on_final(text);
                }
            }
            ControllerInput::CaptureEnded { generation } => {
                if self.is_current(generation, "capture_ended") {
                    self.on_capture_ended();
                }
            }
            ControllerInput::CaptureFailed { generation, reason } => {
                if self.is_current(generation, "capture_failed") {
                    self.on_capture_failed(&reason);
                }
            }

            ControllerInput::PlaybackStarted { generation } => {
                if self.is_current(generation, "playback_started") {
                    debug!("reply audio started");
                }
            }
            ControllerInput::PlaybackEnded { generation } => {
                if self.is_current(generation, "playback_ended") {
                    self.on_playback_finished(None);
                }
            }
            ControllerInput::PlaybackFailed { generation, reason } => {
                if self.is_current(generation, "playback_failed") {
                    self.on_playback_finished(Some(reason));
                }
            }

            ControllerInput::SilenceElapsed { generation, seq } => {
                if self.is_current(generation, "silence_elapsed") && self.timers.fire(TimerKind::Silence, seq) {
                    self.on_silence();
                }
            }
            ControllerInput::RetryDue { generation, seq } => {
                if self.is_current(generation, "retry_due") && self.timers.fire(TimerKind::Retry, seq) {
                    self.on_retry_due();
                }
            }
            ControllerInput::SettleElapsed { generation, seq } => {
                if self.is_current(generation, "settle_elapsed") && self.timers.fire(TimerKind::Settle, seq) {
                    self.on_settled();
                }
            }

            ControllerInput::DeliveryCompleted {
                generation,
                delivery_id,
                result,
            } => self.on_delivery(generation, delivery_id, result),

            ControllerInput::NetworkChanged(state) => self.on_network(state),
            ControllerInput::PermissionChanged(state) => self.on_permission(state),
        }
    }

    /// Explicit stop. Idempotent; cancels every timer and invalidates
    /// in-flight callbacks.
    pub fn stop(&mut self) {
        self.halt();
        self.debounce.reset();
    }

    fn is_current(&self, generation: Generation, source: &'static str) -> bool {
        if generation == self.generation {
            return true;
        }
        debug!(
            source,
            stale = %generation,
            current = %self.generation,
            "discarding stale callback"
        );
        false
    }

    // --- user requests ---

    fn toggle(&mut self) {
        if !self.debounce.try_accept(Instant::now()) {
            debug!("toggle dropped inside debounce window");
            return;
        }

        match self.state {
            State::Idle | State::Error => self.start(),
            _ => self.halt(),
        }
    }

    fn start(&mut self) {
        match self.state {
            State::Listening | State::PendingCommit => {
                debug!("capture already active");
            }
            State::Delivering => {
                if let Some(attempt) = self.pending.as_mut() {
                    attempt.resume_capture_after = true;
                }
                debug!("capture will start once the reply is handled");
            }
            State::Playing => {
                if let Some(session) = self.playback_session.as_mut() {
                    session.resume_capture_on_end = true;
                }
                debug!("capture will start after playback");
            }
            State::Idle | State::Error => {
                self.timers.disarm(TimerKind::Settle);
                self.begin_capture();
            }
        }
    }

    fn send_text(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        let resume = match self.state {
            State::Delivering => {
                warn!("typed message dropped while a reply is pending");
                self.notify(VoiceError::Busy);
                return;
            }
            State::Listening | State::PendingCommit => {
                self.end_capture();
                self.set_transcript(String::new());
                true
            }
            State::Playing => {
                let resume = self
                    .playback_session
                    .take()
                    .map(|s| s.resume_capture_on_end)
                    .unwrap_or(false);
                self.playback.pause(self.generation);
                self.generation = self.generation.next();
                resume
            }
            State::Idle | State::Error => {
                let resume = self.timers.is_armed(TimerKind::Settle);
                self.timers.disarm(TimerKind::Settle);
                resume
            }
        };

        self.dispatch(text, Origin::Typed, resume);
    }

    /// Shared stop path: cancel timers, release capture and playback, bump
    /// the generation, and land in `Idle`
    fn halt(&mut self) {
        self.timers.cancel_all();

        if self.session.take().is_some() {
            self.capture.abort(self.generation);
        }
        if self.playback_session.take().is_some() {
            self.playback.pause(self.generation);
        }
        if let Some(attempt) = self.pending.take() {
            debug!(delivery_id = attempt.id, "delivery chain cancelled");
            if attempt.in_flight {
                self.detached_delivery = Some(attempt.id);
            }
        }

        self.generation = self.generation.next();
        self.set_transcript(String::new());
        self.transition_to(State::Idle);
    }

    // --- capture ---

    fn check_capture_guards(&self) -> Result<(), VoiceError> {
        if !self.capture.is_supported() {
            return Err(VoiceError::CaptureUnsupported);
        }
        if *self.permission.borrow() == PermissionState::Denied {
            return Err(VoiceError::PermissionDenied);
        }
        if *self.network.borrow() == NetworkState::Offline {
            return Err(VoiceError::NetworkUnavailable);
        }
        Ok(())
    }

    fn begin_capture(&mut self) {
        if let Err(err) = self.check_capture_guards() {
            self.fail(err);
            return;
        }

        self.generation = self.generation.next();
        let options = self.config.capture_options();
        match self.capture.start(self.generation, &options) {
            Ok(()) => {
                self.session = Some(CaptureSession::default());
                self.transition_to(State::Listening);
            }
            Err(e) => self.fail(VoiceError::Capture(e.to_string())),
        }
    }

    /// Stop the engine gracefully and retire its generation
    fn end_capture(&mut self) {
        if self.session.take().is_some() {
            self.capture.stop(self.generation);
        }
        self.timers.disarm(TimerKind::Silence);
        self.generation = self.generation.next();
    }

    /// Forget a session whose engine is already gone
    fn drop_capture(&mut self) {
        self.session = None;
        self.timers.disarm(TimerKind::Silence);
        self.generation = self.generation.next();
        self.set_transcript(String::new());
    }

    fn on_partial(&mut self, text: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.interim = text.clone();

        // Still talking, so the silence window has not started yet
        if self.state == State::PendingCommit {
            self.arm_silence_timer();
        }
        self.set_transcript(text);
    }

    fn on_final(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.transcript = text.clone();
        session.interim.clear();

        self.arm_silence_timer();
        self.set_transcript(text);
        self.transition_to(State::PendingCommit);
    }

    fn arm_silence_timer(&mut self) {
        let window = self.config.silence_window;
        if let Some(session) = self.session.as_mut() {
            session.silence_deadline = Some(Instant::now() + window);
        }
        let generation = self.generation;
        self.timers.arm(TimerKind::Silence, window, |seq| {
            ControllerInput::SilenceElapsed { generation, seq }
        });
    }

    fn on_silence(&mut self) {
        if self.state == State::PendingCommit {
            self.commit();
        }
    }

    fn commit(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let text = std::mem::take(&mut session.transcript);
        let engine_ended = session.engine_ended;
        session.silence_deadline = None;

        if text.is_empty() || text == self.last_committed_text {
            debug!(chars = text.len(), "duplicate or empty commit suppressed");
            self.set_transcript(String::new());
            if engine_ended {
                self.restart_capture();
            } else {
                self.transition_to(State::Listening);
            }
            return;
        }

        info!(chars = text.len(), "committing utterance");
        self.end_capture();
        self.set_transcript(String::new());
        self.last_committed_text = text.clone();
        self.dispatch(text, Origin::Mic, true);
    }

    fn restart_capture(&mut self) {
        debug!("restarting speech engine");
        self.session = None;
        self.begin_capture();
    }

    fn on_capture_ended(&mut self) {
        match self.state {
            State::Listening => self.restart_capture(),
            State::PendingCommit => {
                if let Some(session) = self.session.as_mut() {
                    session.engine_ended = true;
                }
                self.timers.disarm(TimerKind::Silence);
                self.commit();
            }
            _ => {}
        }
    }

    fn on_capture_failed(&mut self, reason: &str) {
        if !self.state.is_capturing() {
            return;
        }
        warn!(reason, "speech engine error");

        match reason {
            "no-speech" => self.on_capture_ended(),
            "not-allowed" | "service-not-allowed" => {
                self.drop_capture();
                self.fail(VoiceError::PermissionDenied);
            }
            "network" => {
                self.drop_capture();
                self.fail(VoiceError::NetworkUnavailable);
            }
            other => {
                self.drop_capture();
                self.fail(VoiceError::Capture(other.to_string()));
            }
        }
    }

    // --- delivery ---

    fn dispatch(&mut self, text: String, origin: Origin, resume_capture_after: bool) {
        let turn = self.conversation.append(Role::User, text.clone());
        self.emit(VoiceEvent::TurnAppended { turn });

        self.next_delivery_id += 1;
        self.pending = Some(DeliveryAttempt {
            id: self.next_delivery_id,
            text,
            attempt: 0,
            origin,
            resume_capture_after,
            reply_turn: None,
            in_flight: false,
        });

        self.transition_to(State::Delivering);
        self.send_attempt();
    }

    fn send_attempt(&mut self) {
        let Some(attempt) = self.pending.as_mut() else {
            return;
        };
        attempt.in_flight = true;

        let client = Arc::clone(&self.delivery);
        let tx = self.input_tx.clone();
        let generation = self.generation;
        let delivery_id = attempt.id;
        let text = attempt.text.clone();
        let mic_originated = attempt.origin == Origin::Mic;

        info!(
            delivery_id,
            attempt = attempt.attempt,
            origin = ?attempt.origin,
            "delivering message"
        );

        tokio::spawn(async move {
            let result = client.deliver(&text, mic_originated).await;
            let completed = ControllerInput::DeliveryCompleted {
                generation,
                delivery_id,
                result,
            };
            if tx.send(completed).await.is_err() {
                debug!(delivery_id, "controller gone, dropping delivery result");
            }
        });
    }

    fn on_delivery(
        &mut self,
        generation: Generation,
        delivery_id: u64,
        result: Result<DeliveryReply, DeliveryError>,
    ) {
        let is_pending = self.pending.as_ref().is_some_and(|a| a.id == delivery_id);
        if generation != self.generation || !is_pending {
            self.on_detached_delivery(delivery_id, result);
            return;
        }
        let Some(mut attempt) = self.pending.take() else {
            return;
        };
        attempt.in_flight = false;

        match result {
            Ok(reply) => {
                self.record_reply(&mut attempt, reply.reply_text);
                let audio = reply.audio.filter(|a| !a.is_empty());

                match (audio, attempt.origin) {
                    (Some(audio), _) => self.begin_playback(attempt.resume_capture_after, audio),
                    (None, Origin::Typed) => self.finish_delivery(attempt.resume_capture_after),
                    (None, Origin::Mic) => {
                        if let Err(attempt) = self.retry_later(attempt, "reply had no audio") {
                            self.notify(VoiceError::DeliveryIncomplete);
                            self.finish_delivery(attempt.resume_capture_after);
                        }
                    }
                }
            }
            Err(err) => {
                let reason = err.to_string();
                if let Err(attempt) = self.retry_later(attempt, &reason) {
                    warn!(delivery_id, error = %reason, "delivery retries exhausted");
                    self.notify(VoiceError::DeliveryTransport {
                        attempts: attempt.attempt + 1,
                        reason,
                    });
                    self.transition_to(State::Error);
                }
            }
        }
    }

    /// A reply for a chain cut short by a stop still lands in the
    /// conversation as text
    fn on_detached_delivery(&mut self, delivery_id: u64, result: Result<DeliveryReply, DeliveryError>) {
        if self.detached_delivery != Some(delivery_id) {
            debug!(delivery_id, "discarding stale delivery result");
            return;
        }
        self.detached_delivery = None;

        match result {
            Ok(reply) => {
                let turn = self.conversation.append(Role::Assistant, reply.reply_text);
                self.emit(VoiceEvent::TurnAppended { turn });
            }
            Err(err) => debug!(delivery_id, error = %err, "detached delivery failed"),
        }
    }

    fn record_reply(&mut self, attempt: &mut DeliveryAttempt, text: String) {
        let updated = attempt
            .reply_turn
            .and_then(|id| self.conversation.update(id, text.clone()));

        match updated {
            Some(turn) => self.emit(VoiceEvent::TurnUpdated { turn }),
            None => {
                let turn = self.conversation.append(Role::Assistant, text);
                attempt.reply_turn = Some(turn.id);
                self.emit(VoiceEvent::TurnAppended { turn });
            }
        }
    }

    /// Schedule the next attempt, or hand the attempt back once exhausted
    fn retry_later(&mut self, mut attempt: DeliveryAttempt, reason: &str) -> Result<(), DeliveryAttempt> {
        let Some(delay) = self.retry.next_delay(attempt.attempt) else {
            return Err(attempt);
        };

        attempt.attempt += 1;
        warn!(
            delivery_id = attempt.id,
            retry = attempt.attempt,
            max_retries = self.retry.max_retries(),
            delay_ms = millis(delay),
            reason,
            "retrying delivery"
        );

        self.pending = Some(attempt);
        let generation = self.generation;
        self.timers
            .arm(TimerKind::Retry, delay, |seq| ControllerInput::RetryDue { generation, seq });
        Ok(())
    }

    fn on_retry_due(&mut self) {
        let waiting = self.pending.as_ref().is_some_and(|a| !a.in_flight);
        if self.state == State::Delivering && waiting {
            self.send_attempt();
        }
    }

    fn finish_delivery(&mut self, resume_capture: bool) {
        if resume_capture && self.is_online() {
            self.begin_capture();
        } else {
            self.transition_to(State::Idle);
        }
    }

    // --- playback ---

    fn begin_playback(&mut self, resume_capture_on_end: bool, audio: AudioPayload) {
        // Capture was ended before delivery began
        debug_assert!(self.session.is_none());

        self.playback_session = Some(PlaybackSession {
            resume_capture_on_end,
        });
        match self.playback.play(self.generation, &audio) {
            Ok(()) => {
                debug!(bytes = audio.len(), "reply audio handed to playback");
                self.transition_to(State::Playing);
            }
            Err(e) => {
                self.playback_session = None;
                self.notify(VoiceError::Playback(e.to_string()));
                self.after_playback(resume_capture_on_end);
            }
        }
    }

    fn on_playback_finished(&mut self, failure: Option<String>) {
        if self.state != State::Playing {
            return;
        }
        let Some(session) = self.playback_session.take() else {
            return;
        };
        if let Some(reason) = failure {
            self.notify(VoiceError::Playback(reason));
        }
        self.after_playback(session.resume_capture_on_end);
    }

    fn after_playback(&mut self, resume_capture: bool) {
        self.transition_to(State::Idle);
        if resume_capture && self.is_online() {
            let generation = self.generation;
            self.timers.arm(TimerKind::Settle, self.config.settle_delay, |seq| {
                ControllerInput::SettleElapsed { generation, seq }
            });
        }
    }

    fn on_settled(&mut self) {
        if self.state == State::Idle {
            self.begin_capture();
        }
    }

    // --- monitors ---

    fn is_online(&self) -> bool {
        *self.network.borrow() == NetworkState::Online
    }

    fn on_network(&mut self, state: NetworkState) {
        match state {
            NetworkState::Offline => {
                if matches!(
                    self.state,
                    State::Listening | State::PendingCommit | State::Delivering
                ) {
                    warn!(state = %self.state, "network lost, stopping voice session");
                    self.halt();
                } else if self.timers.is_armed(TimerKind::Settle) {
                    info!("network lost before capture resumed, staying idle");
                    self.timers.disarm(TimerKind::Settle);
                }
                self.notify(VoiceError::NetworkUnavailable);
            }
            NetworkState::Online => {
                info!("network restored, capture stays off until restarted");
                self.emit(VoiceEvent::NoticeCleared {
                    kind: NoticeKind::Network,
                });
            }
        }
    }

    fn on_permission(&mut self, state: PermissionState) {
        if state != PermissionState::Denied {
            debug!(?state, "microphone permission changed");
            return;
        }
        if self.state.is_capturing() {
            warn!("microphone permission revoked during capture");
            self.halt();
        }
        self.notify(VoiceError::PermissionDenied);
    }

    // --- output ---

    fn fail(&mut self, err: VoiceError) {
        warn!(error = %err, retryable = err.is_retryable(), "voice interaction failed");
        self.notify(err);
        self.transition_to(State::Error);
    }

    fn notify(&mut self, err: VoiceError) {
        let message = err.to_string();
        self.last_notice = Some(message.clone());
        self.emit(VoiceEvent::Notice {
            kind: err.notice_kind(),
            message,
        });
    }

    fn set_transcript(&mut self, text: String) {
        if self.transcript_display == text {
            return;
        }
        self.transcript_display = text.clone();
        self.emit(VoiceEvent::Transcript { text });
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: State) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        let duration_ms = millis(self.state_entered_at.elapsed());

        info!(
            from = %old_state,
            to = %new_state,
            generation = %self.generation,
            duration_ms,
            "state transition"
        );

        self.state = new_state;
        self.state_entered_at = Instant::now();
        self.emit(VoiceEvent::StateChanged {
            from: old_state,
            to: new_state,
        });

        let label = StatusLabel::for_state(new_state);
        if label != StatusLabel::for_state(old_state) {
            self.emit(VoiceEvent::Status { label });
        }
    }

    fn emit(&self, event: VoiceEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}
