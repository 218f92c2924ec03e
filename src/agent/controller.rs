//! Agent loop controller.
//!
//! A small state machine that throttles capture-and-send cycles:
//!
//! ```text
//!   Idle ──tick(interval elapsed, gate open)──► CaptureRequested
//!    ▲                                              │ Sent
//!    │                                              ▼
//!    └──── Completed / Aborted / timeout ──── AwaitingResponse
//! ```
//!
//! At most one round trip is in flight: any state other than `Idle` blocks
//! the next capture.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::agent::signal::{LoopEvent, NO_ROUND};

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Host-side eligibility check consulted before every capture.
pub trait AgentGate: Send + Sync {
    /// Whether the host is in a state the agent may act on (e.g. player turn).
    fn can_act(&self) -> bool;

    /// Whether the host is still busy applying a previous action.
    fn is_processing(&self) -> bool {
        false
    }
}

/// Gate backed by two flags the host toggles from anywhere.
#[derive(Debug, Default)]
pub struct GateFlags {
    can_act: AtomicBool,
    processing: AtomicBool,
}

impl GateFlags {
    pub fn new(can_act: bool) -> Self {
        Self {
            can_act: AtomicBool::new(can_act),
            processing: AtomicBool::new(false),
        }
    }

    pub fn set_can_act(&self, value: bool) {
        self.can_act.store(value, Ordering::SeqCst);
    }

    pub fn set_processing(&self, value: bool) {
        self.processing.store(value, Ordering::SeqCst);
    }
}

impl AgentGate for GateFlags {
    fn can_act(&self) -> bool {
        self.can_act.load(Ordering::SeqCst)
    }

    fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Settings and state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Seconds between capture attempts.
    pub interval_secs: f32,
    /// Give up on a reply after this many seconds. `None` waits forever.
    pub response_timeout_secs: Option<f32>,
    /// Seconds to keep blocking after a reply, so the host can settle
    /// before the next frame is captured.
    pub resume_delay_secs: f32,
    /// Most recent intents kept in the action log. Older ones are dropped.
    pub action_log_limit: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            response_timeout_secs: Some(30.0),
            resume_delay_secs: 1.0,
            action_log_limit: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    CaptureRequested,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// A round trip is already in flight.
    AwaitingResponse,
    /// No gate is registered, or the gate says no.
    CannotAct,
    /// The host is mid-processing.
    Processing,
}

/// Outcome of one fixed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// The interval has not elapsed yet.
    Wait,
    /// The interval elapsed but a capture is not allowed.
    Blocked(BlockReason),
    /// Start a capture now. The controller is already `CaptureRequested`
    /// and [`AgentLoopController::round`] names the new round.
    Capture,
    /// The pending round trip expired; the loop is `Idle` again.
    TimedOut,
}

/// One intent received from the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub intent: String,
    pub received_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct AgentLoopController {
    settings: LoopSettings,
    state: LoopState,
    /// Number of the latest capture; 0 before the first one.
    round: u64,
    cooldown: f32,
    /// Seconds spent outside `Idle` in the current round trip.
    waited: f32,
    /// Remaining settle time after a completed round trip.
    resume_in: Option<f32>,
    gate: Option<Arc<dyn AgentGate>>,
    actions: VecDeque<ActionRecord>,
}

impl Default for AgentLoopController {
    fn default() -> Self {
        Self::new(LoopSettings::default())
    }
}

impl AgentLoopController {
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            settings,
            state: LoopState::Idle,
            round: NO_ROUND,
            cooldown: 0.0,
            waited: 0.0,
            resume_in: None,
            gate: None,
            actions: VecDeque::new(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AgentGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_gate(&mut self, gate: Option<Arc<dyn AgentGate>>) {
        self.gate = gate;
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of the latest round, the one events must name to count.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.state != LoopState::Idle
    }

    /// Most recent intents, oldest first.
    pub fn actions(&self) -> &VecDeque<ActionRecord> {
        &self.actions
    }

    /// Advance by `dt` seconds of fixed time.
    pub fn tick(&mut self, dt: f32) -> TickDecision {
        if self.state != LoopState::Idle {
            if let Some(remaining) = self.resume_in.as_mut() {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    self.reset();
                }
            } else {
                self.waited += dt;
                if let Some(timeout) = self.settings.response_timeout_secs {
                    if self.waited >= timeout {
                        warn!(
                            "[Agent] No reply to round {} after {:.1}s; returning to idle",
                            self.round, self.waited
                        );
                        self.reset();
                        self.cooldown = 0.0;
                        return TickDecision::TimedOut;
                    }
                }
            }
        }

        self.cooldown += dt;
        if self.cooldown < self.settings.interval_secs {
            return TickDecision::Wait;
        }
        self.cooldown = 0.0;
        self.try_to_act()
    }

    fn try_to_act(&mut self) -> TickDecision {
        if self.state != LoopState::Idle {
            return TickDecision::Blocked(BlockReason::AwaitingResponse);
        }
        let Some(gate) = self.gate.as_ref() else {
            return TickDecision::Blocked(BlockReason::CannotAct);
        };
        if !gate.can_act() {
            return TickDecision::Blocked(BlockReason::CannotAct);
        }
        if gate.is_processing() {
            return TickDecision::Blocked(BlockReason::Processing);
        }

        self.round += 1;
        self.state = LoopState::CaptureRequested;
        self.waited = 0.0;
        debug!("[Agent] Capture requested (round {})", self.round);
        TickDecision::Capture
    }

    /// Apply an event from the loop signal.
    pub fn apply(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Sent { round } => self.mark_sent(round),
            LoopEvent::Completed { round, intents } => self.complete(round, intents),
            LoopEvent::Aborted { round, reason } => self.abort(round, &reason),
        }
    }

    /// The payload of `round` reached the transport.
    pub fn mark_sent(&mut self, round: u64) {
        if round != self.round || self.state != LoopState::CaptureRequested {
            debug!("[Agent] Ignoring send of stale round {} (current {})", round, self.round);
            return;
        }
        self.state = LoopState::AwaitingResponse;
    }

    /// The agent replied to `round`. All intents are logged; the loop
    /// resumes once, and only if `round` is the one it is waiting on.
    pub fn complete(&mut self, round: u64, intents: Vec<String>) {
        self.record(intents);

        if self.state != LoopState::AwaitingResponse || self.resume_in.is_some() {
            return;
        }
        if round != self.round {
            debug!("[Agent] Ignoring late reply to round {} (current {})", round, self.round);
            return;
        }
        if self.settings.resume_delay_secs > 0.0 {
            self.resume_in = Some(self.settings.resume_delay_secs);
        } else {
            self.reset();
        }
    }

    /// Round trip `round` failed; try again on the next interval.
    pub fn abort(&mut self, round: u64, reason: &str) {
        if round != self.round || self.state == LoopState::Idle {
            debug!("[Agent] Ignoring abort of stale round {}: {}", round, reason);
            return;
        }
        warn!("[Agent] Round trip aborted: {}", reason);
        self.reset();
    }

    fn record(&mut self, intents: Vec<String>) {
        let now = Utc::now();
        for intent in intents {
            info!("[Agent] Action: {}", intent);
            self.actions.push_back(ActionRecord {
                intent,
                received_at: now,
            });
        }
        while self.actions.len() > self.settings.action_log_limit {
            self.actions.pop_front();
        }
    }

    fn reset(&mut self) {
        self.state = LoopState::Idle;
        self.waited = 0.0;
        self.resume_in = None;
    }
}
