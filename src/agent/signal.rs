//! Loop signal: the channel through which the bridge and the dispatcher
//! report round-trip progress back to the loop controller.
//!
//! Any number of [`LoopSignal`] clones may send. The single [`LoopEvents`]
//! receiver is owned by the runtime and drained on the host tick.
//!
//! Every event names the round it belongs to, so the controller can drop
//! events from a round it already gave up on. Replies carry no round of
//! their own; they are stamped with the last round whose payload reached
//! the transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Round number used before any payload has been sent.
pub const NO_ROUND: u64 = 0;

/// Progress of one capture-and-send round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// The scene payload reached the transport.
    Sent { round: u64 },
    /// The agent's reply was processed. One entry per intent in the reply.
    Completed { round: u64, intents: Vec<String> },
    /// The round trip failed before a reply could arrive.
    Aborted { round: u64, reason: String },
}

impl LoopEvent {
    pub fn round(&self) -> u64 {
        match self {
            LoopEvent::Sent { round } | LoopEvent::Completed { round, .. } | LoopEvent::Aborted { round, .. } => *round,
        }
    }
}

/// Sending half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoopSignal {
    tx: mpsc::UnboundedSender<LoopEvent>,
    last_sent: Arc<AtomicU64>,
}

/// Receiving half. Owned by exactly one consumer.
#[derive(Debug)]
pub struct LoopEvents {
    rx: mpsc::UnboundedReceiver<LoopEvent>,
}

/// Create a matched signal/receiver pair.
pub fn loop_channel() -> (LoopSignal, LoopEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    let signal = LoopSignal {
        tx,
        last_sent: Arc::new(AtomicU64::new(NO_ROUND)),
    };
    (signal, LoopEvents { rx })
}

impl LoopSignal {
    pub fn emit(&self, event: LoopEvent) {
        if self.tx.send(event).is_err() {
            debug!("Loop event dropped: receiver is gone");
        }
    }

    /// Round of the most recent payload that reached the transport.
    pub fn last_sent(&self) -> u64 {
        self.last_sent.load(Ordering::SeqCst)
    }

    pub fn sent(&self, round: u64) {
        // Queued before it becomes visible, so no reply stamped with
        // `round` can overtake it.
        self.emit(LoopEvent::Sent { round });
        self.last_sent.store(round, Ordering::SeqCst);
    }

    /// Report a reply to whatever round was sent last.
    pub fn completed(&self, intents: Vec<String>) {
        self.completed_for(self.last_sent(), intents);
    }

    /// Report a reply to `round`, typically stamped with [`last_sent`](Self::last_sent)
    /// when the reply arrived.
    pub fn completed_for(&self, round: u64, intents: Vec<String>) {
        self.emit(LoopEvent::Completed { round, intents });
    }

    pub fn aborted(&self, round: u64, reason: impl Into<String>) {
        self.emit(LoopEvent::Aborted {
            round,
            reason: reason.into(),
        });
    }
}

impl LoopEvents {
    /// Take every event queued so far, oldest first. Never blocks.
    pub fn drain(&mut self) -> Vec<LoopEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Wait for the next event. `None` once every signal is dropped.
    pub async fn recv(&mut self) -> Option<LoopEvent> {
        self.rx.recv().await
    }
}
