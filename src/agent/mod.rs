//! Host-side agent loop.
//!
//! - [`controller`]: throttling state machine and host gate.
//! - [`signal`]: round-trip progress events, many producers, one consumer.
//! - [`deferred`]: jobs marshalled onto the host tick thread.
//! - [`registry`]: explicit get-or-create service registry.
//! - [`runtime`]: wires the above to capture, export and the payload sink.

pub mod controller;
pub mod deferred;
pub mod registry;
pub mod runtime;
pub mod signal;

pub use controller::{
    ActionRecord, AgentGate, AgentLoopController, BlockReason, GateFlags, LoopSettings, LoopState, TickDecision,
};
pub use deferred::{DeferredHandle, DeferredQueue};
pub use registry::ServiceRegistry;
pub use runtime::{AgentRuntime, PayloadSink, SendReport};
pub use signal::{loop_channel, LoopEvent, LoopEvents, LoopSignal, NO_ROUND};
