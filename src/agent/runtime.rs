//! Composition root for the host side of the agent loop.
//!
//! The host calls [`AgentRuntime::fixed_update`] once per fixed tick. Each
//! call runs the deferred job queue, folds pending loop events into the
//! controller and ticks it. A capture decision spawns the capture on the
//! tokio runtime; when the frame is ready, a deferred job builds the
//! semantic document on the host tick and hands both to the payload sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::agent::controller::{AgentLoopController, TickDecision};
use crate::agent::deferred::{DeferredHandle, DeferredQueue};
use crate::agent::signal::{loop_channel, LoopEvents, LoopSignal, NO_ROUND};
use crate::bridge::BridgeError;
use crate::capture::CaptureService;
use crate::scene::SceneSource;
use crate::semantic::{ExportSettings, SemanticDocument, SemanticDocumentBuilder};

/// What a sink reports after handing a payload to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub scene_bytes: usize,
    pub image_bytes: usize,
    pub peers: usize,
}

/// Destination of the scene-plus-image payload.
pub trait PayloadSink: Send + Sync {
    fn send_scene(&self, document: &SemanticDocument, image: &[u8]) -> Result<SendReport, BridgeError>;
}

pub struct AgentRuntime<H> {
    controller: AgentLoopController,
    builder: SemanticDocumentBuilder,
    capture: Arc<dyn CaptureService>,
    sink: Arc<dyn PayloadSink>,
    deferred: DeferredQueue<H>,
    signal: LoopSignal,
    events: LoopEvents,
    /// Round whose payload may still be sent; `NO_ROUND` after a timeout.
    active_round: Arc<AtomicU64>,
}

impl<H: SceneSource + 'static> AgentRuntime<H> {
    pub fn new(
        controller: AgentLoopController,
        settings: ExportSettings,
        capture: Arc<dyn CaptureService>,
        sink: Arc<dyn PayloadSink>,
    ) -> Self {
        let (signal, events) = loop_channel();
        Self {
            controller,
            builder: SemanticDocumentBuilder::new(settings),
            capture,
            sink,
            deferred: DeferredQueue::new(),
            signal,
            events,
            active_round: Arc::new(AtomicU64::new(NO_ROUND)),
        }
    }

    /// Signal handed to the command dispatcher.
    pub fn signal(&self) -> LoopSignal {
        self.signal.clone()
    }

    /// Posting end of the host job queue.
    pub fn deferred(&self) -> DeferredHandle<H> {
        self.deferred.handle()
    }

    pub fn controller(&self) -> &AgentLoopController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AgentLoopController {
        &mut self.controller
    }

    /// One fixed tick. Must run inside a tokio runtime so captures can be
    /// spawned.
    pub fn fixed_update(&mut self, host: &mut H, dt: f32) -> TickDecision {
        self.deferred.run_pending(host);
        for event in self.events.drain() {
            self.controller.apply(event);
        }

        let decision = self.controller.tick(dt);
        match decision {
            TickDecision::Capture => {
                let round = self.controller.round();
                self.active_round.store(round, Ordering::SeqCst);
                self.begin_capture(round);
            }
            TickDecision::TimedOut => self.active_round.store(NO_ROUND, Ordering::SeqCst),
            _ => {}
        }
        decision
    }

    fn begin_capture(&self, round: u64) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("[Agent] Cannot start capture outside a tokio runtime: {}", e);
                self.signal.aborted(round, "no async runtime");
                return;
            }
        };

        let capture = Arc::clone(&self.capture);
        let sink = Arc::clone(&self.sink);
        let builder = self.builder.clone();
        let deferred = self.deferred.handle();
        let signal = self.signal.clone();
        let active_round = Arc::clone(&self.active_round);

        runtime.spawn(async move {
            let image = match capture.capture().await {
                Ok(image) => image,
                Err(e) => {
                    warn!("[Agent] Capture failed: {}", e);
                    signal.aborted(round, e.to_string());
                    return;
                }
            };

            let job_signal = signal.clone();
            let posted = deferred.post(move |host: &mut H| {
                if active_round.load(Ordering::SeqCst) != round {
                    debug!("[Agent] Dropping capture of expired round {}", round);
                    return;
                }
                let document = builder.build(&*host);
                match sink.send_scene(&document, &image) {
                    Ok(report) => {
                        info!(
                            "[Agent] Context sent. Scene JSON size: {}KB. Image size: {}KB.",
                            report.scene_bytes / 1024,
                            report.image_bytes / 1024
                        );
                        job_signal.sent(round);
                    }
                    Err(e) => {
                        warn!("[Agent] Failed to send context: {}", e);
                        job_signal.aborted(round, e.to_string());
                    }
                }
            });
            if !posted {
                signal.aborted(round, "host queue closed");
            }
        });
    }
}
