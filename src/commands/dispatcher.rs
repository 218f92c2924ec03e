//! Command dispatcher.
//!
//! Runs on the transport's context: it decodes inbound bytes and posts the
//! effector calls to the host's deferred queue. The posted job executes
//! every invocation of the message in order and then reports completion
//! once with all of their intents.

use bytes::Bytes;
use glam::Vec2;
use log::{debug, info, warn};

use super::command::{AgentCommand, CommandError, FunctionInvocation};
use super::tools::ToolCall;
use crate::agent::{DeferredHandle, LoopSignal};

/// Host actions the agent can trigger. Called on the host tick only.
pub trait HostEffectors {
    /// Current viewport size in pixels.
    fn viewport_size(&self) -> Vec2;

    /// Click at a pixel position, bottom-left origin.
    fn click_at(&mut self, pixel: Vec2);

    /// Press a UI button by name. Returns `false` when nothing matched.
    fn click_button(&mut self, name: &str, ancestor: Option<&str>) -> bool;
}

/// Top-left normalized viewport coordinates to bottom-left pixels.
pub fn viewport_to_pixels(x: f32, y: f32, viewport: Vec2) -> Vec2 {
    Vec2::new(x * viewport.x, (1.0 - y) * viewport.y)
}

pub struct CommandDispatcher<H> {
    deferred: DeferredHandle<H>,
    signal: LoopSignal,
}

impl<H: HostEffectors + 'static> CommandDispatcher<H> {
    pub fn new(deferred: DeferredHandle<H>, signal: LoopSignal) -> Self {
        Self { deferred, signal }
    }

    /// Decode and schedule one inbound message. Undecodable messages are
    /// logged and dropped without touching the loop.
    pub fn handle_message(&self, client_id: u32, data: &[u8]) -> Result<(), CommandError> {
        debug!("[Bridge] Client {}: {}", client_id, String::from_utf8_lossy(data));
        let command = AgentCommand::decode(data).inspect_err(|e| {
            warn!("[Bridge] Dropping message from client {}: {}", client_id, e);
        })?;
        self.dispatch(command);
        Ok(())
    }

    pub fn dispatch(&self, command: AgentCommand) {
        match command {
            AgentCommand::Text(text) => {
                warn!("[Agent] Agent text response: {}", text);
                self.signal.completed(vec![text]);
            }
            AgentCommand::FunctionCall(calls) => {
                // The reply answers whatever was sent before it arrived.
                let round = self.signal.last_sent();
                let signal = self.signal.clone();
                let posted = self.deferred.post(move |host: &mut H| {
                    let intents = execute(host, &calls);
                    signal.completed_for(round, intents);
                });
                if !posted {
                    self.signal.aborted(round, "host queue closed");
                }
            }
        }
    }

    /// Adapt into a bridge inbound handler.
    pub fn into_handler(self) -> impl Fn(u32, Bytes) + Send + Sync + 'static {
        move |client_id, data| {
            let _ = self.handle_message(client_id, &data);
        }
    }
}

/// Apply `calls` to the host in order. Returns one intent per call.
pub fn execute<H: HostEffectors>(host: &mut H, calls: &[FunctionInvocation]) -> Vec<String> {
    let mut intents = Vec::with_capacity(calls.len());
    for call in calls {
        match call.tool_call() {
            ToolCall::ClickScreenPosition { x, y } => {
                let pixel = viewport_to_pixels(x, y, host.viewport_size());
                debug!("[Agent] Viewport: {},{} -> Pixels: {}", x, y, pixel);
                host.click_at(pixel);
            }
            ToolCall::ClickUiButton {
                button_name,
                ancestor_name,
            } => {
                if host.click_button(&button_name, ancestor_name.as_deref()) {
                    info!("[Agent] Invoking UI Button: {}", button_name);
                } else {
                    warn!("[Agent] Button '{}' not found or not interactable.", button_name);
                }
            }
            ToolCall::Unknown(name) => debug!("[Agent] Ignoring unknown function '{}'", name),
            ToolCall::Invalid { name, reason } => {
                warn!("[Agent] Skipping '{}' with invalid arguments: {}", name, reason)
            }
        }
        intents.push(call.intent());
    }
    intents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{loop_channel, DeferredQueue, LoopEvent, NO_ROUND};
    use serde_json::json;

    #[derive(Default)]
    struct RecordingHost {
        clicks: Vec<Vec2>,
        pressed: Vec<(String, Option<String>)>,
        known_buttons: Vec<&'static str>,
    }

    impl HostEffectors for RecordingHost {
        fn viewport_size(&self) -> Vec2 {
            Vec2::new(1920.0, 1080.0)
        }

        fn click_at(&mut self, pixel: Vec2) {
            self.clicks.push(pixel);
        }

        fn click_button(&mut self, name: &str, ancestor: Option<&str>) -> bool {
            self.pressed.push((name.to_string(), ancestor.map(str::to_string)));
            self.known_buttons.iter().any(|b| *b == name)
        }
    }

    #[test]
    fn test_viewport_to_pixels_flips_y() {
        let p = viewport_to_pixels(0.25, 0.25, Vec2::new(1920.0, 1080.0));
        assert_eq!(p, Vec2::new(480.0, 810.0));
        assert_eq!(viewport_to_pixels(0.0, 0.0, Vec2::new(800.0, 600.0)), Vec2::new(0.0, 600.0));
    }

    #[test]
    fn test_function_calls_are_deferred_to_host_tick() {
        let mut queue = DeferredQueue::<RecordingHost>::new();
        let (signal, mut events) = loop_channel();
        let dispatcher = CommandDispatcher::new(queue.handle(), signal);

        let raw = json!({"type": "function_call", "content": [
            {"name": "click_screen_position", "args": {"screenX": 0.5, "screenY": 0.5, "Intent": "select"}},
            {"name": "click_ui_button", "args": {"ButtonName": "EndTurn", "Intent": "end turn"}}
        ]});
        dispatcher.handle_message(1, raw.to_string().as_bytes()).unwrap();

        // Nothing has happened on the host yet.
        assert!(events.drain().is_empty());

        let mut host = RecordingHost {
            known_buttons: vec!["EndTurn"],
            ..RecordingHost::default()
        };
        assert_eq!(queue.run_pending(&mut host), 1);
        assert_eq!(host.clicks, vec![Vec2::new(960.0, 540.0)]);
        assert_eq!(host.pressed, vec![("EndTurn".to_string(), None)]);
        assert_eq!(
            events.drain(),
            vec![LoopEvent::Completed {
                round: NO_ROUND,
                intents: vec!["select".to_string(), "end turn".to_string()]
            }]
        );
    }

    #[test]
    fn test_text_completes_immediately() {
        let queue = DeferredQueue::<RecordingHost>::new();
        let (signal, mut events) = loop_channel();
        let dispatcher = CommandDispatcher::new(queue.handle(), signal);

        dispatcher
            .handle_message(2, br#"{"type":"text","content":"Nothing to do."}"#)
            .unwrap();
        assert_eq!(queue.pending(), 0);
        assert_eq!(
            events.drain(),
            vec![LoopEvent::Completed {
                round: NO_ROUND,
                intents: vec!["Nothing to do.".to_string()]
            }]
        );
    }

    #[test]
    fn test_reply_is_tied_to_round_sent_before_it_arrived() {
        let mut queue = DeferredQueue::<RecordingHost>::new();
        let (signal, mut events) = loop_channel();
        let dispatcher = CommandDispatcher::new(queue.handle(), signal.clone());

        signal.sent(1);
        let raw = json!({"type": "function_call", "content": [
            {"name": "click_screen_position", "args": {"screenX": 0.5, "screenY": 0.5, "Intent": "wait"}}
        ]});
        dispatcher.handle_message(1, raw.to_string().as_bytes()).unwrap();
        signal.sent(2);

        queue.run_pending(&mut RecordingHost::default());
        let events = events.drain();
        assert_eq!(
            events.last(),
            Some(&LoopEvent::Completed {
                round: 1,
                intents: vec!["wait".to_string()]
            })
        );
    }

    #[test]
    fn test_malformed_message_leaves_loop_untouched() {
        let queue = DeferredQueue::<RecordingHost>::new();
        let (signal, mut events) = loop_channel();
        let dispatcher = CommandDispatcher::new(queue.handle(), signal);

        assert!(dispatcher.handle_message(3, b"garbage").is_err());
        assert!(dispatcher.handle_message(3, br#"{"type":"dance"}"#).is_err());
        assert_eq!(queue.pending(), 0);
        assert!(events.drain().is_empty());
    }

    #[test]
    fn test_unknown_missing_and_invalid_calls_still_count() {
        let calls = vec![
            FunctionInvocation::new("teleport", json!({"Intent": "cheat"})),
            FunctionInvocation::new("click_ui_button", json!({"ButtonName": "Missing"})),
            FunctionInvocation::new("click_screen_position", json!({"screenX": "left", "Intent": "bad"})),
            FunctionInvocation::new("click_ui_button", json!({"ButtonName": "Play", "AncestorName": "Menu"})),
        ];
        let mut host = RecordingHost {
            known_buttons: vec!["Play"],
            ..RecordingHost::default()
        };
        let intents = execute(&mut host, &calls);
        assert_eq!(intents, vec!["cheat", "No Intent", "bad", "No Intent"]);
        assert!(host.clicks.is_empty());
        assert_eq!(host.pressed.len(), 2);
        assert_eq!(host.pressed[1], ("Play".to_string(), Some("Menu".to_string())));
    }

    #[test]
    fn test_handler_adapter() {
        let mut queue = DeferredQueue::<RecordingHost>::new();
        let (signal, mut events) = loop_channel();
        let handler = CommandDispatcher::new(queue.handle(), signal).into_handler();

        handler(
            7,
            Bytes::from_static(br#"{"type":"function_call","content":[{"name":"click_screen_position","args":{"screenX":1,"screenY":0}}]}"#),
        );
        let mut host = RecordingHost::default();
        queue.run_pending(&mut host);
        assert_eq!(host.clicks, vec![Vec2::new(1920.0, 1080.0)]);
        assert_eq!(events.drain().len(), 1);
    }
}
