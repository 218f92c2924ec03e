//! Agent replies: decoding, dispatch onto the host and tool metadata.

pub mod buttons;
pub mod command;
pub mod dispatcher;
pub mod tools;

pub use buttons::{ButtonFinder, ButtonHit};
pub use command::{AgentCommand, CommandError, FunctionInvocation, NO_INTENT};
pub use dispatcher::{execute, viewport_to_pixels, CommandDispatcher, HostEffectors};
pub use tools::{tool_declarations, ToolCall, CLICK_SCREEN_POSITION, CLICK_UI_BUTTON};
