//! Tools the agent may invoke, and their declarations.

use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const CLICK_SCREEN_POSITION: &str = "click_screen_position";
pub const CLICK_UI_BUTTON: &str = "click_ui_button";

/// A typed view of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Normalized viewport coordinates, top-left origin.
    ClickScreenPosition { x: f32, y: f32 },
    ClickUiButton {
        button_name: String,
        ancestor_name: Option<String>,
    },
    /// A name this host does not implement.
    Unknown(String),
    /// A known name with unusable arguments.
    Invalid { name: String, reason: String },
}

#[derive(Deserialize)]
struct ScreenArgs {
    #[serde(rename = "screenX")]
    screen_x: f32,
    #[serde(rename = "screenY")]
    screen_y: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ButtonArgs {
    button_name: String,
    #[serde(default)]
    ancestor_name: Option<String>,
}

impl ToolCall {
    pub fn from_invocation(name: &str, args: &Map<String, Value>) -> Self {
        let args = Value::Object(args.clone());
        let invalid = |e: serde_json::Error| ToolCall::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        };
        match name {
            CLICK_SCREEN_POSITION => match serde_json::from_value::<ScreenArgs>(args) {
                Ok(a) => ToolCall::ClickScreenPosition {
                    x: a.screen_x,
                    y: a.screen_y,
                },
                Err(e) => invalid(e),
            },
            CLICK_UI_BUTTON => match serde_json::from_value::<ButtonArgs>(args) {
                Ok(a) => ToolCall::ClickUiButton {
                    button_name: a.button_name,
                    ancestor_name: a.ancestor_name.filter(|s| !s.is_empty()),
                },
                Err(e) => invalid(e),
            },
            other => ToolCall::Unknown(other.to_string()),
        }
    }
}

/// Function declarations for the agent's model, one per tool.
pub fn tool_declarations() -> Value {
    json!([
        {
            "name": CLICK_UI_BUTTON,
            "description": "Click a button with the specified button name.",
            "parameters": {
                "type": "object",
                "properties": {
                    "ButtonName": {
                        "type": "string",
                        "description": "Name of the button to press"
                    },
                    "AncestorName": {
                        "type": "string",
                        "description": "Optional name of an ancestor (a parent object) of the button. Used where more than one button shares the same ButtonName."
                    },
                    "Intent": {
                        "type": "string",
                        "description": "Specify the intent of the button press."
                    }
                },
                "required": ["ButtonName", "Intent"]
            }
        },
        {
            "name": CLICK_SCREEN_POSITION,
            "description": "Clicks the provided screen position. Coordinates are normalized viewport values; 0, 0 is the top left of the screen.",
            "parameters": {
                "type": "object",
                "properties": {
                    "screenX": {
                        "type": "number",
                        "description": "Distance from the left edge, 0 to 1."
                    },
                    "screenY": {
                        "type": "number",
                        "description": "Distance from the top edge, 0 to 1."
                    },
                    "Intent": {
                        "type": "string",
                        "description": "Specify what the click is intended to do."
                    }
                },
                "required": ["screenX", "screenY", "Intent"]
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_click_screen_position() {
        let call = ToolCall::from_invocation(CLICK_SCREEN_POSITION, &args(json!({"screenX": 0.5, "screenY": 1})));
        assert_eq!(call, ToolCall::ClickScreenPosition { x: 0.5, y: 1.0 });
    }

    #[test]
    fn test_click_ui_button_with_optional_ancestor() {
        let call = ToolCall::from_invocation(CLICK_UI_BUTTON, &args(json!({"ButtonName": "Buy"})));
        assert_eq!(
            call,
            ToolCall::ClickUiButton {
                button_name: "Buy".to_string(),
                ancestor_name: None
            }
        );
        let call = ToolCall::from_invocation(
            CLICK_UI_BUTTON,
            &args(json!({"ButtonName": "Buy", "AncestorName": "ShopPanel", "Intent": "x"})),
        );
        assert!(matches!(call, ToolCall::ClickUiButton { ancestor_name: Some(a), .. } if a == "ShopPanel"));
    }

    #[test]
    fn test_bad_arguments_are_invalid() {
        let call = ToolCall::from_invocation(CLICK_SCREEN_POSITION, &args(json!({"screenX": "left"})));
        assert!(matches!(call, ToolCall::Invalid { name, .. } if name == CLICK_SCREEN_POSITION));
        let call = ToolCall::from_invocation(CLICK_UI_BUTTON, &Map::new());
        assert!(matches!(call, ToolCall::Invalid { .. }));
    }

    #[test]
    fn test_unknown_tool() {
        assert_eq!(
            ToolCall::from_invocation("jump", &Map::new()),
            ToolCall::Unknown("jump".to_string())
        );
    }

    #[test]
    fn test_declarations_cover_both_tools() {
        let decls = tool_declarations();
        let names: Vec<&str> = decls
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![CLICK_UI_BUTTON, CLICK_SCREEN_POSITION]);
        assert_eq!(decls[1]["parameters"]["required"], json!(["screenX", "screenY", "Intent"]));
    }
}
