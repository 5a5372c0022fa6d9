// SPDX-License-Identifier: GPL-3.0-only

//! Declarative UI description returned by each effect's `render_ui`
//!
//! The host renders the tree and reports interaction back as [`UiEvent`]s;
//! [`apply_event`] folds an event into the parameter bag.

use crate::params::{Color, ParamBag, ParamSchema, ParamValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Row,
    Col,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Sm,
    #[default]
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiNode {
    Group {
        direction: Direction,
        disabled: bool,
        children: Vec<UiNode>,
    },
    Text {
        text: String,
        size: TextSize,
    },
    #[serde(rename_all = "camelCase")]
    Slider {
        key: String,
        data_type: DataType,
        min: f64,
        max: f64,
        value: f64,
    },
    #[serde(rename_all = "camelCase")]
    NumberInput {
        key: String,
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
        value: f64,
    },
    Checkbox {
        key: String,
        label: String,
        value: bool,
    },
    /// Free text; bound to a colour key it carries the hex code
    TextInput {
        key: String,
        value: String,
    },
    ColorInput {
        key: String,
        value: Color,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        key: String,
        options: Vec<SelectOption>,
        value: String,
        selected_index: i64,
    },
    /// Clicking merges `patch` into the parameters
    Button {
        id: String,
        text: String,
        patch: ParamBag,
    },
    Separator,
}

impl UiNode {
    pub fn col(children: Vec<UiNode>) -> Self {
        UiNode::Group {
            direction: Direction::Col,
            disabled: false,
            children,
        }
    }

    pub fn row(children: Vec<UiNode>) -> Self {
        UiNode::Group {
            direction: Direction::Row,
            disabled: false,
            children,
        }
    }

    /// Same group, greyed out when `disabled`
    pub fn disabled(self, disabled: bool) -> Self {
        match self {
            UiNode::Group {
                direction,
                children,
                ..
            } => UiNode::Group {
                direction,
                disabled,
                children,
            },
            other => other,
        }
    }

    pub fn text(text: &str) -> Self {
        UiNode::Text {
            text: text.to_string(),
            size: TextSize::Normal,
        }
    }

    pub fn slider(key: &str, data_type: DataType, min: f64, max: f64, value: f64) -> Self {
        UiNode::Slider {
            key: key.to_string(),
            data_type,
            min,
            max,
            value,
        }
    }

    pub fn number_input(key: &str, data_type: DataType, value: f64) -> Self {
        UiNode::NumberInput {
            key: key.to_string(),
            data_type,
            min: None,
            max: None,
            step: None,
            value,
        }
    }

    pub fn checkbox(key: &str, label: &str, value: bool) -> Self {
        UiNode::Checkbox {
            key: key.to_string(),
            label: label.to_string(),
            value,
        }
    }

    pub fn text_input(key: &str, value: &str) -> Self {
        UiNode::TextInput {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn color_input(key: &str, value: Color) -> Self {
        UiNode::ColorInput {
            key: key.to_string(),
            value,
        }
    }

    pub fn select(key: &str, options: &[(&str, &str)], value: &str) -> Self {
        let options: Vec<SelectOption> = options
            .iter()
            .map(|(value, label)| SelectOption {
                value: value.to_string(),
                label: label.to_string(),
            })
            .collect();
        let selected_index = options
            .iter()
            .position(|o| o.value == value)
            .map_or(-1, |i| i as i64);
        UiNode::Select {
            key: key.to_string(),
            options,
            value: value.to_string(),
            selected_index,
        }
    }

    pub fn button(id: &str, text: &str, patch: ParamBag) -> Self {
        UiNode::Button {
            id: id.to_string(),
            text: text.to_string(),
            patch,
        }
    }

    /// Label above a slider + number input pair, the layout most fields use
    pub fn labeled_slider(
        label: &str,
        key: &str,
        data_type: DataType,
        min: f64,
        max: f64,
        value: f64,
    ) -> Self {
        UiNode::col(vec![
            UiNode::text(label),
            UiNode::row(vec![
                UiNode::slider(key, data_type, min, max, value),
                UiNode::number_input(key, data_type, value),
            ]),
        ])
    }

    /// Depth-first search for a button by id
    pub fn find_button(&self, button_id: &str) -> Option<&ParamBag> {
        match self {
            UiNode::Button { id, patch, .. } if id == button_id => Some(patch),
            UiNode::Group { children, .. } => {
                children.iter().find_map(|c| c.find_button(button_id))
            }
            _ => None,
        }
    }
}

/// Interaction reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UiEvent {
    Change { key: String, value: ParamValue },
    Click { id: String },
}

/// Fold a UI event into `params`
///
/// Changes to undeclared keys and values that cannot be coerced (for example a
/// malformed hex code typed into a colour text field) leave the bag untouched.
pub fn apply_event(
    schema: &ParamSchema,
    ui: &UiNode,
    params: &ParamBag,
    event: &UiEvent,
) -> ParamBag {
    let mut next = params.clone();
    match event {
        UiEvent::Change { key, value } => {
            if let Some(v) = schema.get(key).and_then(|spec| spec.coerce(value)) {
                next.set(key, v);
            } else {
                tracing::debug!(key = %key, "Ignoring UI change that does not fit the schema");
            }
        }
        UiEvent::Click { id } => match ui.find_button(id) {
            Some(patch) => next.merge(patch),
            None => tracing::debug!(button = %id, "Click on unknown button"),
        },
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamSpec;

    #[test]
    fn test_node_serialisation_shape() {
        let node = UiNode::slider("radius", DataType::Int, 1.0, 200.0, 10.0);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "slider");
        assert_eq!(json["dataType"], "int");

        let select = UiNode::select("mode", &[("a", "A"), ("b", "B")], "b");
        let json = serde_json::to_value(&select).unwrap();
        assert_eq!(json["selectedIndex"], 1);
    }

    #[test]
    fn test_apply_event_parses_hex_and_rejects_garbage() {
        let schema = ParamSchema::new(vec![ParamSpec::color("color", Color::BLACK)]);
        let ui = UiNode::col(vec![UiNode::text_input("color", "000000")]);
        let params = schema.defaults();

        let ok = UiEvent::Change {
            key: "color".into(),
            value: ParamValue::Enum("#ff0000".into()),
        };
        let next = apply_event(&schema, &ui, &params, &ok);
        assert_eq!(next.color("color"), Color::rgba(1.0, 0.0, 0.0, 1.0));

        let bad = UiEvent::Change {
            key: "color".into(),
            value: ParamValue::Enum("not a colour".into()),
        };
        assert_eq!(apply_event(&schema, &ui, &params, &bad), params);
    }

    #[test]
    fn test_button_click_merges_patch() {
        let schema = ParamSchema::new(vec![ParamSpec::real("angle", 0.0)]);
        let ui = UiNode::row(vec![UiNode::button(
            "vertical",
            "Vertical",
            ParamBag::new().with("angle", 90.0),
        )]);
        let event = UiEvent::Click {
            id: "vertical".into(),
        };
        let next = apply_event(&schema, &ui, &schema.defaults(), &event);
        assert_eq!(next.real("angle"), 90.0);
    }
}
