/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

//! Messages exchanged with the rendering surface over `postMessage`.

use lectern_core::{ElementTarget, Geometry, StyleSnapshot};
use serde::{Deserialize, Serialize};

/// Sent by the surface to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SurfaceMessage {
    ModeConfirmed {
        edit_mode: bool,
    },
    ElementSelected {
        #[serde(flatten)]
        target: ElementTarget,
        #[serde(default)]
        style: StyleSnapshot,
    },
    ElementMoved {
        #[serde(flatten)]
        target: ElementTarget,
        left: f64,
        top: f64,
    },
    ElementResized {
        #[serde(flatten)]
        target: ElementTarget,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
    SurfaceReady,
    RenderError {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
}

impl SurfaceMessage {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Target and new geometry for drag and resize reports.
    pub fn geometry(&self) -> Option<(&ElementTarget, Geometry)> {
        match self {
            SurfaceMessage::ElementMoved { target, left, top } => Some((target, Geometry::at(*left, *top))),
            SurfaceMessage::ElementResized {
                target,
                left,
                top,
                width,
                height,
            } => Some((target, Geometry::sized(*left, *top, *width, *height))),
            _ => None,
        }
    }
}

/// Sent by the host to the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum HostMessage {
    SetMode {
        edit_mode: bool,
    },
    ApplyStyles {
        updates: Vec<StyleUpdate>,
    },
    PreviewElement {
        #[serde(flatten)]
        target: ElementTarget,
        style: StyleSnapshot,
    },
    RemoveElement {
        #[serde(flatten)]
        target: ElementTarget,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleUpdate {
    pub element_key: String,
    pub property: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_surface_reports() {
        let moved = SurfaceMessage::from_value(json!({
            "type": "element-moved", "elementId": 2, "left": 50, "top": 20.5
        }))
        .unwrap();
        assert_eq!(
            moved,
            SurfaceMessage::ElementMoved {
                target: ElementTarget::Index(2),
                left: 50.0,
                top: 20.5,
            }
        );
        assert_eq!(moved.geometry().map(|(_, g)| g), Some(Geometry::at(50.0, 20.5)));

        let selected = SurfaceMessage::from_value(json!({
            "type": "element-selected",
            "shapeKey": "title",
            "style": { "left": "48px", "fontSize": "36px", "textContent": "Hello" }
        }))
        .unwrap();
        match selected {
            SurfaceMessage::ElementSelected { target, style } => {
                assert_eq!(target, ElementTarget::Key("title".into()));
                assert_eq!(style.font_size.as_deref(), Some("36px"));
                assert_eq!(style.text_content.as_deref(), Some("Hello"));
            }
            other => panic!("unexpected message {:?}", other),
        }

        let ready = SurfaceMessage::from_value(json!({ "type": "surface-ready" })).unwrap();
        assert_eq!(ready, SurfaceMessage::SurfaceReady);
    }

    #[test]
    fn rejects_unknown_kinds() {
        assert!(SurfaceMessage::from_value(json!({ "type": "hello" })).is_err());
        assert!(SurfaceMessage::from_value(json!({ "type": "element-moved", "left": 1, "top": 2 })).is_err());
    }

    #[test]
    fn host_messages_use_wire_names() {
        let mode = serde_json::to_value(HostMessage::SetMode { edit_mode: true }).unwrap();
        assert_eq!(mode, json!({ "type": "set-mode", "editMode": true }));

        let remove = serde_json::to_value(HostMessage::RemoveElement {
            target: ElementTarget::Key("body".into()),
        })
        .unwrap();
        assert_eq!(remove, json!({ "type": "remove-element", "shapeKey": "body" }));

        let styles = serde_json::to_value(HostMessage::ApplyStyles {
            updates: vec![StyleUpdate {
                element_key: "title".into(),
                property: "color".into(),
                value: "red".into(),
            }],
        })
        .unwrap();
        assert_eq!(
            styles,
            json!({
                "type": "apply-styles",
                "updates": [{ "elementKey": "title", "property": "color", "value": "red" }]
            })
        );
    }
}
