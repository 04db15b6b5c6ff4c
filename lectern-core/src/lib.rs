/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/


use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod markup;
pub mod source;
pub mod style;

pub use error::{MarkupError, MarkupResult, PatchError, PatchResult};
pub use markup::{Markup, ELEMENT_ID_ATTR, SHAPE_KEY_ATTR};
pub use source::SourceModel;
pub use style::{StyleField, StyleObject, StyleSnapshot};

/// Source used for pages created from scratch.
pub const DEFAULT_TEMPLATE: &str = r#"export default function Slide({ data, elementStyles }) {
  return (
    <div className="relative w-[960px] h-[540px] bg-white overflow-hidden">
      {/* Title */}
      <h1 data-shape-key="title" className="text-4xl font-bold" style={{position: 'absolute', left: '48px', top: '40px'}}>{data.title}</h1>
      {/* Body */}
      <p data-shape-key="body" className="text-xl text-slate-600" style={{position: 'absolute', left: '48px', top: '120px', width: '640px'}}>{data.body}</p>
    </div>
  );
}
"#;

pub const DEFAULT_DATA: &str = r#"{"title":"New slide","body":"Click an element to edit it."}"#;

/// Per-key style overrides handed to the component as `elementStyles`.
pub type ElementStyles = BTreeMap<String, StyleRecord>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

impl StyleRecord {
    /// Applies one property. `className` targets the class list, everything
    /// else the inline style.
    pub fn apply(&mut self, property: &str, value: &str) {
        if property == "className" {
            self.class_name = Some(value.to_string());
        } else if value.is_empty() {
            self.style.remove(property);
        } else {
            self.style.insert(property.to_string(), value.to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: u32,
    pub name: String,
    #[serde(flatten)]
    pub model: SourceModel,
    #[serde(default)]
    pub element_styles: ElementStyles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_id: Option<String>,
}

impl Page {
    pub fn new(id: u32, name: impl Into<String>, source: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            model: SourceModel::new(source, data),
            element_styles: ElementStyles::new(),
            component_id: None,
            slide_id: None,
        }
    }

    pub fn from_template(id: u32, name: impl Into<String>) -> Self {
        Self::new(id, name, DEFAULT_TEMPLATE, DEFAULT_DATA)
    }
}

/// Identifies an element either by its position among the editable elements
/// of the source or by its `data-shape-key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementTarget {
    #[serde(rename = "elementId")]
    Index(usize),
    #[serde(rename = "shapeKey")]
    Key(String),
}

impl fmt::Display for ElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementTarget::Index(n) => write!(f, "element #{}", n),
            ElementTarget::Key(key) => write!(f, "element '{}'", key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl Geometry {
    pub fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            width: None,
            height: None,
        }
    }

    pub fn sized(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width: Some(width),
            height: Some(height),
        }
    }
}
