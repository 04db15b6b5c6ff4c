/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/


use std::fmt::Write;

use lectern_core::{ElementStyles, Page, ELEMENT_ID_ATTR, SHAPE_KEY_ATTR};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prepare;

pub use prepare::{annotate_elements, infer_root_component, strip_module_syntax};

const SURFACE_SCRIPT: &str = include_str!("surface.js");

const SURFACE_STYLES: &str = "html,body{margin:0;min-height:100vh;background:#ffffff;}\
body.lectern-editing .lectern-editable{cursor:move;}\
body.lectern-editing .lectern-editable:hover{outline:1px dashed #60a5fa;outline-offset:2px;}\
.lectern-selected{outline:2px solid #2563eb !important;outline-offset:2px;}\
#lectern-handle{position:fixed;display:none;width:12px;height:12px;background:#2563eb;border:2px solid #ffffff;border-radius:2px;cursor:nwse-resize;z-index:2147483647;}\
#lectern-error{position:fixed;inset:16px;overflow:auto;padding:16px;background:#fef2f2;border:1px solid #fca5a5;border-radius:8px;color:#991b1b;font:13px/1.5 ui-monospace,monospace;z-index:2147483646;}\
#lectern-error pre{white-space:pre-wrap;margin:8px 0 0;color:#7f1d1d;}";

/// Hooks made available to generated components without an import.
const PRELUDE: &str = "const { useState, useEffect, useMemo, useRef, useCallback, useReducer, Fragment } = React;\n";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to serialize document payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to assemble document: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Invalid component name: {0}")]
    InvalidComponentName(String),
}

fn default_tailwind_url() -> String {
    "https://cdn.tailwindcss.com".to_string()
}

fn default_react_url() -> String {
    "https://unpkg.com/react@18/umd/react.development.js".to_string()
}

fn default_react_dom_url() -> String {
    "https://unpkg.com/react-dom@18/umd/react-dom.development.js".to_string()
}

fn default_babel_url() -> String {
    "https://unpkg.com/@babel/standalone/babel.min.js".to_string()
}

fn default_fallback_component() -> String {
    "App".to_string()
}

fn default_retag_delay_ms() -> u64 {
    500
}

fn default_sandbox() -> String {
    "allow-scripts".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    #[serde(default = "default_tailwind_url")]
    pub tailwind_url: String,
    #[serde(default = "default_react_url")]
    pub react_url: String,
    #[serde(default = "default_react_dom_url")]
    pub react_dom_url: String,
    #[serde(default = "default_babel_url")]
    pub babel_url: String,
    /// Mounted when no component name can be inferred from the source.
    #[serde(default = "default_fallback_component")]
    pub fallback_component: String,
    /// Delay before the surface retries tagging when the first pass found nothing.
    #[serde(default = "default_retag_delay_ms")]
    pub retag_delay_ms: u64,
    #[serde(default = "default_sandbox")]
    pub sandbox: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tailwind_url: default_tailwind_url(),
            react_url: default_react_url(),
            react_dom_url: default_react_dom_url(),
            babel_url: default_babel_url(),
            fallback_component: default_fallback_component(),
            retag_delay_ms: default_retag_delay_ms(),
            sandbox: default_sandbox(),
        }
    }
}

/// A standalone document ready to be set as an iframe's `srcdoc`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub html: String,
    pub root_component: String,
    /// Number of editable elements tagged with a positional id. Zero when the
    /// source could not be parsed and was embedded as-is.
    pub element_count: usize,
    pub sandbox: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SurfaceSettings<'a> {
    element_id_attribute: &'a str,
    shape_key_attribute: &'a str,
    retag_delay_ms: u64,
}

pub struct Renderer {
    config: RenderConfig,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn render_page(&self, page: &Page) -> Result<RenderedDocument, RenderError> {
        self.render(page.model.source(), &page.model.data(), &page.element_styles)
    }

    /// Builds the surface document for `source`, mounting its root component
    /// with `data` and `element_styles` as props.
    pub fn render(
        &self,
        source: &str,
        data: &Map<String, Value>,
        element_styles: &ElementStyles,
    ) -> Result<RenderedDocument, RenderError> {
        let root = infer_root_component(source, &self.config.fallback_component);
        if !is_identifier(&root) {
            return Err(RenderError::InvalidComponentName(root));
        }

        let stripped = strip_module_syntax(source);
        let (code, element_count) = match annotate_elements(&stripped) {
            Ok(annotated) => annotated,
            Err(e) => {
                warn!("Embedding unannotated source: {}", e);
                (stripped, 0)
            }
        };

        let settings = SurfaceSettings {
            element_id_attribute: ELEMENT_ID_ATTR,
            shape_key_attribute: SHAPE_KEY_ATTR,
            retag_delay_ms: self.config.retag_delay_ms,
        };

        let mut html = String::with_capacity(code.len() + SURFACE_SCRIPT.len() + 2048);
        html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
        write!(html, "<script src=\"{}\"></script>", escape_attr(&self.config.tailwind_url))?;
        write!(html, "<script crossorigin src=\"{}\"></script>", escape_attr(&self.config.react_url))?;
        write!(html, "<script crossorigin src=\"{}\"></script>", escape_attr(&self.config.react_dom_url))?;
        write!(html, "<script src=\"{}\"></script>", escape_attr(&self.config.babel_url))?;
        write!(html, "<style>{}</style>", SURFACE_STYLES)?;
        html.push_str("</head><body><div id=\"root\"></div>\n");

        write!(html, "<script>window.__LECTERN__ = {};</script>\n", script_json(&settings)?)?;
        write!(html, "<script>\n{}</script>\n", SURFACE_SCRIPT)?;

        let program = format!(
            "{}{}\nreturn typeof {root} !== 'undefined' ? {root} : null;\n",
            PRELUDE,
            code,
            root = root
        );
        html.push_str("<script>\n(function () {\n");
        write!(html, "  var program = {};\n", script_json(&program)?)?;
        write!(html, "  var data = {};\n", script_json(data)?)?;
        write!(html, "  var elementStyles = {};\n", script_json(element_styles)?)?;
        write!(html, "  var rootName = {};\n", script_json(&root)?)?;
        html.push_str(BOOTSTRAP);
        html.push_str("})();\n</script>\n</body></html>\n");

        debug!("Rendered {} ({} editable elements, {} bytes)", root, element_count, html.len());

        Ok(RenderedDocument {
            html,
            root_component: root,
            element_count,
            sandbox: self.config.sandbox.clone(),
        })
    }
}

const BOOTSTRAP: &str = "  try {
    var compiled = Babel.transform(program, {
      presets: ['react'],
      parserOpts: { allowReturnOutsideFunction: true },
    }).code;
    var Root = new Function('React', 'ReactDOM', compiled)(React, ReactDOM);
    if (typeof Root !== 'function' && !(Root && Root.$$typeof)) {
      throw new Error('Component ' + rootName + ' is not defined');
    }
    ReactDOM.createRoot(document.getElementById('root')).render(
      React.createElement(Root, { data: data, elementStyles: elementStyles })
    );
    window.__lecternSurface.mounted(elementStyles);
  } catch (e) {
    window.__lecternSurface.showError(e && e.message ? e.message : String(e), e && e.stack);
  }
";

/// Serializes `value` for inline embedding in a `<script>` block.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    let json = serde_json::to_string(value)?;
    Ok(escape_script(&json))
}

/// Keeps embedded JSON from closing the surrounding script element or
/// breaking older JavaScript parsers on line separators.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
        .replace("<!--", "<\\!--")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::StyleRecord;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    const QUIZ: &str = "import React from 'react';\n\nexport default function Quiz({ data }) {\n  return <div className=\"p-4\"><h2>{data.title}</h2><p>Pick one</p></div>;\n}\n";

    fn empty() -> Map<String, Value> {
        Map::new()
    }

    #[test]
    fn renders_standalone_document() {
        let doc = Renderer::default().render(QUIZ, &empty(), &ElementStyles::new()).unwrap();
        assert_eq!(doc.root_component, "Quiz");
        assert_eq!(doc.element_count, 3);
        assert_eq!(doc.sandbox, "allow-scripts");
        assert!(doc.html.starts_with("<!DOCTYPE html>"));
        assert!(doc.html.contains("https://cdn.tailwindcss.com"));
        assert!(doc.html.contains("@babel/standalone"));
        assert!(doc.html.contains("react-dom@18"));
        assert!(doc.html.contains("window.__lecternSurface.mounted(elementStyles)"));
        assert!(!doc.html.contains("import React"));
        assert!(doc.html.contains("return typeof Quiz !== 'undefined' ? Quiz : null;"));
    }

    #[test]
    fn annotates_positional_ids() {
        let doc = Renderer::default().render(QUIZ, &empty(), &ElementStyles::new()).unwrap();
        assert!(doc.html.contains(r#"<h2 data-element-id=\"1\">"#));
        assert!(doc.html.contains(r#"<p data-element-id=\"2\">"#));
    }

    #[test]
    fn closing_script_tags_are_escaped() {
        let mut data = Map::new();
        data.insert("title".into(), Value::String("</script><script>alert(1)</script>".into()));
        let doc = Renderer::default().render(QUIZ, &data, &ElementStyles::new()).unwrap();
        assert!(doc.html.contains(r#"<\/script><script>alert(1)<\/script>"#));
        assert_eq!(doc.html.matches("</script>").count(), 7);
    }

    #[test]
    fn unparseable_source_is_embedded_unannotated() {
        let source = "function App() {\n  return <div>\n}\n";
        let doc = Renderer::default().render(source, &empty(), &ElementStyles::new()).unwrap();
        assert_eq!(doc.root_component, "App");
        assert_eq!(doc.element_count, 0);
        assert!(!doc.html.contains("data-element-id=\\\""));
    }

    #[test]
    fn embeds_element_styles_and_config() {
        let styles = BTreeMap::from([(
            "title".to_string(),
            StyleRecord {
                class_name: Some("text-5xl".into()),
                style: BTreeMap::new(),
            },
        )]);
        let config = RenderConfig {
            retag_delay_ms: 750,
            ..RenderConfig::default()
        };
        let doc = Renderer::new(config).render(QUIZ, &empty(), &styles).unwrap();
        assert!(doc.html.contains(r#"var elementStyles = {"title":{"className":"text-5xl","style":{}}};"#));
        assert!(doc.html.contains(r#""retagDelayMs":750"#));
        assert!(doc.html.contains(r#""shapeKeyAttribute":"data-shape-key""#));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: RenderConfig = serde_json::from_str(r#"{"fallbackComponent":"Lesson"}"#).unwrap();
        assert_eq!(config.fallback_component, "Lesson");
        assert_eq!(config.retag_delay_ms, 500);
        assert_eq!(config.tailwind_url, default_tailwind_url());
    }

    #[test]
    fn rejects_fallback_that_is_not_an_identifier() {
        let config = RenderConfig {
            fallback_component: "not a name".into(),
            ..RenderConfig::default()
        };
        let err = Renderer::new(config).render("<div />", &empty(), &ElementStyles::new());
        assert!(matches!(err, Err(RenderError::InvalidComponentName(_))));
    }

    #[test]
    fn renders_pages() {
        let page = Page::from_template(1, "Intro");
        let doc = Renderer::default().render_page(&page).unwrap();
        assert_eq!(doc.root_component, "Slide");
        assert_eq!(doc.element_count, 3);
        assert!(doc.html.contains(r#""title":"New slide""#));
    }
}
