/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PatchError, PatchResult};
use crate::markup::{AttrValue, Child, Element, Markup};
use crate::style::{js_string, StyleObject, StyleSnapshot};
use crate::{ElementTarget, Geometry};

/// Component source text and the JSON blob feeding its `{data.*}` bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceModel {
    source_text: String,
    #[serde(default = "empty_object")]
    data_blob: String,
}

fn empty_object() -> String {
    "{}".to_string()
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*data\.([A-Za-z_$][\w$]*)\s*$").unwrap())
}

struct Splice {
    range: Range<usize>,
    text: String,
}

fn apply_splices(source: &str, mut splices: Vec<Splice>) -> String {
    splices.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    let mut out = source.to_string();
    for splice in splices {
        out.replace_range(splice.range, &splice.text);
    }
    out
}

impl SourceModel {
    pub fn new(source_text: impl Into<String>, data_blob: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            data_blob: data_blob.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source_text
    }

    pub fn data_text(&self) -> &str {
        &self.data_blob
    }

    pub fn set_source(&mut self, text: impl Into<String>) {
        self.source_text = text.into();
    }

    /// Stored as given; validity is only checked when the blob is read.
    pub fn set_data(&mut self, json: impl Into<String>) {
        self.data_blob = json.into();
    }

    /// The data blob as an object. Anything that is not a JSON object reads
    /// as empty.
    pub fn data(&self) -> Map<String, Value> {
        match serde_json::from_str::<Value>(&self.data_blob) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(err) => {
                debug!("data blob is not valid JSON, using an empty object: {}", err);
                Map::new()
            }
        }
    }

    pub fn markup(&self) -> crate::MarkupResult<Markup> {
        Markup::parse(&self.source_text)
    }

    /// Number of editable elements, zero when the source does not parse.
    pub fn element_count(&self) -> usize {
        self.markup().map(|m| m.editable_count()).unwrap_or(0)
    }

    pub fn resolves(&self, target: &ElementTarget) -> bool {
        self.markup().is_ok_and(|m| m.find(target).is_some())
    }

    /// Inline style object currently written on the element.
    pub fn element_style(&self, target: &ElementTarget) -> Option<StyleObject> {
        let markup = self.markup().ok()?;
        let element = markup.find(target)?;
        Some(read_style(&self.source_text, element))
    }

    /// Text of the element's source span.
    pub fn element_source(&self, target: &ElementTarget) -> Option<&str> {
        let markup = self.markup().ok()?;
        let span = markup.find(target)?.span.clone();
        self.source_text.get(span)
    }

    /// Value of a plain string attribute written on the element.
    pub fn element_attribute(&self, target: &ElementTarget, name: &str) -> Option<String> {
        let markup = self.markup().ok()?;
        markup.find(target)?.string_attribute(name).map(str::to_string)
    }

    /// Moves (and optionally resizes) an element by rewriting its inline
    /// style. Returns whether the source changed.
    pub fn patch_element_geometry(&mut self, target: &ElementTarget, geometry: Geometry) -> bool {
        match self.try_patch_geometry(target, geometry) {
            Ok(changed) => changed,
            Err(err) => {
                warn!("skipping geometry patch for {}: {}", target, err);
                false
            }
        }
    }

    /// Writes the snapshot's style, image source and text back into the
    /// source. Text bound to `{data.key}` goes to the data blob instead.
    ///
    /// Returns the full source text when anything changed.
    pub fn patch_element_content_and_style(
        &mut self,
        target: &ElementTarget,
        snapshot: &StyleSnapshot,
    ) -> Option<String> {
        match self.try_patch_content_and_style(target, snapshot) {
            Ok(true) => Some(self.source_text.clone()),
            Ok(false) => None,
            Err(err) => {
                warn!("skipping content patch for {}: {}", target, err);
                None
            }
        }
    }

    /// Removes the element, its children and its leading comment annotation.
    pub fn delete_element(&mut self, target: &ElementTarget) -> bool {
        match self.try_delete(target) {
            Ok(()) => true,
            Err(err) => {
                warn!("skipping delete of {}: {}", target, err);
                false
            }
        }
    }

    fn locate<'m>(&self, markup: &'m Markup, target: &ElementTarget) -> PatchResult<&'m Element> {
        markup
            .find(target)
            .ok_or_else(|| PatchError::TargetNotFound(target.clone()))
    }

    fn try_patch_geometry(&mut self, target: &ElementTarget, geometry: Geometry) -> PatchResult<bool> {
        let markup = self.markup()?;
        let element = self.locate(&markup, target)?;

        let mut snapshot = StyleSnapshot::default();
        snapshot.set_geometry(&geometry);
        let splices: Vec<Splice> = style_splice(&self.source_text, element, &snapshot)
            .into_iter()
            .collect();

        if splices.is_empty() {
            return Ok(false);
        }
        self.source_text = apply_splices(&self.source_text, splices);
        Ok(true)
    }

    fn try_patch_content_and_style(
        &mut self,
        target: &ElementTarget,
        snapshot: &StyleSnapshot,
    ) -> PatchResult<bool> {
        let markup = self.markup()?;
        let element = self.locate(&markup, target)?;
        let mut splices = Vec::new();

        splices.extend(style_splice(&self.source_text, element, snapshot));

        if let Some(src) = snapshot.image_src.as_deref().filter(|s| !s.is_empty()) {
            if element.tag == "img" {
                splices.extend(src_splice(element, src));
            } else {
                debug!("<{}> is not an image, ignoring image source", element.tag);
            }
        }

        let mut data_changed = false;
        if let Some(text) = snapshot.text_content.as_deref() {
            match bound_data_key(&self.source_text, element) {
                Some(key) => data_changed = self.write_data(&key, text),
                None => match text_splice(&self.source_text, element, text) {
                    Ok(splice) => splices.extend(splice),
                    Err(err) => debug!("text left untouched: {}", err),
                },
            }
        }

        let source_changed = !splices.is_empty();
        if source_changed {
            self.source_text = apply_splices(&self.source_text, splices);
        }
        Ok(source_changed || data_changed)
    }

    fn try_delete(&mut self, target: &ElementTarget) -> PatchResult<()> {
        let markup = self.markup()?;
        let element = self.locate(&markup, target)?;
        let range = widen_to_lines(&self.source_text, element.removal_span());
        self.source_text.replace_range(range, "");
        Ok(())
    }

    fn write_data(&mut self, key: &str, text: &str) -> bool {
        let mut data = self.data();
        if data.get(key).and_then(Value::as_str) == Some(text) {
            return false;
        }
        data.insert(key.to_string(), Value::String(text.to_string()));
        self.data_blob = Value::Object(data).to_string();
        true
    }
}

fn read_style(source: &str, element: &Element) -> StyleObject {
    match element.attribute("style").map(|a| &a.value) {
        Some(AttrValue::Expr { inner }) => StyleObject::parse(&source[inner.clone()]),
        Some(AttrValue::Str { value, .. }) => StyleObject::from_css(value),
        _ => StyleObject::default(),
    }
}

/// Rewrites (or adds) the element's `style` attribute with the snapshot's
/// style properties. `None` when the attribute would come out unchanged.
fn style_splice(source: &str, element: &Element, snapshot: &StyleSnapshot) -> Option<Splice> {
    let mut properties = snapshot.style_properties().peekable();
    properties.peek()?;

    let mut style = read_style(source, element);
    for (name, value) in properties {
        style.set(name, value);
    }
    let attribute = style.to_attribute();

    match element.attribute("style") {
        Some(existing) if source[existing.span.clone()] == attribute => None,
        Some(existing) => Some(Splice {
            range: existing.span.clone(),
            text: attribute,
        }),
        None => Some(Splice {
            range: element.name_end..element.name_end,
            text: format!(" {}", attribute),
        }),
    }
}

fn src_splice(element: &Element, src: &str) -> Option<Splice> {
    let attribute = if src.contains('"') {
        format!("src={{{}}}", js_string(src))
    } else {
        format!("src=\"{}\"", src)
    };
    match element.attribute("src") {
        Some(existing) if element.string_attribute("src") == Some(src) => {
            debug!("image source unchanged at {:?}", existing.span);
            None
        }
        Some(existing) => Some(Splice {
            range: existing.span.clone(),
            text: attribute,
        }),
        None => Some(Splice {
            range: element.name_end..element.name_end,
            text: format!(" {}", attribute),
        }),
    }
}

/// The data key when the element's only content is a `{data.key}` binding.
fn bound_data_key(source: &str, element: &Element) -> Option<String> {
    let mut meaningful = element.children.iter().filter(|child| match child {
        Child::Text(range) => !source[range.clone()].trim().is_empty(),
        Child::Comment(_) => false,
        _ => true,
    });
    let only = meaningful.next()?;
    if meaningful.next().is_some() {
        return None;
    }
    match only {
        Child::Expr(inner) => placeholder_pattern()
            .captures(&source[inner.clone()])
            .map(|caps| caps[1].to_string()),
        _ => None,
    }
}

/// Replaces plain-text content. Elements with nested markup or expressions
/// are left alone.
fn text_splice(source: &str, element: &Element, text: &str) -> PatchResult<Option<Splice>> {
    let unsupported = |what| PatchError::Unsupported {
        tag: element.tag.clone(),
        what,
    };
    let content = element
        .content
        .clone()
        .ok_or_else(|| unsupported("text content"))?;
    if element.children.iter().any(|c| !matches!(c, Child::Text(_))) {
        return Err(unsupported("text over nested content"));
    }

    let current = &source[content.clone()];
    if current.trim() == text.trim() {
        return Ok(None);
    }

    let escaped = if text.contains(['{', '}', '<', '>']) {
        format!("{{{}}}", js_string(text))
    } else {
        text.to_string()
    };
    // Keep the surrounding whitespace so multi-line layouts stay intact.
    let leading = &current[..current.len() - current.trim_start().len()];
    let trailing = &current[current.trim_end().len()..];
    Ok(Some(Splice {
        range: content,
        text: format!("{}{}{}", leading, escaped, trailing),
    }))
}

/// Grows a removal range to whole lines when it is alone on them.
fn widen_to_lines(source: &str, range: Range<usize>) -> Range<usize> {
    let line_start = source[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[range.end..]
        .find('\n')
        .map_or(source.len(), |i| range.end + i + 1);
    let before_blank = source[line_start..range.start].trim().is_empty();
    let after_blank = source[range.end..line_end].trim().is_empty();
    if before_blank && after_blank {
        line_start..line_end
    } else {
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first() -> ElementTarget {
        ElementTarget::Index(0)
    }

    #[test]
    fn geometry_patch_preserves_other_keys() {
        let mut model = SourceModel::new("<div style={{left:'10px', top:'20px'}}>Hi</div>", "{}");
        assert!(model.patch_element_geometry(&first(), Geometry::at(50.0, 20.0)));
        assert_eq!(model.source(), "<div style={{left: '50px', top: '20px'}}>Hi</div>");
    }

    #[test]
    fn geometry_patch_round_trips_and_is_idempotent() {
        let mut model = SourceModel::new(
            "const A = () => (\n  <section>\n    <div style={{color: 'red', left: '1px'}}>a</div>\n  </section>\n);",
            "{}",
        );
        let target = ElementTarget::Index(1);
        model.patch_element_geometry(&target, Geometry::sized(12.0, 34.5, 100.0, 40.0));
        let style = model.element_style(&target).unwrap();
        assert_eq!(style.get("left").as_deref(), Some("12px"));
        assert_eq!(style.get("top").as_deref(), Some("34.5px"));
        assert_eq!(style.get("width").as_deref(), Some("100px"));
        assert_eq!(style.get("color").as_deref(), Some("red"));

        let once = model.source().to_string();
        assert!(!model.patch_element_geometry(&target, Geometry::sized(12.0, 34.5, 100.0, 40.0)));
        assert_eq!(model.source(), once);
    }

    #[test]
    fn geometry_patch_synthesizes_style_attribute() {
        let mut model = SourceModel::new("<div className=\"box\">Hi</div>", "{}");
        model.patch_element_geometry(&first(), Geometry::at(5.0, 6.0));
        assert_eq!(
            model.source(),
            "<div style={{left: '5px', top: '6px'}} className=\"box\">Hi</div>"
        );
    }

    #[test]
    fn geometry_patch_ignores_commented_markup() {
        let mut model = SourceModel::new(
            "// <div style={{left: '0px'}}>old</div>\nconst A = () => <div>new</div>;",
            "{}",
        );
        model.patch_element_geometry(&first(), Geometry::at(1.0, 2.0));
        assert_eq!(
            model.source(),
            "// <div style={{left: '0px'}}>old</div>\nconst A = () => <div style={{left: '1px', top: '2px'}}>new</div>;"
        );
    }

    #[test]
    fn unknown_targets_are_skipped() {
        let mut model = SourceModel::new("<div>Hi</div>", "{}");
        assert!(!model.patch_element_geometry(&ElementTarget::Index(4), Geometry::at(1.0, 1.0)));
        assert!(!model.delete_element(&ElementTarget::Key("nope".into())));
        assert_eq!(model.source(), "<div>Hi</div>");
    }

    #[test]
    fn malformed_source_is_skipped() {
        let mut model = SourceModel::new("<div><span></div>", "{}");
        let snapshot = StyleSnapshot {
            text_content: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(model.patch_element_content_and_style(&first(), &snapshot), None);
        assert_eq!(model.source(), "<div><span></div>");
    }

    #[test]
    fn placeholder_text_updates_the_data_blob() {
        let mut model = SourceModel::new("<div>{data.title}</div>", r#"{"title":"Hello"}"#);
        let snapshot = StyleSnapshot {
            text_content: Some("World".into()),
            ..Default::default()
        };
        let updated = model.patch_element_content_and_style(&first(), &snapshot);
        assert_eq!(updated.as_deref(), Some("<div>{data.title}</div>"));
        assert_eq!(model.source(), "<div>{data.title}</div>");
        assert_eq!(model.data_text(), r#"{"title":"World"}"#);
    }

    #[test]
    fn literal_text_is_replaced() {
        let mut model = SourceModel::new("<p>\n  Old text\n</p>", "{}");
        let snapshot = StyleSnapshot {
            text_content: Some("New <b> text".into()),
            ..Default::default()
        };
        model.patch_element_content_and_style(&first(), &snapshot);
        assert_eq!(model.source(), "<p>\n  {'New <b> text'}\n</p>");
    }

    #[test]
    fn unchanged_snapshot_reports_no_update() {
        let mut model = SourceModel::new("<p style={{color: 'red'}}>Same</p>", "{}");
        let snapshot = StyleSnapshot {
            color: Some("red".into()),
            text_content: Some("Same".into()),
            ..Default::default()
        };
        assert_eq!(model.patch_element_content_and_style(&first(), &snapshot), None);
    }

    #[test]
    fn image_sources_are_rewritten_or_inserted() {
        let mut model = SourceModel::new("<div><img src=\"old.png\" /><img alt=\"x\" /></div>", "{}");
        let snapshot = StyleSnapshot {
            image_src: Some("new.png".into()),
            ..Default::default()
        };
        model.patch_element_content_and_style(&ElementTarget::Index(1), &snapshot);
        model.patch_element_content_and_style(&ElementTarget::Index(2), &snapshot);
        assert_eq!(
            model.source(),
            "<div><img src=\"new.png\" /><img src=\"new.png\" alt=\"x\" /></div>"
        );
    }

    #[test]
    fn image_source_on_non_image_is_ignored() {
        let mut model = SourceModel::new("<div>x</div>", "{}");
        let snapshot = StyleSnapshot {
            image_src: Some("a.png".into()),
            ..Default::default()
        };
        assert_eq!(model.patch_element_content_and_style(&first(), &snapshot), None);
    }

    #[test]
    fn keyed_targets_resolve_by_attribute() {
        let mut model = SourceModel::new(
            "<div><p data-shape-key=\"a\">A</p><p data-shape-key=\"b\">B</p></div>",
            "{}",
        );
        let snapshot = StyleSnapshot {
            text_content: Some("Bee".into()),
            ..Default::default()
        };
        model.patch_element_content_and_style(&ElementTarget::Key("b".into()), &snapshot);
        assert_eq!(
            model.source(),
            "<div><p data-shape-key=\"a\">A</p><p data-shape-key=\"b\">Bee</p></div>"
        );
    }

    #[test]
    fn delete_removes_only_the_target_span() {
        let source = "const A = () => (\n  <div>\n    <p>zero</p>\n    {/* one */}\n    <p>one</p>\n    <p>two</p>\n  </div>\n);\n";
        let mut model = SourceModel::new(source, "{}");
        assert_eq!(model.element_count(), 4);

        assert!(model.delete_element(&ElementTarget::Index(2)));
        assert_eq!(model.element_count(), 3);
        assert_eq!(
            model.source(),
            "const A = () => (\n  <div>\n    <p>zero</p>\n    <p>two</p>\n  </div>\n);\n"
        );
    }

    #[test]
    fn delete_every_position_keeps_the_others() {
        let source = "<ul><li>a</li><li>b</li><li>c</li><li>d</li></ul>";
        let n = SourceModel::new(source, "{}").element_count();
        assert_eq!(n, 5);
        for k in 1..n {
            let mut model = SourceModel::new(source, "{}");
            assert!(model.delete_element(&ElementTarget::Index(k)));
            assert_eq!(model.element_count(), n - 1);

            let remaining: Vec<String> = (1..n - 1)
                .filter_map(|i| model.element_source(&ElementTarget::Index(i)).map(String::from))
                .collect();
            let expected: Vec<String> = ["a", "b", "c", "d"]
                .iter()
                .enumerate()
                .filter(|(i, _)| *i + 1 != k)
                .map(|(_, t)| format!("<li>{}</li>", t))
                .collect();
            assert_eq!(remaining, expected);
        }
    }

    #[test]
    fn delete_covers_every_sibling_including_the_first() {
        let items = ["<p>a</p>", "<p>b</p>", "<p>c</p>"];
        let source = format!("const a = {};\nconst b = {};\nconst c = {};\n", items[0], items[1], items[2]);
        let n = SourceModel::new(source.as_str(), "{}").element_count();
        assert_eq!(n, items.len());
        for k in 0..n {
            let mut model = SourceModel::new(source.as_str(), "{}");
            assert!(model.delete_element(&ElementTarget::Index(k)));
            assert_eq!(model.element_count(), n - 1);
            assert!(!model.source().contains(items[k]));
            for (i, item) in items.iter().enumerate().filter(|(i, _)| *i != k) {
                assert!(model.source().contains(item), "item {} lost when deleting {}", i, k);
            }
        }
    }

    #[test]
    fn deleting_the_root_takes_its_subtree() {
        let mut model = SourceModel::new("const A = () => <ul><li>a</li><li>b</li></ul>;", "{}");
        assert!(model.delete_element(&ElementTarget::Index(0)));
        assert_eq!(model.element_count(), 0);
        assert!(!model.source().contains("<li>"));
    }

    #[test]
    fn reads_string_attributes() {
        let model = SourceModel::new("<div className=\"box p-4\" id={x}>Hi</div>", "{}");
        assert_eq!(model.element_attribute(&first(), "className").as_deref(), Some("box p-4"));
        assert_eq!(model.element_attribute(&first(), "id"), None);
    }

    #[test]
    fn invalid_data_reads_as_empty() {
        let mut model = SourceModel::new("<div>{data.title}</div>", "{not json");
        assert!(model.data().is_empty());

        let snapshot = StyleSnapshot {
            text_content: Some("Fresh".into()),
            ..Default::default()
        };
        model.patch_element_content_and_style(&first(), &snapshot);
        assert_eq!(model.data_text(), r#"{"title":"Fresh"}"#);
    }
}
