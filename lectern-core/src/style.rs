/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use serde::{Deserialize, Serialize};

/// One entry of an inline style object literal.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleEntry {
    Prop {
        /// Key exactly as written (`left`, `'z-index'`).
        key: String,
        /// Unquoted property name used for lookups.
        name: String,
        /// JavaScript expression text of the value.
        value: String,
    },
    Spread(String),
}

/// The object literal of a JSX `style={{...}}` attribute.
///
/// Entry order and unknown values are preserved; only the properties that
/// are explicitly set get rewritten.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleObject {
    entries: Vec<StyleEntry>,
}

impl StyleObject {
    /// Parses the expression inside the attribute braces. Anything that is not
    /// an object literal is kept as a spread so its keys still apply.
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        let Some(body) = expr.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            if expr.is_empty() {
                return Self::default();
            }
            return Self {
                entries: vec![StyleEntry::Spread(expr.to_string())],
            };
        };

        let entries = split_top_level(body, b',')
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| {
                if let Some(spread) = entry.strip_prefix("...") {
                    return StyleEntry::Spread(spread.trim().to_string());
                }
                match split_top_level(entry, b':').split_first() {
                    Some((key, rest)) if !rest.is_empty() => {
                        let key = key.trim();
                        StyleEntry::Prop {
                            key: key.to_string(),
                            name: unquote(key).unwrap_or(key).to_string(),
                            value: rest.join(":").trim().to_string(),
                        }
                    }
                    _ => StyleEntry::Prop {
                        key: entry.to_string(),
                        name: entry.to_string(),
                        value: entry.to_string(),
                    },
                }
            })
            .collect();

        Self { entries }
    }

    /// Reads a CSS declaration string (`left: 10px; background-color: red`).
    pub fn from_css(css: &str) -> Self {
        let mut style = Self::default();
        for declaration in css.split(';') {
            if let Some((name, value)) = declaration.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    style.set(&camel_case(name), value.trim());
                }
            }
        }
        style
    }

    pub fn entries(&self) -> &[StyleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of `name` when it is a string or number literal.
    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.iter().rev().find_map(|entry| match entry {
            StyleEntry::Prop { name: n, value, .. } if n == name => literal_value(value),
            _ => None,
        })
    }

    /// Sets `name` to the string literal `value`, replacing an existing entry
    /// in place or appending a new one.
    pub fn set(&mut self, name: &str, value: &str) {
        let literal = js_string(value);
        let existing = self.entries.iter_mut().rev().find_map(|entry| match entry {
            StyleEntry::Prop { name: n, value, .. } if n == name => Some(value),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = literal,
            None => self.entries.push(StyleEntry::Prop {
                key: property_key(name),
                name: name.to_string(),
                value: literal,
            }),
        }
    }

    /// The object literal, e.g. `{left: '50px', top: '20px'}`.
    pub fn to_expression(&self) -> String {
        let body: Vec<String> = self
            .entries
            .iter()
            .map(|entry| match entry {
                StyleEntry::Prop { key, value, .. } => format!("{}: {}", key, value),
                StyleEntry::Spread(expr) => format!("...{}", expr),
            })
            .collect();
        format!("{{{}}}", body.join(", "))
    }

    pub fn to_attribute(&self) -> String {
        format!("style={{{}}}", self.to_expression())
    }
}

/// Editable fields of a selected element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleField {
    Left,
    Top,
    Width,
    Height,
    Color,
    BackgroundColor,
    FontSize,
    FontFamily,
    FontWeight,
    TextAlign,
    TextContent,
    ImageSrc,
}

impl StyleField {
    pub const ALL: [StyleField; 12] = [
        StyleField::Left,
        StyleField::Top,
        StyleField::Width,
        StyleField::Height,
        StyleField::Color,
        StyleField::BackgroundColor,
        StyleField::FontSize,
        StyleField::FontFamily,
        StyleField::FontWeight,
        StyleField::TextAlign,
        StyleField::TextContent,
        StyleField::ImageSrc,
    ];

    /// The inline style property this field maps to. Content fields have none.
    pub fn style_property(self) -> Option<&'static str> {
        match self {
            StyleField::Left => Some("left"),
            StyleField::Top => Some("top"),
            StyleField::Width => Some("width"),
            StyleField::Height => Some("height"),
            StyleField::Color => Some("color"),
            StyleField::BackgroundColor => Some("backgroundColor"),
            StyleField::FontSize => Some("fontSize"),
            StyleField::FontFamily => Some("fontFamily"),
            StyleField::FontWeight => Some("fontWeight"),
            StyleField::TextAlign => Some("textAlign"),
            StyleField::TextContent | StyleField::ImageSrc => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StyleField::Left => "Left",
            StyleField::Top => "Top",
            StyleField::Width => "Width",
            StyleField::Height => "Height",
            StyleField::Color => "Color",
            StyleField::BackgroundColor => "Background",
            StyleField::FontSize => "Font size",
            StyleField::FontFamily => "Font family",
            StyleField::FontWeight => "Font weight",
            StyleField::TextAlign => "Text align",
            StyleField::TextContent => "Text",
            StyleField::ImageSrc => "Image source",
        }
    }
}

/// Style and content of one element as the user sees it in the inspector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
}

impl StyleSnapshot {
    fn slot(&self, field: StyleField) -> &Option<String> {
        match field {
            StyleField::Left => &self.left,
            StyleField::Top => &self.top,
            StyleField::Width => &self.width,
            StyleField::Height => &self.height,
            StyleField::Color => &self.color,
            StyleField::BackgroundColor => &self.background_color,
            StyleField::FontSize => &self.font_size,
            StyleField::FontFamily => &self.font_family,
            StyleField::FontWeight => &self.font_weight,
            StyleField::TextAlign => &self.text_align,
            StyleField::TextContent => &self.text_content,
            StyleField::ImageSrc => &self.image_src,
        }
    }

    fn slot_mut(&mut self, field: StyleField) -> &mut Option<String> {
        match field {
            StyleField::Left => &mut self.left,
            StyleField::Top => &mut self.top,
            StyleField::Width => &mut self.width,
            StyleField::Height => &mut self.height,
            StyleField::Color => &mut self.color,
            StyleField::BackgroundColor => &mut self.background_color,
            StyleField::FontSize => &mut self.font_size,
            StyleField::FontFamily => &mut self.font_family,
            StyleField::FontWeight => &mut self.font_weight,
            StyleField::TextAlign => &mut self.text_align,
            StyleField::TextContent => &mut self.text_content,
            StyleField::ImageSrc => &mut self.image_src,
        }
    }

    pub fn get(&self, field: StyleField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: StyleField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    /// Non-empty style properties, keyed by inline style name.
    pub fn style_properties(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        StyleField::ALL.into_iter().filter_map(move |field| {
            let property = field.style_property()?;
            let value = self.get(field)?;
            (!value.trim().is_empty()).then_some((property, value))
        })
    }

    pub fn set_geometry(&mut self, geometry: &crate::Geometry) {
        self.left = Some(format_px(geometry.left));
        self.top = Some(format_px(geometry.top));
        if let Some(width) = geometry.width {
            self.width = Some(format_px(width));
        }
        if let Some(height) = geometry.height {
            self.height = Some(format_px(height));
        }
    }
}

/// Shortest decimal form of `value` with a `px` suffix.
pub fn format_px(value: f64) -> String {
    format!("{}px", value)
}

/// Single-quoted JavaScript string literal.
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Contents of a plain string literal, if `s` is one.
pub fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    let quote = s.chars().next()?;
    if !matches!(quote, '\'' | '"' | '`') || s.len() < 2 || !s.ends_with(quote) {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    if quote == '`' && inner.contains("${") {
        return None;
    }
    Some(inner)
}

fn literal_value(value: &str) -> Option<String> {
    if let Some(inner) = unquote(value) {
        return Some(inner.replace("\\'", "'").replace("\\\"", "\"").replace("\\\\", "\\"));
    }
    value.parse::<f64>().ok().map(|_| value.to_string())
}

fn property_key(name: &str) -> String {
    let is_ident = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        name.to_string()
    } else {
        js_string(name)
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits on `sep` where it is not nested in brackets, strings or templates.
pub(crate) fn split_top_level(body: &str, sep: u8) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'{' | b'(' | b'[' => depth += 1,
                b'}' | b')' | b']' => depth = depth.saturating_sub(1),
                _ if b == sep && depth == 0 => {
                    parts.push(&body[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }
    parts.push(&body[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_and_reserializes_object_literals() {
        let style = StyleObject::parse("{left:'10px', top: \"20px\", zIndex: 3, ...base}");
        assert_eq!(style.get("left").as_deref(), Some("10px"));
        assert_eq!(style.get("top").as_deref(), Some("20px"));
        assert_eq!(style.get("zIndex").as_deref(), Some("3"));
        assert_eq!(
            style.to_expression(),
            "{left: '10px', top: \"20px\", zIndex: 3, ...base}"
        );
    }

    #[test]
    fn set_replaces_in_place_and_appends_missing() {
        let mut style = StyleObject::parse("{left:'10px', top:'20px'}");
        style.set("left", "50px");
        style.set("width", "120px");
        assert_eq!(
            style.to_attribute(),
            "style={{left: '50px', top: '20px', width: '120px'}}"
        );
    }

    #[test]
    fn nested_values_do_not_split_entries() {
        let style = StyleObject::parse("{transform: `translate(${x}px, ${y}px)`, margin: calc(1, 2)}");
        assert_eq!(style.entries().len(), 2);
        assert_eq!(style.get("transform"), None);
    }

    #[test]
    fn non_literal_styles_become_spreads() {
        let mut style = StyleObject::parse("styles.title");
        style.set("left", "5px");
        assert_eq!(style.to_expression(), "{...styles.title, left: '5px'}");
    }

    #[test]
    fn css_strings_are_camel_cased() {
        let style = StyleObject::from_css("left: 10px; background-color: red;");
        assert_eq!(style.get("backgroundColor").as_deref(), Some("red"));
        assert_eq!(style.to_expression(), "{left: '10px', backgroundColor: 'red'}");
    }

    #[test]
    fn quoted_keys_survive() {
        let mut style = StyleObject::parse("{'z-index': 2}");
        style.set("z-index", "4");
        assert_eq!(style.to_expression(), "{'z-index': '4'}");
    }

    #[test]
    fn snapshot_lists_only_filled_style_properties() {
        let snapshot = StyleSnapshot {
            left: Some("4px".into()),
            color: Some(" ".into()),
            text_content: Some("Hi".into()),
            ..Default::default()
        };
        let props: Vec<_> = snapshot.style_properties().collect();
        assert_eq!(props, vec![("left", "4px")]);
    }

    #[test]
    fn snapshot_uses_camel_case_on_the_wire() {
        let snapshot: StyleSnapshot =
            serde_json::from_str(r#"{"backgroundColor":"red","imageSrc":"a.png"}"#).unwrap();
        assert_eq!(snapshot.get(StyleField::BackgroundColor), Some("red"));
        assert_eq!(snapshot.get(StyleField::ImageSrc), Some("a.png"));
    }

    #[test]
    fn pixel_values_keep_full_precision() {
        assert_eq!(format_px(50.0), "50px");
        assert_eq!(format_px(12.345), "12.345px");
        assert_eq!(format_px(0.1), "0.1px");
    }
}
