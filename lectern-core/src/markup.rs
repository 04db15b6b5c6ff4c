/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

//! Element tree for generated component source.
//!
//! The source is JavaScript with embedded JSX. The parser does not build a
//! full JavaScript AST: it understands enough of the lexical grammar (strings,
//! template literals, comments, regex literals, bracket nesting) to find every
//! JSX element reliably, and records byte spans for elements, attributes and
//! children so edits can be spliced back without disturbing the rest of the
//! text.

use std::ops::Range;

use crate::error::{MarkupError, MarkupResult};
use crate::ElementTarget;

/// Attribute carrying the positional id injected at render time.
pub const ELEMENT_ID_ATTR: &str = "data-element-id";
/// Attribute carrying a stable element key written by the generator.
pub const SHAPE_KEY_ATTR: &str = "data-shape-key";

const KEYWORDS: &[&str] = &[
    "return", "yield", "default", "case", "typeof", "void", "delete", "in", "of", "else", "do",
    "await", "throw",
];

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `<input disabled />`
    Bare,
    /// Quoted literal. `span` covers the quotes.
    Str { value: String, span: Range<usize> },
    /// `{...}`. `inner` excludes the braces.
    Expr { inner: Range<usize> },
    /// `{...props}` spread. `inner` excludes the braces.
    Spread { inner: Range<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub span: Range<usize>,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Text(Range<usize>),
    /// Expression container; the range excludes the braces.
    Expr(Range<usize>),
    /// `{/* ... */}`; the range includes the braces.
    Comment(Range<usize>),
    Element(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Empty for fragments.
    pub tag: String,
    pub span: Range<usize>,
    pub open_tag: Range<usize>,
    /// Offset right after the tag name, where new attributes are inserted.
    pub name_end: usize,
    pub attributes: Vec<Attribute>,
    /// Between the opening and closing tags. `None` when self-closing.
    pub content: Option<Range<usize>>,
    pub children: Vec<Child>,
    /// `{/* ... */}` annotation directly preceding this element.
    pub comment_before: Option<Range<usize>>,
    pub parent: Option<usize>,
    pub depth: usize,
}

impl Element {
    /// Lowercase tags are host elements that end up in the DOM; those are the
    /// ones a user can select.
    pub fn is_intrinsic(&self) -> bool {
        self.tag
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
    }

    pub fn is_self_closing(&self) -> bool {
        self.content.is_none()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        match self.attribute(name).map(|a| &a.value) {
            Some(AttrValue::Str { value, .. }) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Span to remove when the element is deleted, including its annotation.
    pub fn removal_span(&self) -> Range<usize> {
        let start = self
            .comment_before
            .as_ref()
            .map_or(self.span.start, |c| c.start);
        start..self.span.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Markup {
    elements: Vec<Element>,
    editable: Vec<usize>,
}

impl Markup {
    pub fn parse(source: &str) -> MarkupResult<Self> {
        let mut parser = Parser {
            src: source,
            bytes: source.as_bytes(),
            pos: 0,
            elements: Vec::new(),
        };
        parser.scan_code(None, None, 0)?;

        let editable = parser
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_intrinsic())
            .map(|(i, _)| i)
            .collect();

        Ok(Self {
            elements: parser.elements,
            editable,
        })
    }

    /// All elements, components and fragments included, in document order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn editable_count(&self) -> usize {
        self.editable.len()
    }

    /// The `n`th intrinsic element in document order.
    pub fn editable(&self, n: usize) -> Option<&Element> {
        self.editable.get(n).map(|&i| &self.elements[i])
    }

    pub fn editable_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.editable
            .iter()
            .enumerate()
            .map(|(n, &i)| (n, &self.elements[i]))
    }

    pub fn by_key(&self, key: &str) -> Option<&Element> {
        self.editable_elements()
            .map(|(_, e)| e)
            .find(|e| e.string_attribute(SHAPE_KEY_ATTR) == Some(key))
    }

    pub fn find(&self, target: &ElementTarget) -> Option<&Element> {
        match target {
            ElementTarget::Index(n) => self.editable(*n),
            ElementTarget::Key(key) => self.by_key(key),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.editable_elements()
            .filter_map(|(_, e)| e.string_attribute(SHAPE_KEY_ATTR))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Prev {
    Start,
    Punct(u8),
    Keyword,
    Operand,
}

impl Prev {
    /// Whether the next token may begin an expression (so `<` opens JSX and
    /// `/` opens a regex literal).
    fn expects_operand(self) -> bool {
        match self {
            Prev::Start | Prev::Keyword => true,
            Prev::Operand => false,
            Prev::Punct(c) => matches!(
                c,
                b'(' | b','
                    | b'='
                    | b':'
                    | b'?'
                    | b'['
                    | b'{'
                    | b';'
                    | b'&'
                    | b'|'
                    | b'!'
                    | b'>'
                    | b'+'
                    | b'-'
                    | b'*'
                    | b'%'
                    | b'~'
                    | b'^'
            ),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'-' | b':' | b'.')
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    elements: Vec<Element>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn error(&self, message: impl Into<String>) -> MarkupError {
        let before = &self.bytes[..self.pos.min(self.bytes.len())];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        MarkupError::Syntax {
            line,
            column: self.pos - line_start + 1,
            message: message.into(),
        }
    }

    /// Scans JavaScript until `close` is met at nesting depth zero (and
    /// consumes it), or until end of input when `close` is `None`.
    fn scan_code(&mut self, close: Option<u8>, parent: Option<usize>, depth: usize) -> MarkupResult<()> {
        let mut nesting = 0usize;
        let mut prev = Prev::Start;

        loop {
            let Some(b) = self.peek() else {
                return match close {
                    None => Ok(()),
                    Some(c) => Err(self.error(format!("expected '{}' before end of input", c as char))),
                };
            };

            match b {
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                b'/' if prev.expects_operand() => {
                    self.skip_regex()?;
                    prev = Prev::Operand;
                }
                b'\'' | b'"' => {
                    self.skip_string(b)?;
                    prev = Prev::Operand;
                }
                b'`' => {
                    self.skip_template(parent, depth)?;
                    prev = Prev::Operand;
                }
                b'<' if prev.expects_operand() && self.looks_like_element() => {
                    self.parse_element(parent, depth)?;
                    prev = Prev::Operand;
                }
                b'{' | b'(' | b'[' => {
                    nesting += 1;
                    self.pos += 1;
                    prev = Prev::Punct(b);
                }
                b'}' | b')' | b']' => {
                    if nesting == 0 {
                        if close == Some(b) {
                            self.pos += 1;
                            return Ok(());
                        }
                        return Err(self.error(format!("unbalanced '{}'", b as char)));
                    }
                    nesting -= 1;
                    self.pos += 1;
                    prev = Prev::Operand;
                }
                c if c.is_ascii_whitespace() => self.pos += 1,
                c if is_ident_start(c) => {
                    let start = self.pos;
                    while self.peek().is_some_and(is_ident_byte) {
                        self.pos += 1;
                    }
                    let word = &self.src[start..self.pos];
                    prev = if KEYWORDS.contains(&word) {
                        Prev::Keyword
                    } else {
                        Prev::Operand
                    };
                }
                c if c.is_ascii_digit() => {
                    while self.peek().is_some_and(|d| is_ident_byte(d) || d == b'.') {
                        self.pos += 1;
                    }
                    prev = Prev::Operand;
                }
                _ => {
                    self.pos += 1;
                    prev = Prev::Punct(b);
                }
            }
        }
    }

    fn looks_like_element(&self) -> bool {
        matches!(self.peek_at(1), Some(b) if b.is_ascii_alphabetic() || b == b'>')
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> MarkupResult<()> {
        let start = self.pos;
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.starts_with("*/") {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        self.pos = start;
        Err(self.error("unterminated block comment"))
    }

    fn skip_string(&mut self, quote: u8) -> MarkupResult<()> {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(self.error("unterminated string literal"))
    }

    fn skip_regex(&mut self) -> MarkupResult<()> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.peek().is_some_and(|f| f.is_ascii_alphabetic()) {
                        self.pos += 1;
                    }
                    return Ok(());
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(self.error("unterminated regular expression"))
    }

    fn skip_template(&mut self, parent: Option<usize>, depth: usize) -> MarkupResult<()> {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'$' if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    self.scan_code(Some(b'}'), parent, depth)?;
                }
                _ => self.pos += 1,
            }
        }
        self.pos = start;
        Err(self.error("unterminated template literal"))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Whitespace and comments between attributes.
    fn skip_trivia(&mut self) -> MarkupResult<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with("//") {
                self.skip_line_comment();
            } else if self.starts_with("/*") {
                self.skip_block_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_name(&mut self) -> Range<usize> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_byte) {
            self.pos += 1;
        }
        start..self.pos
    }

    /// End offset of a `{/* ... */}` child starting at `open`, if it is one.
    fn jsx_comment_end(&self, open: usize) -> Option<usize> {
        let mut i = open + 1;
        while self.bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }
        if !self.bytes[i..].starts_with(b"/*") {
            return None;
        }
        let close = self.src[i + 2..].find("*/")? + i + 4;
        let mut j = close;
        while self.bytes.get(j).is_some_and(|b| b.is_ascii_whitespace()) {
            j += 1;
        }
        (self.bytes.get(j) == Some(&b'}')).then_some(j + 1)
    }

    fn parse_element(&mut self, parent: Option<usize>, depth: usize) -> MarkupResult<usize> {
        let start = self.pos;
        self.pos += 1;
        let name = self.read_name();
        let tag = self.src[name.clone()].to_string();
        let index = self.elements.len();
        self.elements.push(Element {
            tag: tag.clone(),
            span: start..start,
            open_tag: start..start,
            name_end: name.end,
            attributes: Vec::new(),
            content: None,
            children: Vec::new(),
            comment_before: None,
            parent,
            depth,
        });

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error(format!("unterminated <{}> opening tag", tag))),
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break true;
                }
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'{') => {
                    let attr_start = self.pos;
                    self.pos += 1;
                    let inner_start = self.pos;
                    self.scan_code(Some(b'}'), Some(index), depth + 1)?;
                    attributes.push(Attribute {
                        name: String::new(),
                        span: attr_start..self.pos,
                        value: AttrValue::Spread {
                            inner: inner_start..self.pos - 1,
                        },
                    });
                }
                Some(b) if is_name_byte(b) => {
                    let attr = self.parse_attribute(index, depth)?;
                    attributes.push(attr);
                }
                Some(b) => {
                    return Err(self.error(format!("unexpected '{}' in <{}> tag", b as char, tag)));
                }
            }
        };
        let open_tag = start..self.pos;

        if self_closing {
            let element = &mut self.elements[index];
            element.attributes = attributes;
            element.open_tag = open_tag;
            element.span = start..self.pos;
            return Ok(index);
        }

        let content_start = self.pos;
        let mut children = Vec::new();
        let content_end = loop {
            match self.peek() {
                None => return Err(self.error(format!("missing closing tag for <{}>", tag))),
                Some(b'<') if self.peek_at(1) == Some(b'/') => {
                    let content_end = self.pos;
                    self.pos += 2;
                    self.skip_whitespace();
                    let closing = self.read_name();
                    self.skip_whitespace();
                    if self.peek() != Some(b'>') {
                        return Err(self.error(format!("malformed closing tag for <{}>", tag)));
                    }
                    self.pos += 1;
                    if self.src[closing] != *tag {
                        return Err(self.error(format!("closing tag does not match <{}>", tag)));
                    }
                    break content_end;
                }
                Some(b'<') => {
                    let child = self.parse_element(Some(index), depth + 1)?;
                    children.push(Child::Element(child));
                }
                Some(b'{') => {
                    let open = self.pos;
                    if let Some(end) = self.jsx_comment_end(open) {
                        self.pos = end;
                        children.push(Child::Comment(open..end));
                    } else {
                        self.pos += 1;
                        let inner_start = self.pos;
                        self.scan_code(Some(b'}'), Some(index), depth + 1)?;
                        children.push(Child::Expr(inner_start..self.pos - 1));
                    }
                }
                Some(_) => {
                    let text_start = self.pos;
                    while self.peek().is_some_and(|b| b != b'<' && b != b'{') {
                        self.pos += 1;
                    }
                    children.push(Child::Text(text_start..self.pos));
                }
            }
        };

        self.link_annotations(&children);

        let element = &mut self.elements[index];
        element.attributes = attributes;
        element.open_tag = open_tag;
        element.content = Some(content_start..content_end);
        element.children = children;
        element.span = start..self.pos;
        Ok(index)
    }

    fn parse_attribute(&mut self, index: usize, depth: usize) -> MarkupResult<Attribute> {
        let name = self.read_name();
        let after_name = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            self.pos = after_name;
            return Ok(Attribute {
                name: self.src[name.clone()].to_string(),
                span: name,
                value: AttrValue::Bare,
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                let open = self.pos;
                let len = self.bytes[open + 1..]
                    .iter()
                    .position(|&b| b == q)
                    .ok_or_else(|| self.error("unterminated attribute string"))?;
                self.pos = open + len + 2;
                AttrValue::Str {
                    value: self.src[open + 1..open + 1 + len].to_string(),
                    span: open..self.pos,
                }
            }
            Some(b'{') => {
                self.pos += 1;
                let inner_start = self.pos;
                self.scan_code(Some(b'}'), Some(index), depth + 1)?;
                AttrValue::Expr {
                    inner: inner_start..self.pos - 1,
                }
            }
            _ => return Err(self.error("expected attribute value")),
        };

        Ok(Attribute {
            name: self.src[name.clone()].to_string(),
            span: name.start..self.pos,
            value,
        })
    }

    fn link_annotations(&mut self, children: &[Child]) {
        let mut pending: Option<Range<usize>> = None;
        for child in children {
            match child {
                Child::Comment(range) => pending = Some(range.clone()),
                Child::Text(range) if self.src[range.clone()].trim().is_empty() => {}
                Child::Element(i) => {
                    if let Some(comment) = pending.take() {
                        self.elements[*i].comment_before = Some(comment);
                    }
                }
                _ => pending = None,
            }
        }
    }
}
