/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

//! Source rewrites applied before the component is embedded in a document.

use std::sync::OnceLock;

use lectern_core::markup::Markup;
use lectern_core::{MarkupResult, ELEMENT_ID_ATTR};
use regex::Regex;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).unwrap())
        }
    };
}

pattern!(side_effect_import, r#"(?m)^[ \t]*import\s*['"][^'"\n]+['"][ \t]*;?[ \t]*\r?\n?"#);
pattern!(named_import, r#"(?m)^[ \t]*import\s[^;]*?\bfrom\s*['"][^'"\n]+['"][ \t]*;?[ \t]*\r?\n?"#);
pattern!(export_list, r#"(?m)^[ \t]*export\s*\{[^}]*\}(?:\s*from\s*['"][^'"\n]+['"])?[ \t]*;?[ \t]*\r?\n?"#);
pattern!(export_default_decl, r"\bexport\s+default\s+((?:async\s+)?function\b|class\b)");
pattern!(export_default_ident, r"(?m)^[ \t]*export\s+default\s+([A-Za-z_$][\w$]*)[ \t]*;?[ \t]*(?:\r?\n|\z)");
pattern!(export_default_expr, r"\bexport\s+default\s+");
pattern!(export_decl, r"\bexport\s+((?:async\s+)?function\b|class\b|const\b|let\b|var\b)");

pattern!(default_function_name, r"\bexport\s+default\s+(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)");
pattern!(default_ident_name, r"\bexport\s+default\s+([A-Za-z_$][\w$]*)\s*(?:;|$|\n)");
pattern!(function_name, r"(?m)^(?:export\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)");
pattern!(const_name, r"(?m)^(?:export\s+)?const\s+([A-Za-z_$][\w$]*)\s*=");

const NOT_NAMES: &[&str] = &["function", "class", "async"];

/// Removes `import` statements and `export` keywords, neither of which can
/// run inside the rendering surface.
pub fn strip_module_syntax(source: &str) -> String {
    let out = side_effect_import().replace_all(source, "");
    let out = named_import().replace_all(&out, "");
    let out = export_list().replace_all(&out, "");
    let out = export_default_decl().replace_all(&out, "$1");
    let out = export_default_ident().replace_all(&out, |caps: &regex::Captures| {
        if NOT_NAMES.contains(&&caps[1]) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let out = export_default_expr().replace_all(&out, "");
    export_decl().replace_all(&out, "$1").into_owned()
}

/// Picks the component to mount: the default-exported function, then a
/// default-exported identifier, then the first top-level function, then the
/// first top-level constant (PascalCase names first).
pub fn infer_root_component(source: &str, fallback: &str) -> String {
    if let Some(caps) = default_function_name().captures(source) {
        return caps[1].to_string();
    }
    if let Some(name) = default_ident_name()
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .find(|name| !NOT_NAMES.contains(&name.as_str()))
    {
        return name;
    }
    if let Some(caps) = function_name().captures(source) {
        return caps[1].to_string();
    }

    let constants: Vec<&str> = const_name()
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    constants
        .iter()
        .find(|name| name.starts_with(|c: char| c.is_ascii_uppercase()))
        .or(constants.first())
        .map_or_else(|| fallback.to_string(), |name| name.to_string())
}

/// Tags every editable element with its positional id so the surface reports
/// the same index the source model resolves. Returns the annotated source and
/// the number of editable elements.
pub fn annotate_elements(source: &str) -> MarkupResult<(String, usize)> {
    let markup = Markup::parse(source)?;
    let mut out = source.to_string();

    let insertions: Vec<(usize, usize)> = markup
        .editable_elements()
        .filter(|(_, element)| element.attribute(ELEMENT_ID_ATTR).is_none())
        .map(|(n, element)| (element.name_end, n))
        .collect();
    for (offset, n) in insertions.into_iter().rev() {
        out.insert_str(offset, &format!(" {}=\"{}\"", ELEMENT_ID_ATTR, n));
    }

    Ok((out, markup.editable_count()))
}
