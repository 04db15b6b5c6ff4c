/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use thiserror::Error;

use crate::ElementTarget;

pub type MarkupResult<T> = Result<T, MarkupError>;
pub type PatchResult<T> = Result<T, PatchError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("No element matches {0}")]
    TargetNotFound(ElementTarget),

    #[error("Element <{tag}> cannot take {what}")]
    Unsupported { tag: String, what: &'static str },

    #[error(transparent)]
    Markup(#[from] MarkupError),
}
