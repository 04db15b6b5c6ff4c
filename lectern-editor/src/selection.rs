/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use lectern_core::{ElementTarget, Geometry, StyleField, StyleSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Selected,
    Editing,
}

/// The selected element with the snapshot taken when it was selected and the
/// user's unsaved edits on top of it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditingBuffer {
    target: ElementTarget,
    original: StyleSnapshot,
    current: StyleSnapshot,
}

impl EditingBuffer {
    pub fn new(target: ElementTarget, snapshot: StyleSnapshot) -> Self {
        Self {
            target,
            original: snapshot.clone(),
            current: snapshot,
        }
    }

    pub fn target(&self) -> &ElementTarget {
        &self.target
    }

    pub fn snapshot(&self) -> &StyleSnapshot {
        &self.current
    }

    pub fn original(&self) -> &StyleSnapshot {
        &self.original
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }

    pub fn state(&self) -> EditorState {
        if self.is_dirty() {
            EditorState::Editing
        } else {
            EditorState::Selected
        }
    }

    /// Returns whether the value actually changed.
    pub fn set(&mut self, field: StyleField, value: Option<String>) -> bool {
        if self.current.get(field) == value.as_deref() {
            return false;
        }
        self.current.set(field, value);
        true
    }

    /// Fields the user changed since selection. Computed values the user
    /// never touched stay out so they are not baked into the source.
    pub fn changes(&self) -> StyleSnapshot {
        let mut changes = StyleSnapshot::default();
        for field in StyleField::ALL {
            let value = self.current.get(field);
            if value != self.original.get(field) {
                changes.set(field, value.map(str::to_string));
            }
        }
        changes
    }

    /// Sets a field that was applied outside the source (an element style
    /// override), so it does not count as an unsaved edit.
    pub fn sync(&mut self, field: StyleField, value: Option<String>) -> bool {
        if self.current.get(field) == value.as_deref() {
            return false;
        }
        self.original.set(field, value.clone());
        self.current.set(field, value);
        true
    }

    /// Mirrors a drag or resize that has already been written to the source.
    pub fn refresh_geometry(&mut self, geometry: &Geometry) {
        self.original.set_geometry(geometry);
        self.current.set_geometry(geometry);
    }
}
