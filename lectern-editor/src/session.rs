/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use std::collections::HashMap;

use lectern_core::{ElementStyles, ElementTarget, Geometry, Page, SourceModel, StyleField, StyleSnapshot};
use lectern_render::{RenderedDocument, Renderer};
use tracing::{debug, info, warn};

use crate::batch::StyleBatch;
use crate::config::EditorConfig;
use crate::handshake::ModeHandshake;
use crate::history::{History, HistoryEntry};
use crate::protocol::{HostMessage, SurfaceMessage};
use crate::selection::{EditingBuffer, EditorState};
use crate::services::{Conversion, Modification, ServiceError};
use crate::shortcuts::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Short-lived message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: u64,
}

/// Name and description of the deck the pages were loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// What the backend last confirmed for a page.
#[derive(Debug, Clone, PartialEq)]
struct SavedState {
    source_text: String,
    data_blob: String,
    element_styles: ElementStyles,
}

impl SavedState {
    fn of(page: &Page) -> Self {
        Self {
            source_text: page.model.source().to_string(),
            data_blob: page.model.data_text().to_string(),
            element_styles: page.element_styles.clone(),
        }
    }
}

/// Editing state for one deck: the pages, the active page's selection and
/// history, and everything waiting to be sent to the surface.
///
/// Every timer is driven by the `now` timestamps (ms) passed in, so the host
/// must call [`EditorSession::poll`] regularly.
pub struct EditorSession {
    config: EditorConfig,
    renderer: Renderer,
    pages: Vec<Page>,
    saved: HashMap<u32, SavedState>,
    deck: Option<DeckInfo>,
    active: usize,
    edit_mode: bool,
    buffer: Option<EditingBuffer>,
    history: History,
    batch: StyleBatch,
    handshake: ModeHandshake,
    document: Option<RenderedDocument>,
    revision: u64,
    outbox: Vec<HostMessage>,
    notices: Vec<Notice>,
    next_notice: u64,
    clock: u64,
}

impl EditorSession {
    pub fn new(config: EditorConfig, mut pages: Vec<Page>) -> Self {
        if pages.is_empty() {
            pages.push(Page::from_template(1, "Page 1"));
        }
        let history = History::new(
            HistoryEntry::capture(&pages[0].model, 0),
            config.history_limit,
            config.history_settle_ms,
        );
        let mut session = Self {
            renderer: Renderer::new(config.render.clone()),
            batch: StyleBatch::new(config.style_flush_ms),
            handshake: ModeHandshake::new(config.mode_retry_ms.clone()),
            config,
            saved: pages.iter().map(|p| (p.id, SavedState::of(p))).collect(),
            pages,
            deck: None,
            active: 0,
            edit_mode: false,
            buffer: None,
            history,
            document: None,
            revision: 0,
            outbox: Vec::new(),
            notices: Vec::new(),
            next_notice: 1,
            clock: 0,
        };
        session.rebuild();
        session
    }

    pub fn from_conversion(config: EditorConfig, conversion: Conversion) -> Self {
        info!("Opening {} ({} pages)", conversion.name, conversion.pages.len());
        let mut session = Self::new(config, conversion.pages);
        session.deck = Some(DeckInfo {
            id: conversion.id,
            name: conversion.name,
            description: conversion.description,
        });
        session
    }

    pub fn deck(&self) -> Option<&DeckInfo> {
        self.deck.as_ref()
    }

    /// Renames the loaded deck. Returns the new metadata to persist, or `None`
    /// when no deck is loaded or nothing changed.
    pub fn rename_deck(&mut self, name: &str, description: Option<&str>) -> Option<DeckInfo> {
        let name = name.trim();
        let deck = self.deck.as_mut()?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if name.is_empty() || (deck.name == name && deck.description.as_deref() == description) {
            return None;
        }
        deck.name = name.to_string();
        deck.description = description.map(str::to_string);
        Some(deck.clone())
    }

    /// Whether the active page differs from what was last persisted.
    pub fn has_unsaved_changes(&self) -> bool {
        let page = self.active_page();
        self.saved
            .get(&page.id)
            .is_none_or(|saved| *saved != SavedState::of(page))
    }

    /// A copy of the active page when it has changes to persist.
    pub fn page_to_persist(&self) -> Option<Page> {
        self.has_unsaved_changes().then(|| self.active_page().clone())
    }

    /// Records `page` as the persisted state of its page.
    pub fn mark_saved(&mut self, page: &Page) {
        self.saved.insert(page.id, SavedState::of(page));
    }

    /// Handles the outcome of persisting `page`.
    pub fn persist_finished(&mut self, page: &Page, result: Result<(), ServiceError>) -> bool {
        let saved = self.report(result, &format!("Saved {}", page.name)).is_some();
        if saved {
            self.mark_saved(page);
        }
        saved
    }

    /// Handles the outcome of [`crate::services::modify_and_persist`]. The
    /// rewritten page replaces the one with the same id.
    pub fn modification_finished(&mut self, result: Result<(Modification, Page), ServiceError>, now: u64) -> bool {
        let Some((modification, page)) = self.report(result, "") else {
            return false;
        };
        let Some(index) = self.pages.iter().position(|p| p.id == page.id) else {
            warn!("Rewritten page {} is gone", page.id);
            return false;
        };
        self.mark_saved(&page);
        if index == self.active {
            self.apply_modification(modification, now);
        } else {
            self.pages[index].model = page.model;
            self.notify(NoticeLevel::Success, format!("Updated {}", page.name));
        }
        true
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_page(&self) -> &Page {
        &self.pages[self.active]
    }

    pub fn model(&self) -> &SourceModel {
        &self.pages[self.active].model
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn handshake(&self) -> &ModeHandshake {
        &self.handshake
    }

    pub fn selection(&self) -> Option<&EditingBuffer> {
        self.buffer.as_ref()
    }

    pub fn state(&self) -> EditorState {
        self.buffer.as_ref().map_or(EditorState::Idle, EditingBuffer::state)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The document the surface should currently show.
    pub fn document(&self) -> Option<&RenderedDocument> {
        self.document.as_ref()
    }

    /// Bumped on every rebuild of the document.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending_styles(&self) -> usize {
        self.batch.len()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, id: u64) {
        self.notices.retain(|n| n.id != id);
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!("Notice ({:?}): {}", level, message);
        self.notices.push(Notice {
            id: self.next_notice,
            level,
            message,
            created_at: self.clock,
        });
        self.next_notice += 1;
    }

    /// Turns a service outcome into a notice. Returns the value on success.
    pub fn report<T>(&mut self, result: Result<T, ServiceError>, success: &str) -> Option<T> {
        match result {
            Ok(value) => {
                if !success.is_empty() {
                    self.notify(NoticeLevel::Success, success);
                }
                Some(value)
            }
            Err(e) => {
                warn!("Service call failed: {}", e);
                self.notify(NoticeLevel::Error, e.to_string());
                None
            }
        }
    }

    /// Messages for the surface, in the order they were produced.
    pub fn take_outbox(&mut self) -> Vec<HostMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Latest timestamp the session has seen.
    pub fn now(&self) -> u64 {
        self.clock
    }

    fn tick(&mut self, now: u64) {
        self.clock = self.clock.max(now);
    }

    /// Advances every timer to `now`.
    pub fn poll(&mut self, now: u64) {
        self.tick(now);
        if self.history.poll(now) {
            debug!("History entry {} recorded", self.history.cursor());
        }
        if let Some(updates) = self.batch.poll(now) {
            debug!("Flushing {} style updates", updates.len());
            self.outbox.push(HostMessage::ApplyStyles { updates });
        }
        self.poll_handshake(now);

        let ttl = self.config.notice_ttl_ms;
        self.notices.retain(|n| now < n.created_at.saturating_add(ttl));
    }

    fn poll_handshake(&mut self, now: u64) {
        if let Some(message) = self.handshake.poll(now) {
            self.outbox.push(message);
        }
    }

    /// Parses and handles a raw message from the surface. Malformed messages
    /// are dropped.
    pub fn handle_raw_message(&mut self, value: serde_json::Value, now: u64) {
        match SurfaceMessage::from_value(value) {
            Ok(message) => self.handle_surface_message(message, now),
            Err(e) => debug!("Ignoring surface message: {}", e),
        }
    }

    pub fn handle_surface_message(&mut self, message: SurfaceMessage, now: u64) {
        self.tick(now);
        match message {
            SurfaceMessage::SurfaceReady => {
                // A fresh surface has no selection of its own.
                self.buffer = None;
                self.handshake.start(self.edit_mode, now);
                self.poll_handshake(now);
            }
            SurfaceMessage::ModeConfirmed { edit_mode } => {
                self.handshake.confirm(edit_mode);
            }
            SurfaceMessage::ElementSelected { target, style } => {
                self.select(target, style);
            }
            SurfaceMessage::RenderError { message, stack } => {
                warn!("Surface failed to render: {} {}", message, stack.unwrap_or_default());
            }
            report => {
                if let Some((target, geometry)) = report.geometry() {
                    self.move_element(target, geometry, now);
                }
            }
        }
    }

    /// Starts editing `target` with the style captured by the surface. Unknown
    /// targets are ignored.
    pub fn select(&mut self, target: ElementTarget, snapshot: StyleSnapshot) -> bool {
        if !self.edit_mode {
            debug!("Ignoring selection of {} outside edit mode", target);
            return false;
        }
        if !self.model().resolves(&target) {
            debug!("Ignoring selection of unknown {}", target);
            return false;
        }
        let mut snapshot = snapshot;
        if let ElementTarget::Key(key) = &target {
            if let Some(record) = self.active_page().element_styles.get(key) {
                for field in StyleField::ALL {
                    if let Some(value) = field.style_property().and_then(|p| record.style.get(p)) {
                        snapshot.set(field, Some(value.clone()));
                    }
                }
            }
        }
        self.buffer = Some(EditingBuffer::new(target, snapshot));
        true
    }

    pub fn clear_selection(&mut self) {
        self.buffer = None;
    }

    fn move_element(&mut self, target: &ElementTarget, geometry: Geometry, now: u64) {
        if !self.pages[self.active].model.patch_element_geometry(target, geometry) {
            debug!("Geometry report for {} changed nothing", target);
            return;
        }
        if let Some(buffer) = self.buffer.as_mut().filter(|b| b.target() == target) {
            buffer.refresh_geometry(&geometry);
        }
        // The source now holds the geometry; an override would pull the
        // element back on the next mount.
        if let ElementTarget::Key(key) = target {
            if let Some(record) = self.pages[self.active].element_styles.get_mut(key) {
                record.style.remove("left");
                record.style.remove("top");
                if geometry.width.is_some() {
                    record.style.remove("width");
                }
                if geometry.height.is_some() {
                    record.style.remove("height");
                }
            }
        }
        self.source_changed(now);
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool, now: u64) {
        self.tick(now);
        self.edit_mode = edit_mode;
        if !edit_mode {
            self.buffer = None;
        }
        self.handshake.start(edit_mode, now);
        self.poll_handshake(now);
    }

    /// Changes one field of the selected element.
    ///
    /// Style fields of keyed elements become element style overrides and
    /// reach the surface with the next batch flush. Everything else is
    /// previewed on the surface and only written to the source on save.
    pub fn edit_field(&mut self, field: StyleField, value: impl Into<String>, now: u64) -> bool {
        self.tick(now);
        let value = value.into();
        let Some(buffer) = self.buffer.as_mut() else {
            return false;
        };
        if let (ElementTarget::Key(key), Some(property)) = (buffer.target(), field.style_property()) {
            let key = key.clone();
            if !buffer.sync(field, Some(value.clone())) {
                return false;
            }
            self.set_element_style(&key, property, &value, now);
            return true;
        }
        if !buffer.set(field, Some(value)) {
            return false;
        }
        self.outbox.push(HostMessage::PreviewElement {
            target: buffer.target().clone(),
            style: buffer.snapshot().clone(),
        });
        true
    }

    /// Writes the edited fields of the selection into the source and clears
    /// the selection.
    pub fn save(&mut self, now: u64) -> bool {
        self.tick(now);
        let Some(buffer) = self.buffer.take() else {
            return false;
        };
        let changes = buffer.changes();
        if changes == StyleSnapshot::default() {
            return false;
        }

        let target = buffer.target();
        match self.pages[self.active]
            .model
            .patch_element_content_and_style(target, &changes)
        {
            Some(_) => {
                info!("Saved edits to {}", target);
                self.source_changed(now);
                self.notify(NoticeLevel::Success, "Changes saved");
                true
            }
            None => {
                self.notify(NoticeLevel::Warning, format!("Could not apply changes to {}", target));
                false
            }
        }
    }

    /// Removes the selected element from the surface and the source.
    pub fn delete_selected(&mut self, now: u64) -> bool {
        self.tick(now);
        let Some(buffer) = self.buffer.take() else {
            return false;
        };
        let target = buffer.target().clone();
        let page = &mut self.pages[self.active];
        if !page.model.delete_element(&target) {
            self.notify(NoticeLevel::Warning, format!("Could not delete {}", target));
            return false;
        }
        if let ElementTarget::Key(key) = &target {
            page.element_styles.remove(key);
        }

        info!("Deleted {}", target);
        self.outbox.push(HostMessage::RemoveElement { target });
        self.source_changed(now);
        self.notify(NoticeLevel::Success, "Element deleted");
        true
    }

    pub fn undo(&mut self, now: u64) -> bool {
        self.tick(now);
        match self.history.undo().cloned() {
            Some(entry) => {
                self.restore(&entry);
                true
            }
            None => {
                self.notify(NoticeLevel::Info, "Nothing to undo");
                false
            }
        }
    }

    pub fn redo(&mut self, now: u64) -> bool {
        self.tick(now);
        match self.history.redo().cloned() {
            Some(entry) => {
                self.restore(&entry);
                true
            }
            None => {
                self.notify(NoticeLevel::Info, "Nothing to redo");
                false
            }
        }
    }

    fn restore(&mut self, entry: &HistoryEntry) {
        entry.restore(&mut self.pages[self.active].model);
        self.buffer = None;
        self.rebuild();
    }

    /// Sets a style override for a keyed element. The page's styles change
    /// right away; the surface gets them in the next batch flush.
    pub fn set_element_style(&mut self, element_key: &str, property: &str, value: &str, now: u64) {
        self.tick(now);
        self.pages[self.active]
            .element_styles
            .entry(element_key.to_string())
            .or_default()
            .apply(property, value);
        self.batch.queue(element_key, property, value, now);
    }

    /// Replaces the active page's source with a rewritten version.
    pub fn apply_modification(&mut self, modification: Modification, now: u64) {
        self.tick(now);
        self.pages[self.active].model.set_source(modification.source_text);
        self.buffer = None;
        self.source_changed(now);
        let summary = if modification.summary.trim().is_empty() {
            "Component updated".to_string()
        } else {
            modification.summary
        };
        self.notify(NoticeLevel::Success, summary);
    }

    pub fn switch_page(&mut self, index: usize, now: u64) -> bool {
        self.tick(now);
        if index >= self.pages.len() || index == self.active {
            return false;
        }
        self.active = index;
        self.enter_page();
        info!("Switched to page {} ({})", self.pages[index].id, self.pages[index].name);
        true
    }

    fn enter_page(&mut self) {
        self.buffer = None;
        self.history
            .reset(HistoryEntry::capture(&self.pages[self.active].model, self.clock));
        self.rebuild();
    }

    /// Appends a page from the default template and switches to it.
    pub fn add_page(&mut self, name: impl Into<String>, now: u64) -> u32 {
        let id = self.pages.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let page = Page::from_template(id, name);
        self.saved.insert(id, SavedState::of(&page));
        self.pages.push(page);
        self.switch_page(self.pages.len() - 1, now);
        id
    }

    pub fn remove_page(&mut self, index: usize, now: u64) -> bool {
        self.tick(now);
        if index >= self.pages.len() {
            return false;
        }
        if self.pages.len() == 1 {
            self.notify(NoticeLevel::Warning, "A deck needs at least one page");
            return false;
        }

        let removed = self.pages.remove(index);
        self.saved.remove(&removed.id);
        info!("Removed page {} ({})", removed.id, removed.name);
        if index < self.active {
            self.active -= 1;
        } else if index == self.active {
            self.active = self.active.min(self.pages.len() - 1);
            self.enter_page();
        }
        true
    }

    pub fn rename_page(&mut self, index: usize, name: &str) -> bool {
        let name = name.trim();
        match self.pages.get_mut(index) {
            Some(page) if !name.is_empty() => {
                page.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn execute(&mut self, command: Command, now: u64) -> bool {
        match command {
            Command::Undo => self.undo(now),
            Command::Redo => self.redo(now),
            Command::Save => self.save(now) || self.has_unsaved_changes(),
            Command::Delete => self.delete_selected(now),
            Command::ClearSelection => {
                self.clear_selection();
                true
            }
        }
    }

    fn source_changed(&mut self, now: u64) {
        self.history
            .note_change(HistoryEntry::capture(&self.pages[self.active].model, now), now);
        self.rebuild();
    }

    /// Replaces the surface document. Queued style updates are dropped since
    /// the new document embeds the page's current styles.
    fn rebuild(&mut self) {
        self.batch.cancel();
        self.handshake.reset();
        match self.renderer.render_page(&self.pages[self.active]) {
            Ok(document) => {
                debug!(
                    "Rebuilt surface for page {} ({} elements)",
                    self.pages[self.active].id, document.element_count
                );
                self.document = Some(document);
                self.revision += 1;
            }
            Err(e) => {
                warn!("Could not render page {}: {}", self.pages[self.active].id, e);
                self.notify(NoticeLevel::Error, format!("Could not render page: {}", e));
            }
        }
    }
}
