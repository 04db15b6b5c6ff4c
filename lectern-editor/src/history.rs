/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use lectern_core::SourceModel;
use tracing::debug;

use crate::timer::Debounce;

/// Snapshot of a page's source text and data blob, stamped with the time
/// (ms) the change was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub source_text: String,
    pub data_blob: String,
    pub recorded_at: u64,
}

impl HistoryEntry {
    pub fn capture(model: &SourceModel, now: u64) -> Self {
        Self {
            source_text: model.source().to_string(),
            data_blob: model.data_text().to_string(),
            recorded_at: now,
        }
    }

    /// Whether both entries hold the same text, whenever they were taken.
    pub fn same_state(&self, other: &HistoryEntry) -> bool {
        self.source_text == other.source_text && self.data_blob == other.data_blob
    }

    pub fn restore(&self, model: &mut SourceModel) {
        model.set_source(self.source_text.clone());
        model.set_data(self.data_blob.clone());
    }
}

/// Linear undo log with a cursor. Recording after an undo drops the redo tail.
///
/// Changes are not recorded immediately: [`History::note_change`] starts a
/// settle window and only the state seen when it elapses becomes an entry, so
/// a burst of edits collapses into one undo step.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    limit: usize,
    settle: Debounce,
    pending: Option<HistoryEntry>,
}

impl History {
    pub fn new(initial: HistoryEntry, limit: usize, settle_ms: u64) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: limit.max(1),
            settle: Debounce::new(settle_ms),
            pending: None,
        }
    }

    /// Starts over from `initial`, dropping every entry and pending change.
    pub fn reset(&mut self, initial: HistoryEntry) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
        self.settle.cancel();
        self.pending = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0 || self.pending.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.pending.is_none() && self.cursor + 1 < self.entries.len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn note_change(&mut self, entry: HistoryEntry, now: u64) {
        self.pending = Some(entry);
        self.settle.schedule(now);
    }

    /// Records the pending change once its settle window has elapsed.
    pub fn poll(&mut self, now: u64) -> bool {
        if self.settle.fire(now) {
            return self.commit();
        }
        false
    }

    /// Records the pending change right away.
    pub fn commit(&mut self) -> bool {
        self.settle.cancel();
        match self.pending.take() {
            Some(entry) => self.record(entry),
            None => false,
        }
    }

    /// Appends an entry after the cursor. Identical consecutive states are
    /// not recorded.
    pub fn record(&mut self, entry: HistoryEntry) -> bool {
        if self.current().same_state(&entry) {
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
            debug!("History trimmed to {} entries", self.limit);
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        self.commit();
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        self.commit();
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }
}
