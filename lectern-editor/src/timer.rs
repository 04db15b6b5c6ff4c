/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

/// Cancel-and-reschedule timer driven by caller-supplied timestamps (ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    delay: u64,
    due: Option<u64>,
}

impl Debounce {
    pub fn new(delay: u64) -> Self {
        Self { delay, due: None }
    }

    /// Pushes the deadline back to `now + delay`.
    pub fn schedule(&mut self, now: u64) {
        self.due = Some(now.saturating_add(self.delay));
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<u64> {
        self.due
    }

    /// True once per schedule, the first time `now` reaches the deadline.
    pub fn fire(&mut self, now: u64) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
