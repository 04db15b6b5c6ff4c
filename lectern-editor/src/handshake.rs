/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use tracing::{debug, warn};

use crate::protocol::HostMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Pending { started: u64, sent: usize },
    Confirmed,
    /// Retries ran out without a reply; the host carries on regardless.
    Assumed,
}

/// Tells the surface which mode it is in, resending `set-mode` on a fixed
/// schedule until the surface confirms.
#[derive(Debug, Clone)]
pub struct ModeHandshake {
    schedule: Vec<u64>,
    edit_mode: bool,
    state: HandshakeState,
}

impl ModeHandshake {
    pub fn new(schedule: Vec<u64>) -> Self {
        Self {
            schedule,
            edit_mode: false,
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Whether the surface can be treated as being in the requested mode.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, HandshakeState::Confirmed | HandshakeState::Assumed)
    }

    pub fn start(&mut self, edit_mode: bool, now: u64) {
        self.edit_mode = edit_mode;
        self.state = HandshakeState::Pending { started: now, sent: 0 };
    }

    pub fn reset(&mut self) {
        self.state = HandshakeState::Idle;
    }

    /// Accepts a confirmation for the requested mode. Stale replies for a
    /// previous mode are ignored.
    pub fn confirm(&mut self, edit_mode: bool) -> bool {
        if edit_mode != self.edit_mode || self.state == HandshakeState::Idle {
            debug!("Ignoring stale mode confirmation ({})", edit_mode);
            return false;
        }
        self.state = HandshakeState::Confirmed;
        true
    }

    /// The `set-mode` message to send now, if an attempt has come due. Overdue
    /// attempts collapse into one.
    pub fn poll(&mut self, now: u64) -> Option<HostMessage> {
        let HandshakeState::Pending { started, sent } = self.state else {
            return None;
        };
        let due = self
            .schedule
            .iter()
            .take_while(|offset| started.saturating_add(**offset) <= now)
            .count();
        if due <= sent {
            return None;
        }

        if due >= self.schedule.len() {
            warn!("Surface never confirmed mode {}, continuing anyway", self.edit_mode);
            self.state = HandshakeState::Assumed;
        } else {
            self.state = HandshakeState::Pending { started, sent: due };
        }
        Some(HostMessage::SetMode {
            edit_mode: self.edit_mode,
        })
    }
}
