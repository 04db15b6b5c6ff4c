/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use crate::protocol::StyleUpdate;
use crate::timer::Debounce;

/// Element style changes waiting to be pushed to the surface in one pass.
/// Only the latest value per element key and property is kept.
#[derive(Debug, Clone)]
pub struct StyleBatch {
    queued: Vec<StyleUpdate>,
    timer: Debounce,
}

impl StyleBatch {
    pub fn new(flush_ms: u64) -> Self {
        Self {
            queued: Vec::new(),
            timer: Debounce::new(flush_ms),
        }
    }

    pub fn queue(&mut self, element_key: &str, property: &str, value: &str, now: u64) {
        match self
            .queued
            .iter_mut()
            .find(|u| u.element_key == element_key && u.property == property)
        {
            Some(update) => update.value = value.to_string(),
            None => self.queued.push(StyleUpdate {
                element_key: element_key.to_string(),
                property: property.to_string(),
                value: value.to_string(),
            }),
        }
        self.timer.schedule(now);
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn cancel(&mut self) {
        self.queued.clear();
        self.timer.cancel();
    }

    /// The queued updates, once the flush delay has passed since the last
    /// change.
    pub fn poll(&mut self, now: u64) -> Option<Vec<StyleUpdate>> {
        if !self.timer.fire(now) || self.queued.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.queued))
    }
}
