// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit event log

use dm_core::{Event, EventType};
use std::collections::VecDeque;
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 256;

/// Bounded in-memory log of recent audit events
pub(crate) struct EventLog {
    events: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl EventLog {
    pub(crate) fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Record an event, evicting the oldest when full
    pub(crate) fn emit(&self, event: Event) {
        match event.event_type {
            EventType::Info => tracing::info!(
                action = %event.action,
                resource = %event.resource_tag,
                object = %event.object_name,
                "{}",
                event.description
            ),
            EventType::Warning => tracing::warn!(
                action = %event.action,
                resource = %event.resource_tag,
                object = %event.object_name,
                "{}",
                event.description
            ),
            EventType::Error => tracing::error!(
                action = %event.action,
                resource = %event.resource_tag,
                object = %event.object_name,
                "{}",
                event.description
            ),
        }

        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Oldest first
    pub(crate) fn recent(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
