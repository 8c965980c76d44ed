// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command queues and the in-flight barrier
//!
//! The immediate queue is drained FIFO each pass. The deferred queue holds
//! commands that asked to be reprocessed; each pass takes everything in it at
//! once. Every queued command carries an [`InFlight`] guard so the controller
//! can wait for the whole system to go idle.

use crate::command::{Command, CommandKindTag};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};

/// FIFO queue supporting selective extraction
pub(crate) struct ImmediateQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> ImmediateQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    pub(crate) fn pop(&self) -> Option<T> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Remove and return every item matching `pred`, preserving order of both
    /// the extracted and the remaining items
    pub(crate) fn drain_matching(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let (matched, rest): (VecDeque<T>, VecDeque<T>) =
            std::mem::take(&mut *items).into_iter().partition(|i| pred(i));
        *items = rest;
        matched.into_iter().collect()
    }

    pub(crate) fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(pred)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Retry-next-pass queue, drained by snapshot-and-clear
pub(crate) struct DeferredQueue<T> {
    items: Mutex<Vec<T>>,
}

impl<T> DeferredQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item);
    }

    /// Take everything queued so far; the lock is held only for the swap
    pub(crate) fn take_all(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub(crate) fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(pred)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Count of commands queued or executing anywhere in the engine
#[derive(Clone)]
pub(crate) struct InFlightCounter {
    tx: Arc<watch::Sender<usize>>,
}

impl InFlightCounter {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn acquire(&self) -> InFlight {
        self.tx.send_modify(|n| *n += 1);
        InFlight {
            tx: Arc::clone(&self.tx),
        }
    }

    pub(crate) fn count(&self) -> usize {
        *self.tx.borrow()
    }

    /// Resolve once nothing is in flight
    pub(crate) async fn idle(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so this cannot fail
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// RAII in-flight marker; released when the command is finalized or dropped
pub(crate) struct InFlight {
    tx: Arc<watch::Sender<usize>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.tx.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// A command together with its in-flight guard
pub(crate) struct Queued {
    pub(crate) command: Command,
    pub(crate) guard: InFlight,
}

impl Queued {
    pub(crate) fn tag(&self) -> CommandKindTag {
        self.command.tag()
    }
}

/// The controller's queues
pub(crate) struct Queues {
    pub(crate) immediate: ImmediateQueue<Queued>,
    pub(crate) deferred: DeferredQueue<Queued>,
    pub(crate) in_flight: InFlightCounter,
    wake: Notify,
}

impl Queues {
    pub(crate) fn new() -> Self {
        Self {
            immediate: ImmediateQueue::new(),
            deferred: DeferredQueue::new(),
            in_flight: InFlightCounter::new(),
            wake: Notify::new(),
        }
    }

    /// Queue a new command for the next pass and interrupt the controller's sleep
    pub(crate) fn submit(&self, command: Command) {
        let guard = self.in_flight.acquire();
        self.immediate.push(Queued { command, guard });
        self.wake.notify_one();
    }

    /// Retry on the next pass
    pub(crate) fn defer(&self, queued: Queued) {
        self.deferred.push(queued);
    }

    /// True if a command with `tag` is waiting in either queue
    pub(crate) fn contains(&self, tag: CommandKindTag) -> bool {
        self.immediate.any(|q| q.tag() == tag) || self.deferred.any(|q| q.tag() == tag)
    }

    /// Wait for the next submit
    pub(crate) async fn notified(&self) {
        self.wake.notified().await
    }

    /// Interrupt the controller's sleep without queueing anything
    pub(crate) fn nudge(&self) {
        self.wake.notify_one();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
