// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background queue handler
//!
//! Runs blocking commands one at a time on its own task. A command whose
//! execution starts an external action parks the handler until the matching
//! completion arrives through [`HandlerSlot::wake`] (or the configured
//! timeout expires). Once its queue is empty and nothing is awaited the
//! handler completes and never accepts work again; the controller starts a
//! fresh one for the next blocking command.

use crate::command::Disposition;
use crate::context::Context;
use crate::queue::Queued;
use dm_adapters::{AppStore, InstallAdapter, ServerAdapter};
use dm_core::{Clock, CompletionCode, ReferenceId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// How many timed-out references are remembered for dropping late wakes
const EXPIRED_CAPACITY: usize = 64;

/// Lifecycle of a background handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerState {
    Initializing,
    Running,
    /// Awaiting an external completion
    Waiting,
    Complete,
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerState::Initializing => write!(f, "initializing"),
            HandlerState::Running => write!(f, "running"),
            HandlerState::Waiting => write!(f, "waiting"),
            HandlerState::Complete => write!(f, "complete"),
        }
    }
}

struct Waiter {
    reference: ReferenceId,
    tx: oneshot::Sender<CompletionCode>,
}

struct Slot {
    state: HandlerState,
    waiter: Option<Waiter>,
}

/// State shared between the handler task and its owners.
///
/// Enqueue, the waiter slot and the COMPLETE transition are all guarded by
/// `slot`, so nothing is ever accepted into a completing handler.
struct Shared {
    slot: Mutex<Slot>,
    tx: mpsc::UnboundedSender<Queued>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: HandlerState) {
        self.lock().state = state;
    }
}

/// Handle to one background handler task
#[derive(Clone)]
pub(crate) struct BackgroundHandler {
    shared: Arc<Shared>,
}

impl BackgroundHandler {
    /// Start a handler seeded with its first command
    pub(crate) fn spawn<S, V, I, C>(ctx: Arc<Context<S, V, I, C>>, first: Queued) -> Self
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        // the receiver is alive, so the seed cannot bounce
        let _ = tx.send(first);
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                state: HandlerState::Initializing,
                waiter: None,
            }),
            tx,
        });
        tokio::spawn(run(ctx, Arc::clone(&shared), rx));
        Self { shared }
    }

    /// Queue a command; a completed handler hands it back
    pub(crate) fn enqueue(&self, queued: Queued) -> Result<(), Queued> {
        let slot = self.shared.lock();
        if slot.state == HandlerState::Complete {
            return Err(queued);
        }
        self.shared.tx.send(queued).map_err(|e| e.0)
    }

    pub(crate) fn state(&self) -> HandlerState {
        self.shared.lock().state
    }

    /// Deliver an external completion to the awaited command
    pub(crate) fn wake(&self, reference: ReferenceId, code: CompletionCode) -> bool {
        let waiter = self.shared.lock().waiter.take();
        let Some(waiter) = waiter else {
            tracing::warn!(%reference, %code, "no command awaiting completion, dropping");
            return false;
        };
        if waiter.reference != reference {
            tracing::warn!(
                expected = %waiter.reference,
                received = %reference,
                "completion reference mismatch"
            );
        }
        if waiter.tx.send(code).is_err() {
            tracing::warn!(%reference, "awaiting command already gave up");
            return false;
        }
        true
    }
}

async fn run<S, V, I, C>(
    ctx: Arc<Context<S, V, I, C>>,
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<Queued>,
) where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    shared.set_state(HandlerState::Running);
    tracing::debug!("background handler started");

    loop {
        let next = {
            let mut slot = shared.lock();
            match rx.try_recv() {
                Ok(queued) => Some(queued),
                Err(_) => {
                    slot.state = HandlerState::Complete;
                    None
                }
            }
        };
        let Some(queued) = next else {
            break;
        };
        process(&ctx, &shared, queued).await;
    }

    tracing::debug!("background handler complete");
}

async fn process<S, V, I, C>(ctx: &Arc<Context<S, V, I, C>>, shared: &Shared, queued: Queued)
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    let Queued { mut command, guard } = queued;

    // registered before execute so a completion delivered during the
    // installer call is not lost
    let (tx, rx) = oneshot::channel();
    shared.lock().waiter = Some(Waiter {
        reference: command.reference().clone(),
        tx,
    });

    let disposition = command.execute(ctx).await;
    match disposition {
        Disposition::Reprocess => {
            shared.lock().waiter = None;
            ctx.queues.defer(Queued { command, guard });
            return;
        }
        Disposition::Ok if !command.is_completed() => {
            shared.set_state(HandlerState::Waiting);
            let code = match await_completion(rx, ctx.config.completion_timeout, command.reference()).await {
                Some(code) => code,
                None => {
                    // before the waiter is cleared, so a racing wake finds one or the other
                    ctx.background.expire(command.reference().clone());
                    CompletionCode::failure("timed out awaiting completion")
                }
            };
            {
                let mut slot = shared.lock();
                slot.waiter = None;
                slot.state = HandlerState::Running;
            }
            command.complete(ctx, code).await;
        }
        Disposition::Ok | Disposition::Error => {
            shared.lock().waiter = None;
        }
    }

    command.finalize(ctx);
    drop(guard);
}

/// `None` when the timeout expired
async fn await_completion(
    rx: oneshot::Receiver<CompletionCode>,
    timeout: Option<Duration>,
    reference: &ReferenceId,
) -> Option<CompletionCode> {
    let received = match timeout {
        Some(limit) => match tokio::time::timeout(limit, rx).await {
            Ok(received) => received,
            Err(_) => {
                tracing::warn!(%reference, timeout = ?limit, "timed out awaiting completion");
                return None;
            }
        },
        None => rx.await,
    };
    Some(received.unwrap_or_else(|_| CompletionCode::failure("completion channel closed")))
}

/// The controller's reference to the current background handler
#[derive(Clone, Default)]
pub(crate) struct HandlerSlot {
    current: Arc<Mutex<Option<BackgroundHandler>>>,
    /// References whose wait timed out, oldest first
    expired: Arc<Mutex<VecDeque<ReferenceId>>>,
}

impl HandlerSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<BackgroundHandler>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Give a blocking command to the current handler, starting a new one if
    /// there is none or it has completed
    pub(crate) fn hand_off<S, V, I, C>(&self, ctx: &Arc<Context<S, V, I, C>>, queued: Queued)
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let mut current = self.lock();
        let queued = match current.as_ref() {
            Some(handler) => match handler.enqueue(queued) {
                Ok(()) => return,
                Err(queued) => queued,
            },
            None => queued,
        };
        tracing::debug!("starting background handler");
        *current = Some(BackgroundHandler::spawn(Arc::clone(ctx), queued));
    }

    /// Remember a timed-out reference so its late completion is dropped
    pub(crate) fn expire(&self, reference: ReferenceId) {
        let mut expired = self.expired.lock().unwrap_or_else(|e| e.into_inner());
        if expired.len() == EXPIRED_CAPACITY {
            expired.pop_front();
        }
        expired.push_back(reference);
    }

    pub(crate) fn wake(&self, reference: ReferenceId, code: CompletionCode) -> bool {
        // held until delivered, so an expiry cannot slip in between the
        // check and taking the next command's waiter
        let expired = self.expired.lock().unwrap_or_else(|e| e.into_inner());
        if expired.contains(&reference) {
            tracing::warn!(%reference, %code, "late completion for timed-out command, dropping");
            return false;
        }
        let handler = self.lock().clone();
        match handler {
            Some(handler) => handler.wake(reference, code),
            None => {
                tracing::warn!(%reference, %code, "completion with no background handler, dropping");
                false
            }
        }
    }

    pub(crate) fn state(&self) -> Option<HandlerState> {
        self.lock().as_ref().map(|h| h.state())
    }

    /// Drop the reference to a handler that has completed
    pub(crate) fn release_completed(&self) {
        let mut current = self.lock();
        if current.as_ref().map(|h| h.state()) == Some(HandlerState::Complete) {
            *current = None;
        }
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
