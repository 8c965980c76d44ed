// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public engine handle

use crate::background::HandlerState;
use crate::command::{Command, CommandKindTag};
use crate::config::EngineConfig;
use crate::context::{Context, EngineDeps};
use crate::controller::Controller;
use crate::error::EngineError;
use dm_adapters::{AppStore, InstallAdapter, ServerAdapter, StoreError};
use dm_core::{App, Clock, CommandPayload, CompletionCode, CompletionSink, Event, PayloadError, ReferenceId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Snapshot of the engine's queues and readiness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub immediate: usize,
    pub deferred: usize,
    pub in_flight: usize,
    /// State of the current background handler, if any
    pub background: Option<HandlerState>,
    /// Result entries not yet reported upstream
    pub pending_results: usize,
}

/// Handle to a command engine.
///
/// Cheap to clone; every clone drives the same queues.
pub struct Engine<S, V, I, C> {
    ctx: Arc<Context<S, V, I, C>>,
    stop: Arc<watch::Sender<bool>>,
    running: Arc<AtomicBool>,
}

impl<S, V, I, C> Clone for Engine<S, V, I, C> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            stop: Arc::clone(&self.stop),
            running: Arc::clone(&self.running),
        }
    }
}

impl<S, V, I, C> Engine<S, V, I, C>
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    pub fn new(deps: EngineDeps<S, V, I>, clock: C, config: EngineConfig) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            ctx: Arc::new(Context::new(deps, clock, config)),
            stop: Arc::new(stop),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Queue an inbound `{ "cmd": ... }` payload for the next pass
    pub fn submit(&self, payload: serde_json::Value) -> Result<(), PayloadError> {
        let command = Command::from_payload(payload, &self.ctx.config)?;
        tracing::debug!(?command, "submitted");
        self.ctx.queues.submit(command);
        Ok(())
    }

    /// Deliver an external completion for the awaited command
    pub fn wake(&self, reference: ReferenceId, code: CompletionCode) -> bool {
        self.ctx.background.wake(reference, code)
    }

    /// Sink that routes completions to [`Engine::wake`]
    pub fn completion_sink(&self) -> CompletionSink {
        self.ctx.completion_sink()
    }

    pub fn status(&self) -> EngineStatus {
        let queues = &self.ctx.queues;
        EngineStatus {
            ready: self.ctx.is_ready(),
            immediate: queues.immediate.len(),
            deferred: queues.deferred.len(),
            in_flight: queues.in_flight.count(),
            background: self.ctx.background.state(),
            pending_results: self.ctx.reporter.pending(),
        }
    }

    /// Recent audit events, oldest first
    pub fn events(&self) -> Vec<Event> {
        self.ctx.events.recent()
    }

    /// Every tracked app
    pub async fn apps(&self) -> Result<Vec<App>, StoreError> {
        self.ctx.store.load_all().await
    }

    /// Run the controller loop on its own task
    pub fn start(&self) -> JoinHandle<Result<(), EngineError>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.run().await })
    }

    /// Stop the controller loop after the current pass
    pub fn shutdown(&self) {
        tracing::info!("engine shutdown requested");
        self.stop.send_replace(true);
        self.ctx.queues.nudge();
    }

    /// Controller loop: a pass, then sleep until the interval elapses, a
    /// command is submitted, or a parked self-update can proceed
    pub async fn run(&self) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }
        let result = self.run_loop().await;
        self.running.store(false, Ordering::SeqCst);
        match &result {
            Ok(()) => tracing::info!("engine stopped"),
            Err(e) => tracing::error!(error = %e, "engine stopped"),
        }
        result
    }

    async fn run_loop(&self) -> Result<(), EngineError> {
        let ctx = &self.ctx;
        let mut controller = Controller::new(Arc::clone(ctx));
        let mut stop = self.stop.subscribe();

        if !ctx.is_ready() && !ctx.queues.contains(CommandKindTag::Enroll) {
            match Command::local(CommandPayload::Enroll { id: None }, &ctx.config) {
                Ok(command) => ctx.queues.submit(command),
                Err(e) => tracing::error!(error = %e, "failed to build enroll command"),
            }
        }
        tracing::info!(ready = ctx.is_ready(), "engine started");

        loop {
            if *stop.borrow_and_update() {
                return Ok(());
            }
            controller.pass().await?;

            let interval = if ctx.is_ready() {
                ctx.config.steady_interval
            } else {
                ctx.config.startup_interval
            };
            let parked = controller.has_parked();
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = ctx.queues.notified() => {}
                _ = stop.changed() => {}
                _ = ctx.queues.in_flight.idle(), if parked => {
                    controller.resume_parked();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
