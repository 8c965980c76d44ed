// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared engine context

use crate::background::HandlerSlot;
use crate::config::EngineConfig;
use crate::events::EventLog;
use crate::queue::Queues;
use crate::reporter::Reporter;
use dm_adapters::{AppStore, DeviceIdentity, InstallAdapter, ServerAdapter};
use dm_core::{Clock, CompletionSink};
use std::sync::atomic::{AtomicBool, Ordering};

/// External collaborators the engine drives
pub struct EngineDeps<S, V, I> {
    pub store: S,
    pub server: V,
    pub installer: I,
}

/// Everything a command needs while it runs.
///
/// Constructed once per engine and shared by the controller, the background
/// handler and completion callbacks.
pub(crate) struct Context<S, V, I, C> {
    pub(crate) store: S,
    pub(crate) server: V,
    pub(crate) installer: I,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
    pub(crate) queues: Queues,
    pub(crate) reporter: Reporter,
    pub(crate) events: EventLog,
    pub(crate) background: HandlerSlot,
    ready: AtomicBool,
}

impl<S, V, I, C> Context<S, V, I, C>
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    pub(crate) fn new(deps: EngineDeps<S, V, I>, clock: C, config: EngineConfig) -> Self {
        let ready = !config.require_enrollment;
        Self {
            store: deps.store,
            server: deps.server,
            installer: deps.installer,
            clock,
            config,
            queues: Queues::new(),
            reporter: Reporter::new(),
            events: EventLog::new(),
            background: HandlerSlot::default(),
            ready: AtomicBool::new(ready),
        }
    }

    /// True once the device is enrolled
    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn set_ready(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            tracing::info!(device_id = %self.config.device_id, "device ready");
            self.queues.nudge();
        }
    }

    pub(crate) fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            device_id: self.config.device_id.clone(),
            agent_version: self
                .config
                .agent_version
                .name
                .clone()
                .unwrap_or_else(|| self.config.agent_version.code.to_string()),
        }
    }

    /// Sink handed to the installer; completions are routed to the
    /// background handler that is waiting for them
    pub(crate) fn completion_sink(&self) -> CompletionSink {
        let slot = self.background.clone();
        CompletionSink::new(move |reference, code| {
            slot.wake(reference, code);
        })
    }
}
