// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The controller pass
//!
//! Each pass drains the deferred queue (everything in it at the start of the
//! pass) and then the immediate queue, routing blocking commands to the
//! background handler and running the rest inline. Until the device is
//! enrolled only enrollment commands run.

use crate::command::{Acceptance, Command, CommandKindTag, Disposition, TaskMode};
use crate::context::Context;
use crate::error::{CommandError, EngineError};
use crate::maintenance::Maintenance;
use crate::queue::Queued;
use dm_adapters::{AppStore, InstallAdapter, ServerAdapter};
use dm_core::Clock;
use std::sync::Arc;

pub(crate) struct Controller<S, V, I, C> {
    ctx: Arc<Context<S, V, I, C>>,
    /// Self-update waiting for everything else to finish
    parked: Option<Command>,
    maintenance: Maintenance,
}

impl<S, V, I, C> Controller<S, V, I, C>
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    pub(crate) fn new(ctx: Arc<Context<S, V, I, C>>) -> Self {
        Self {
            ctx,
            parked: None,
            maintenance: Maintenance::new(),
        }
    }

    pub(crate) fn has_parked(&self) -> bool {
        self.parked.is_some()
    }

    /// Requeue the parked self-update
    pub(crate) fn resume_parked(&mut self) {
        if let Some(command) = self.parked.take() {
            tracing::info!(reference = %command.reference(), "system idle, resuming self-update");
            self.ctx.queues.submit(command);
        }
    }

    /// One pass over the queues followed by maintenance
    pub(crate) async fn pass(&mut self) -> Result<(), EngineError> {
        if !self.ctx.is_ready() {
            return self.enrollment_pass().await;
        }

        for queued in self.ctx.queues.deferred.take_all() {
            self.process(queued).await?;
        }
        while let Some(queued) = self.ctx.queues.immediate.pop() {
            self.process(queued).await?;
        }

        self.maintenance.run(&self.ctx, self.parked.is_some()).await;
        self.ctx.background.release_completed();
        Ok(())
    }

    async fn enrollment_pass(&mut self) -> Result<(), EngineError> {
        for queued in self.ctx.queues.deferred.take_all() {
            if queued.tag() == CommandKindTag::Enroll {
                self.process(queued).await?;
            } else {
                self.ctx.queues.defer(queued);
            }
        }
        let enrollments = self
            .ctx
            .queues
            .immediate
            .drain_matching(|q| q.tag() == CommandKindTag::Enroll);
        for queued in enrollments {
            self.process(queued).await?;
        }
        Ok(())
    }

    async fn process(&mut self, queued: Queued) -> Result<(), EngineError> {
        let Queued { mut command, guard } = queued;

        if !command.is_accepted() {
            match command.accept(&self.ctx).await {
                Ok(Acceptance::Accepted) => {}
                Ok(Acceptance::Dropped) => return Ok(()),
                Err(e) => {
                    tracing::warn!(?command, error = %e, "command rejected");
                    command.fail(&e);
                    command.finalize(&self.ctx);
                    return Ok(());
                }
            }
        }

        // the self-update's own guard accounts for one
        let in_flight = self.ctx.queues.in_flight.count();
        if command.tag() == CommandKindTag::SelfUpdate && in_flight > 1 {
            tracing::info!(others = in_flight - 1, "self-update waiting for idle");
            drop(guard);
            if let Some(mut superseded) = self.parked.replace(command) {
                tracing::info!(reference = %superseded.reference(), "parked self-update superseded");
                superseded.fail(&CommandError::Superseded);
                superseded.finalize(&self.ctx);
            }
            return Ok(());
        }

        match command.mode() {
            TaskMode::Blocking => {
                self.ctx
                    .background
                    .hand_off(&self.ctx, Queued { command, guard });
                Ok(())
            }
            TaskMode::FireAndForget => match command.execute(&self.ctx).await {
                Disposition::Reprocess => {
                    self.ctx.queues.defer(Queued { command, guard });
                    Ok(())
                }
                Disposition::Ok | Disposition::Error => {
                    command.finalize(&self.ctx);
                    drop(guard);
                    if command.result().is_abort() {
                        return Err(EngineError::Aborted(
                            command.result().error().unwrap_or("aborted").to_string(),
                        ));
                    }
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
