// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands: units of work with an accept/execute/complete/finalize contract

mod enroll;
mod managed;
mod sync;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::CommandError;
use dm_adapters::{AppStore, InstallAdapter, ServerAdapter};
use dm_core::{
    Category, Clock, CommandPayload, CommandResult, CompletionCode, Event, EventType,
    PayloadError, ReferenceId, ResultEntry,
};
use enroll::EnrollCommand;
use managed::{Execution, ManagedAction};
use std::fmt;
use sync::SyncCommand;
use tracing::Instrument;

/// Where a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Runs on the background handler and may await an external completion
    Blocking,
    /// Runs inline on the controller
    FireAndForget,
}

/// Closed set of command kinds, used for selective draining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKindTag {
    Enroll,
    Sync,
    Install,
    Uninstall,
    SelfUpdate,
}

impl fmt::Display for CommandKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKindTag::Enroll => write!(f, "enroll"),
            CommandKindTag::Sync => write!(f, "sync"),
            CommandKindTag::Install => write!(f, "install"),
            CommandKindTag::Uninstall => write!(f, "uninstall"),
            CommandKindTag::SelfUpdate => write!(f, "self_update"),
        }
    }
}

/// What the queue owner does after `execute`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    Ok,
    /// Not actionable yet; retry on the next pass without finalizing
    Reprocess,
    Error,
}

/// Result of `accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acceptance {
    Accepted,
    /// Redundant; discard without finalizing
    Dropped,
}

/// Which id field the upstream result entry uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKey {
    Command,
    Activity,
}

enum CommandKind {
    Enroll(EnrollCommand),
    Sync(SyncCommand),
    Managed(ManagedAction),
}

/// A unit of work
pub struct Command {
    id: Option<String>,
    mode: TaskMode,
    completed: bool,
    result: CommandResult,
    report: Option<ReportKey>,
    reference: ReferenceId,
    payload: serde_json::Value,
    kind: CommandKind,
    accepted: bool,
}

impl Command {
    /// Build a command from an inbound `{ "cmd": ... }` payload
    pub fn from_payload(
        payload: serde_json::Value,
        config: &EngineConfig,
    ) -> Result<Self, PayloadError> {
        let parsed = CommandPayload::parse(&payload)?;
        let id = parsed.id().map(str::to_string);
        let (mode, report, kind) = match parsed {
            CommandPayload::Enroll { .. } => (
                TaskMode::FireAndForget,
                ReportKey::Command,
                CommandKind::Enroll(EnrollCommand::new()),
            ),
            CommandPayload::Sync { .. } => (
                TaskMode::FireAndForget,
                ReportKey::Command,
                CommandKind::Sync(SyncCommand),
            ),
            CommandPayload::InstallApp {
                package,
                source,
                version,
                remote_id,
                ..
            } => {
                let category = if package == config.agent_package {
                    Category::Agent
                } else {
                    Category::Managed
                };
                (
                    TaskMode::Blocking,
                    ReportKey::Activity,
                    CommandKind::Managed(ManagedAction::install(
                        package, source, version, remote_id, category,
                    )),
                )
            }
            CommandPayload::UninstallApp { package, .. } => (
                TaskMode::Blocking,
                ReportKey::Activity,
                CommandKind::Managed(ManagedAction::uninstall(package)),
            ),
            CommandPayload::SelfUpdate {
                source, version, ..
            } => (
                TaskMode::Blocking,
                ReportKey::Command,
                CommandKind::Managed(ManagedAction::install(
                    config.agent_package.clone(),
                    source,
                    Some(version),
                    None,
                    Category::Agent,
                )),
            ),
        };

        // sync is never reported; others only when upstream gave an id
        let report = match &kind {
            CommandKind::Sync(_) => None,
            _ => id.as_ref().map(|_| report),
        };

        Ok(Self {
            id,
            mode,
            completed: false,
            result: CommandResult::new(),
            report,
            reference: ReferenceId::generate(),
            payload,
            kind,
            accepted: false,
        })
    }

    /// Build a command the engine raises itself
    pub(crate) fn local(payload: CommandPayload, config: &EngineConfig) -> Result<Self, PayloadError> {
        Self::from_payload(serde_json::to_value(&payload)?, config)
    }

    /// Result entry for a payload that could not be parsed, if it carries an id
    pub(crate) fn rejected_entry(
        payload: &serde_json::Value,
        error: &PayloadError,
    ) -> Option<ResultEntry> {
        let id = CommandPayload::raw_id(payload)?;
        let mut result = CommandResult::new();
        result.fail(error.to_string());
        let activity = matches!(
            payload.get("cmd").and_then(|c| c.as_str()),
            Some("install_app" | "uninstall_app")
        );
        Some(if activity {
            ResultEntry::for_activity(id, &result)
        } else {
            ResultEntry::for_command(id, &result)
        })
    }

    pub fn tag(&self) -> CommandKindTag {
        match &self.kind {
            CommandKind::Enroll(_) => CommandKindTag::Enroll,
            CommandKind::Sync(_) => CommandKindTag::Sync,
            CommandKind::Managed(action) => action.tag(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    pub fn reference(&self) -> &ReferenceId {
        &self.reference
    }

    pub fn result(&self) -> &CommandResult {
        &self.result
    }

    /// The original request payload
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn reports(&self) -> bool {
        self.report.is_some()
    }

    pub(crate) fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Capture an error raised outside `execute`
    pub(crate) fn fail(&mut self, error: &CommandError) {
        self.result.fail(error.to_string());
        self.completed = true;
    }

    /// Runs once, before the first execution
    pub(crate) async fn accept<S, V, I, C>(
        &mut self,
        ctx: &Context<S, V, I, C>,
    ) -> Result<Acceptance, CommandError>
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        self.accepted = true;
        match &mut self.kind {
            CommandKind::Managed(action) => action.accept(ctx).await,
            CommandKind::Enroll(_) | CommandKind::Sync(_) => Ok(Acceptance::Accepted),
        }
    }

    pub(crate) async fn execute<S, V, I, C>(&mut self, ctx: &Context<S, V, I, C>) -> Disposition
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let span = tracing::info_span!(
            "command",
            kind = %self.tag(),
            id = self.id.as_deref().unwrap_or("-"),
            reference = %self.reference,
        );
        async {
            tracing::debug!("executing");
            let start = std::time::Instant::now();
            let disposition = self.execute_inner(ctx).await;
            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                ?disposition,
                completed = self.completed,
                "executed"
            );
            disposition
        }
        .instrument(span)
        .await
    }

    async fn execute_inner<S, V, I, C>(&mut self, ctx: &Context<S, V, I, C>) -> Disposition
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        match &mut self.kind {
            CommandKind::Enroll(enroll) => match enroll.execute(ctx).await {
                Ok(()) => {
                    self.result.succeed();
                    self.completed = true;
                    Disposition::Ok
                }
                Err(e) if enroll.attempts() < ctx.config.enroll_max_attempts => {
                    tracing::warn!(
                        attempt = enroll.attempts(),
                        max = ctx.config.enroll_max_attempts,
                        error = %e,
                        "enrollment failed, will retry"
                    );
                    Disposition::Reprocess
                }
                Err(e) => {
                    self.result.abort(format!(
                        "enrollment failed after {} attempts: {}",
                        enroll.attempts(),
                        e
                    ));
                    self.completed = true;
                    Disposition::Error
                }
            },

            CommandKind::Sync(sync) => {
                let outcome = sync.execute(ctx).await;
                self.completed = true;
                match outcome {
                    Ok(()) => {
                        self.result.succeed();
                        Disposition::Ok
                    }
                    Err(e) => {
                        self.result.fail(e.to_string());
                        Disposition::Error
                    }
                }
            }

            CommandKind::Managed(action) => {
                let sink = ctx.completion_sink();
                match action.execute(ctx, &self.reference, sink).await {
                    Ok(Execution::Started) => Disposition::Ok,
                    Ok(Execution::Busy) => Disposition::Reprocess,
                    Ok(Execution::Finished(code)) => {
                        self.complete(ctx, code).await;
                        if self.result.is_success() {
                            Disposition::Ok
                        } else {
                            Disposition::Error
                        }
                    }
                    Err(e) => {
                        action.fail(ctx, &e).await;
                        self.result.fail(e.to_string());
                        self.completed = true;
                        Disposition::Error
                    }
                }
            }
        }
    }

    /// Apply an external completion
    pub(crate) async fn complete<S, V, I, C>(
        &mut self,
        ctx: &Context<S, V, I, C>,
        code: CompletionCode,
    ) where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        self.completed = true;
        let CommandKind::Managed(action) = &mut self.kind else {
            return;
        };
        match action.complete(ctx, code).await {
            Ok(settled) => match settled.error {
                None => self.result.succeed(),
                Some(error) => self.result.fail(error),
            },
            Err(e) => {
                tracing::error!(reference = %self.reference, error = %e, "failed to apply completion");
                action.fail(ctx, &e).await;
                self.result.fail(e.to_string());
            }
        }
    }

    /// Settle the result: audit event, cleanup, upstream entry
    pub(crate) fn finalize<S, V, I, C>(&mut self, ctx: &Context<S, V, I, C>)
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let now = ctx.clock.utc_now();
        let event = match &mut self.kind {
            CommandKind::Managed(action) => Some(action.finalize(&self.result, now)),
            CommandKind::Enroll(_) => Some(if self.result.is_success() {
                Event::new(
                    EventType::Info,
                    "enroll",
                    "device",
                    &ctx.config.device_id,
                    "device enrolled",
                    now,
                )
            } else {
                Event::new(
                    EventType::Error,
                    "enroll",
                    "device",
                    &ctx.config.device_id,
                    self.result.error().unwrap_or("enrollment failed"),
                    now,
                )
            }),
            CommandKind::Sync(_) if !self.result.is_success() => Some(Event::new(
                EventType::Warning,
                "sync",
                "device",
                &ctx.config.device_id,
                self.result.error().unwrap_or("sync failed"),
                now,
            )),
            CommandKind::Sync(_) => None,
        };
        if let Some(event) = event {
            ctx.events.emit(event);
        }

        if let (Some(key), Some(id)) = (self.report, &self.id) {
            let entry = match key {
                ReportKey::Command => ResultEntry::for_command(id.clone(), &self.result),
                ReportKey::Activity => ResultEntry::for_activity(id.clone(), &self.result),
            };
            ctx.reporter.record(entry);
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("tag", &self.tag())
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("reference", &self.reference)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
