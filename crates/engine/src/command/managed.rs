// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Install, update and uninstall of managed apps
//!
//! Bridges the queues and the app lifecycle: `accept` tracks the request
//! against the stored entity, `execute` walks it through download and
//! processing and triggers the installer, `complete` applies the
//! installer's verdict.

use super::{Acceptance, CommandKindTag};
use crate::context::Context;
use crate::error::CommandError;
use chrono::{DateTime, Utc};
use dm_adapters::{
    AppStore, InstallAdapter, InstallError, InstallRequest, ServerAdapter, Triggered,
    UninstallRequest,
};
use dm_core::app::{source_equals, version_differs};
use dm_core::{
    App, AppId, Category, Clock, CommandResult, CompletionCode, CompletionSink, Event, EventType,
    Outcome, Phase, ReferenceId, Source, Version,
};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Install,
    Uninstall,
}

/// How far `execute` got
#[derive(Debug)]
pub(crate) enum Execution {
    /// Installer is running; completion arrives later
    Started,
    /// Installer finished synchronously
    Finished(CompletionCode),
    /// Installer busy; try again next pass
    Busy,
}

/// The entity's verdict after a completion
pub(crate) struct Settled {
    pub(crate) error: Option<String>,
}

pub(crate) struct ManagedAction {
    action: Action,
    package: String,
    source: Option<Source>,
    version: Option<Version>,
    remote_id: Option<String>,
    category: Category,
    app_id: Option<AppId>,
    /// New source for an already-tracked app, merged during execute
    source_change: Option<Source>,
    download: Option<PathBuf>,
    /// The installer has been (or is being) triggered
    triggered: bool,
    phase: Option<Phase>,
    outcome: Option<Outcome>,
    reason: Option<String>,
}

impl ManagedAction {
    pub(crate) fn install(
        package: String,
        source: Source,
        version: Option<Version>,
        remote_id: Option<String>,
        category: Category,
    ) -> Self {
        Self {
            action: Action::Install,
            package,
            source: Some(source),
            version,
            remote_id,
            category,
            app_id: None,
            source_change: None,
            download: None,
            triggered: false,
            phase: None,
            outcome: None,
            reason: None,
        }
    }

    pub(crate) fn uninstall(package: String) -> Self {
        Self {
            action: Action::Uninstall,
            package,
            source: None,
            version: None,
            remote_id: None,
            category: Category::Managed,
            app_id: None,
            source_change: None,
            download: None,
            triggered: false,
            phase: None,
            outcome: None,
            reason: None,
        }
    }

    pub(crate) fn tag(&self) -> CommandKindTag {
        match (self.action, self.category) {
            (Action::Uninstall, _) => CommandKindTag::Uninstall,
            (Action::Install, Category::Agent) => CommandKindTag::SelfUpdate,
            (Action::Install, Category::Managed) => CommandKindTag::Install,
        }
    }

    /// Track the request against the stored entity and persist it
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
        let tracked = ctx.store.find_by_package(&self.package).await?;
        if self.action == Action::Uninstall && tracked.iter().any(|a| a.lifecycle.is_uninstalling())
        {
            tracing::info!(package = %self.package, "uninstall already in progress, dropping");
            return Ok(Acceptance::Dropped);
        }

        let mut app = match tracked.into_iter().find(|a| !a.lifecycle.is_uninstalling()) {
            Some(existing) => {
                if self.action == Action::Install
                    && version_differs(existing.version.as_ref(), self.version.as_ref())
                {
                    tracing::info!(
                        package = %self.package,
                        from = ?existing.version,
                        to = ?self.version,
                        "version changed"
                    );
                }
                if self.action == Action::Install
                    && !source_equals(existing.source.as_ref(), self.source.as_ref())
                {
                    tracing::info!(
                        package = %self.package,
                        from = ?existing.source,
                        to = ?self.source,
                        "source changed"
                    );
                    self.source_change = self.source.clone();
                }
                existing
            }
            None => self.new_app(),
        };

        if app.lifecycle.is_in_progress() && app.id.is_some() {
            // the current action runs first and owns the stored record; ours
            // re-enters when executed
            tracing::info!(
                package = %self.package,
                progress = ?app.lifecycle.progress(),
                "merged into in-progress action"
            );
            self.app_id = app.id;
            return Ok(Acceptance::Accepted);
        }
        self.enter(&mut app, &ctx.clock);
        self.app_id = Some(self.persist(ctx, &app).await?);
        Ok(Acceptance::Accepted)
    }

    pub(crate) async fn execute<S, V, I, C>(
        &mut self,
        ctx: &Context<S, V, I, C>,
        reference: &ReferenceId,
        sink: CompletionSink,
    ) -> Result<Execution, CommandError>
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let mut app = self.reload(ctx).await?;

        if !self.triggered {
            self.merge(&mut app);
            if !self.is_pending_for_us(&app) {
                self.enter(&mut app, &ctx.clock);
                self.persist(ctx, &app).await?;
            }
            self.phase = app.lifecycle.phase();

            let remote = match &app.source {
                Some(Source::RemoteFile { url, sha256 }) if self.action == Action::Install => {
                    Some((url.clone(), sha256.clone()))
                }
                _ => None,
            };
            if let Some((url, sha256)) = remote.filter(|_| self.download.is_none()) {
                app.downloading_started()?;
                self.persist(ctx, &app).await?;
                let path = ctx
                    .server
                    .fetch_package(&url, &ctx.config.download_dir)
                    .await?;
                self.download = Some(path.clone());
                if let Some(expected) = sha256 {
                    verify_sha256(&path, &expected).await?;
                }
            }

            app.processing_started(&ctx.clock)?;
            self.persist(ctx, &app).await?;
            self.triggered = true;
        }

        let triggered = match self.action {
            Action::Install => {
                let source = app
                    .source
                    .clone()
                    .ok_or_else(|| CommandError::AppMissing(self.package.clone()))?;
                let file = match &source {
                    Source::LocalFile { path } => Some(path.clone()),
                    Source::RemoteFile { .. } => self.download.clone(),
                    Source::Store { .. } => None,
                };
                let request = InstallRequest {
                    reference: reference.clone(),
                    package: self.package.clone(),
                    source,
                    version: app.version.clone(),
                    file,
                };
                ctx.installer.install(&request, sink).await
            }
            Action::Uninstall => {
                let request = UninstallRequest {
                    reference: reference.clone(),
                    package: self.package.clone(),
                };
                ctx.installer.uninstall(&request, sink).await
            }
        };

        match triggered {
            Ok(Triggered::Started) => Ok(Execution::Started),
            Ok(Triggered::Finished(code)) => Ok(Execution::Finished(code)),
            Err(InstallError::Busy) => {
                tracing::info!(package = %self.package, "installer busy, reprocessing");
                Ok(Execution::Busy)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply the installer's verdict to the entity
    pub(crate) async fn complete<S, V, I, C>(
        &mut self,
        ctx: &Context<S, V, I, C>,
        code: CompletionCode,
    ) -> Result<Settled, CommandError>
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let mut app = self.reload(ctx).await?;
        let (outcome, reason) = match code {
            CompletionCode::Success => (Outcome::Completed, None),
            CompletionCode::Failure { message } => (
                Outcome::Error,
                Some(message.unwrap_or_else(|| "installer reported failure".to_string())),
            ),
            CompletionCode::Cancelled => (Outcome::Cancelled, None),
        };

        app.completed(outcome, reason, &ctx.clock)?;
        self.phase = app.lifecycle.phase();
        self.outcome = Some(outcome);
        self.reason = app.reason.clone();

        match (self.action, outcome, app.id) {
            (Action::Uninstall, Outcome::Completed, Some(id)) => {
                ctx.store.delete(id).await?;
                tracing::info!(package = %self.package, "uninstalled, no longer tracked");
            }
            _ => {
                self.persist(ctx, &app).await?;
            }
        }

        Ok(Settled {
            error: match outcome {
                Outcome::Completed => None,
                Outcome::Error => self.reason.clone(),
                Outcome::Cancelled => Some(format!("{} cancelled", self.phase_name())),
            },
        })
    }

    /// Record a failure on the entity: error outcome and reason
    pub(crate) async fn fail<S, V, I, C>(&mut self, ctx: &Context<S, V, I, C>, error: &CommandError)
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        self.outcome = Some(Outcome::Error);
        self.reason = Some(error.to_string());

        let Ok(mut app) = self.reload(ctx).await else {
            return;
        };
        if !app.lifecycle.is_in_progress() {
            return;
        }
        if let Err(e) = app.completed(Outcome::Error, self.reason.clone(), &ctx.clock) {
            tracing::warn!(package = %self.package, error = %e, "could not record failure");
            return;
        }
        self.phase = app.lifecycle.phase();
        if let Err(e) = self.persist(ctx, &app).await {
            tracing::warn!(package = %self.package, error = %e, "could not persist failure");
        }
    }

    /// Audit event for the settled action; removes any temporary download
    pub(crate) fn finalize(&mut self, result: &CommandResult, now: DateTime<Utc>) -> Event {
        if let Some(path) = self.download.take() {
            remove_download(&path);
        }

        let action = self.phase_name();
        let (event_type, description) = match self.outcome {
            Some(Outcome::Completed) => (EventType::Info, format!("{} completed", action)),
            Some(Outcome::Cancelled) => (EventType::Warning, format!("{} cancelled", action)),
            Some(Outcome::Error) | None => (
                EventType::Error,
                format!(
                    "{} failed: {}",
                    action,
                    self.reason
                        .as_deref()
                        .or(result.error())
                        .unwrap_or("unknown error")
                ),
            ),
        };
        Event::new(event_type, action, "app", &self.package, description, now)
    }

    fn phase_name(&self) -> String {
        match (self.phase, self.action) {
            (Some(phase), _) => phase.to_string(),
            (None, Action::Install) => Phase::Install.to_string(),
            (None, Action::Uninstall) => Phase::Uninstall.to_string(),
        }
    }

    fn new_app(&self) -> App {
        let mut app = App::new(&self.package, self.category);
        app.source = self.source.clone();
        app.version = self.version.clone();
        app.remote_id = self.remote_id.clone();
        app
    }

    /// Fold this request's details into the stored entity
    fn merge(&mut self, app: &mut App) {
        if let Some(source) = self.source_change.take() {
            app.source = Some(source);
        }
        if self.action == Action::Install {
            if app.source.is_none() {
                app.source = self.source.clone();
            }
            if self.version.is_some() {
                app.version = self.version.clone();
            }
            if self.remote_id.is_some() {
                app.remote_id = self.remote_id.clone();
            }
            if self.category == Category::Agent {
                app.lifecycle.set_category(Category::Agent);
            }
        }
    }

    fn enter(&self, app: &mut App, clock: &impl Clock) {
        match self.action {
            Action::Install => {
                let phase = app.received(clock);
                tracing::debug!(package = %self.package, %phase, "action received");
            }
            Action::Uninstall => app.uninstall_received(clock),
        }
    }

    /// True if the entity is waiting at the pending step of this action's phase
    fn is_pending_for_us(&self, app: &App) -> bool {
        let phase_matches = match (self.action, app.lifecycle.phase()) {
            (Action::Install, Some(Phase::Install | Phase::Update)) => true,
            (Action::Uninstall, Some(Phase::Uninstall)) => true,
            _ => false,
        };
        phase_matches && app.lifecycle.is_pending()
    }

    async fn reload<S, V, I, C>(&self, ctx: &Context<S, V, I, C>) -> Result<App, CommandError>
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let id = self
            .app_id
            .ok_or_else(|| CommandError::AppMissing(self.package.clone()))?;
        ctx.store
            .get(id)
            .await?
            .ok_or_else(|| CommandError::AppMissing(self.package.clone()))
    }

    async fn persist<S, V, I, C>(
        &self,
        ctx: &Context<S, V, I, C>,
        app: &App,
    ) -> Result<AppId, CommandError>
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        match app.id {
            None => Ok(ctx.store.insert(app).await?),
            Some(id) => match ctx.store.update(app).await? {
                0 => Err(CommandError::AppMissing(self.package.clone())),
                _ => Ok(id),
            },
        }
    }
}

/// Compare a file's SHA-256 against an expected hex digest
async fn verify_sha256(path: &Path, expected: &str) -> Result<(), CommandError> {
    let path = path.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(std::io::Error::other)??;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(CommandError::Checksum {
            expected: expected.to_string(),
            actual,
        })
    }
}

fn remove_download(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove download"),
    }
}

#[cfg(test)]
#[path = "managed_tests.rs"]
mod tests;
