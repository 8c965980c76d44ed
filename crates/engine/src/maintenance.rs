// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-of-pass maintenance: result reporting, periodic sync, self-update checks

use crate::command::{Command, CommandKindTag};
use crate::context::Context;
use dm_adapters::{AppStore, InstallAdapter, Release, ServerAdapter};
use dm_core::{Clock, CommandPayload};
use std::time::{Duration, Instant};

/// Tracks when the periodic hooks last ran
#[derive(Default)]
pub(crate) struct Maintenance {
    last_sync: Option<Instant>,
    last_update_check: Option<Instant>,
}

impl Maintenance {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run once after every controller pass.
    ///
    /// `update_parked` is true while a self-update waits for the system to go
    /// idle, which suppresses another update check.
    pub(crate) async fn run<S, V, I, C>(&mut self, ctx: &Context<S, V, I, C>, update_parked: bool)
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        ctx.reporter.flush(&ctx.server, &ctx.config.device_id).await;

        let now = ctx.clock.now();
        if is_due(self.last_sync, ctx.config.sync_interval, now) {
            self.last_sync = Some(now);
            self.schedule_sync(ctx);
        }
        if is_due(self.last_update_check, ctx.config.self_update_interval, now) {
            self.last_update_check = Some(now);
            if !update_parked {
                check_for_update(ctx).await;
            }
        }
    }

    fn schedule_sync<S, V, I, C>(&self, ctx: &Context<S, V, I, C>)
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        if ctx.queues.contains(CommandKindTag::Sync) {
            tracing::debug!("sync already queued");
            return;
        }
        match Command::local(CommandPayload::Sync { id: None }, &ctx.config) {
            Ok(command) => ctx.queues.submit(command),
            Err(e) => tracing::error!(error = %e, "failed to build sync command"),
        }
    }
}

fn is_due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    last.map_or(true, |at| now.saturating_duration_since(at) >= interval)
}

async fn check_for_update<S, V, I, C>(ctx: &Context<S, V, I, C>)
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    if ctx.queues.contains(CommandKindTag::SelfUpdate) {
        tracing::debug!("self-update already queued");
        return;
    }

    let release = match ctx.server.latest_release().await {
        Ok(Some(release)) => release,
        Ok(None) => {
            tracing::debug!("no release published");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "self-update check failed");
            return;
        }
    };
    if release.version.code <= ctx.config.agent_version.code {
        tracing::debug!(latest = release.version.code, "agent up to date");
        return;
    }

    match ctx.store.find_by_package(&ctx.config.agent_package).await {
        Ok(tracked) => {
            if tracked.iter().any(|a| a.lifecycle.is_in_progress()) {
                tracing::debug!("self-update already in progress");
                return;
            }
            let installed = tracked.iter().any(|a| {
                a.lifecycle.is_installed()
                    && a.version.as_ref().map(|v| v.code) >= Some(release.version.code)
            });
            if installed {
                tracing::debug!(latest = release.version.code, "release already installed");
                return;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not inspect agent package");
            return;
        }
    }

    submit_update(ctx, release);
}

fn submit_update<S, V, I, C>(ctx: &Context<S, V, I, C>, release: Release)
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    tracing::info!(
        current = ctx.config.agent_version.code,
        latest = release.version.code,
        "agent update available"
    );
    let payload = CommandPayload::SelfUpdate {
        id: None,
        source: release.source,
        version: release.version,
    };
    match Command::local(payload, &ctx.config) {
        Ok(command) => ctx.queues.submit(command),
        Err(e) => tracing::error!(error = %e, "failed to build self-update command"),
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
