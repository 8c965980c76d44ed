// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fetch pending commands from the server

use super::Command;
use crate::context::Context;
use dm_adapters::{AppStore, InstallAdapter, ServerAdapter, ServerError};
use dm_core::Clock;

/// Fetches pending payloads and submits them in order
pub(crate) struct SyncCommand;

impl SyncCommand {
    pub(crate) async fn execute<S, V, I, C>(
        &mut self,
        ctx: &Context<S, V, I, C>,
    ) -> Result<(), ServerError>
    where
        S: AppStore,
        V: ServerAdapter,
        I: InstallAdapter,
        C: Clock,
    {
        let payloads = ctx
            .server
            .fetch_pending_commands(&ctx.config.device_id)
            .await?;
        let fetched = payloads.len();
        let mut submitted = 0;

        for payload in payloads {
            match Command::from_payload(payload.clone(), &ctx.config) {
                Ok(command) => {
                    ctx.queues.submit(command);
                    submitted += 1;
                }
                Err(e) => match Command::rejected_entry(&payload, &e) {
                    Some(entry) => {
                        tracing::warn!(id = ?entry.key(), error = %e, "rejecting command");
                        ctx.reporter.record(entry);
                    }
                    None => tracing::warn!(error = %e, %payload, "ignoring unparseable command"),
                },
            }
        }

        tracing::info!(fetched, submitted, "sync complete");
        Ok(())
    }
}
