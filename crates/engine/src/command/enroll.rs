// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device enrollment

use crate::context::Context;
use dm_adapters::{AppStore, InstallAdapter, ServerAdapter, ServerError};
use dm_core::Clock;

/// Registers the device; marks the engine ready on success
pub(crate) struct EnrollCommand {
    attempts: u32,
}

impl EnrollCommand {
    pub(crate) fn new() -> Self {
        Self { attempts: 0 }
    }

    /// Failed attempts so far
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

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
        match ctx.server.enroll(&ctx.identity()).await {
            Ok(()) => {
                ctx.set_ready();
                Ok(())
            }
            Err(e) => {
                self.attempts += 1;
                Err(e)
            }
        }
    }
}
