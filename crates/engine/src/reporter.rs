// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batched upstream result reporting

use dm_adapters::ServerAdapter;
use dm_core::ResultEntry;
use std::sync::Mutex;

/// Result entries waiting to be submitted
#[derive(Default)]
pub(crate) struct Reporter {
    pending: Mutex<Vec<ResultEntry>>,
}

impl Reporter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, entry: ResultEntry) {
        tracing::debug!(key = ?entry.key(), status = ?entry.success, "result recorded");
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Submit everything recorded so far as one batch.
    ///
    /// On failure the batch is put back ahead of anything recorded meanwhile.
    pub(crate) async fn flush<V: ServerAdapter>(&self, server: &V, device_id: &str) -> bool {
        let batch = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        if batch.is_empty() {
            return true;
        }

        match server.submit_results(device_id, &batch).await {
            Ok(()) => {
                tracing::info!(count = batch.len(), "results reported");
                true
            }
            Err(e) => {
                tracing::warn!(count = batch.len(), error = %e, "result submission failed, will retry");
                let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
                let newer = std::mem::replace(&mut *pending, batch);
                pending.extend(newer);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
