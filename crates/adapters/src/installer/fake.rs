// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake installer for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{InstallAdapter, InstallError, InstallRequest, Triggered, UninstallRequest};
use async_trait::async_trait;
use dm_core::{CompletionCode, CompletionSink, ReferenceId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Recorded installer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallCall {
    Install(InstallRequest),
    Uninstall(UninstallRequest),
}

impl InstallCall {
    pub fn reference(&self) -> &ReferenceId {
        match self {
            InstallCall::Install(r) => &r.reference,
            InstallCall::Uninstall(r) => &r.reference,
        }
    }
}

#[derive(Default)]
struct FakeInstallState {
    /// Finish synchronously with this code instead of deferring
    immediate: Option<CompletionCode>,
    busy: u32,
    fail: Option<String>,
    sinks: HashMap<ReferenceId, CompletionSink>,
}

/// Installer whose completions are delivered by the test.
///
/// By default every action starts and waits for [`FakeInstallAdapter::complete`].
#[derive(Clone, Default)]
pub struct FakeInstallAdapter {
    state: Arc<Mutex<FakeInstallState>>,
    calls: Arc<Mutex<Vec<InstallCall>>>,
}

impl FakeInstallAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<InstallCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Reference of the most recent call
    pub fn last_reference(&self) -> Option<ReferenceId> {
        self.calls().last().map(|c| c.reference().clone())
    }

    /// Finish every action synchronously with `code`
    pub fn set_immediate(&self, code: Option<CompletionCode>) {
        self.lock().immediate = code;
    }

    /// Report busy for the next `n` calls
    pub fn set_busy(&self, n: u32) {
        self.lock().busy = n;
    }

    /// Fail every call to start with `message`
    pub fn set_fail(&self, message: Option<&str>) {
        self.lock().fail = message.map(str::to_string);
    }

    /// Deliver the completion for a started action; false if none is pending
    pub fn complete(&self, reference: &ReferenceId, code: CompletionCode) -> bool {
        let sink = self.lock().sinks.remove(reference);
        match sink {
            Some(sink) => {
                sink.complete(reference.clone(), code);
                true
            }
            None => false,
        }
    }

    /// Number of started actions awaiting completion
    pub fn pending(&self) -> usize {
        self.lock().sinks.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeInstallState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn trigger(
        &self,
        call: InstallCall,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        let reference = call.reference().clone();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        let mut state = self.lock();
        if state.busy > 0 {
            state.busy -= 1;
            return Err(InstallError::Busy);
        }
        if let Some(message) = &state.fail {
            return Err(InstallError::Failed(message.clone()));
        }
        if let Some(code) = &state.immediate {
            return Ok(Triggered::Finished(code.clone()));
        }
        state.sinks.insert(reference, sink);
        Ok(Triggered::Started)
    }
}

#[async_trait]
impl InstallAdapter for FakeInstallAdapter {
    async fn install(
        &self,
        request: &InstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        self.trigger(InstallCall::Install(request.clone()), sink)
    }

    async fn uninstall(
        &self,
        request: &UninstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        self.trigger(InstallCall::Uninstall(request.clone()), sink)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
