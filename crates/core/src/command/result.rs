// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command results and the upstream result entries built from them

use serde::{Deserialize, Serialize};

/// The primary signal of a [`CommandResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Success,
    Failed,
    Pending,
    /// Process-fatal: the agent cannot continue
    Abort,
}

/// Outcome record of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    success: bool,
    pending: bool,
    abort: bool,
    error: Option<String>,
    code: Option<i32>,
}

impl CommandResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(&mut self) {
        self.success = true;
        self.pending = false;
        self.error = None;
        self.code = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.pending = false;
        self.error = Some(error.into());
    }

    pub fn fail_with_code(&mut self, error: impl Into<String>, code: i32) {
        self.fail(error);
        self.code = Some(code);
    }

    /// Accepted upstream but not yet finished
    pub fn mark_pending(&mut self) {
        self.success = false;
        self.pending = true;
        self.error = None;
    }

    /// Fail and escalate as process-fatal
    pub fn abort(&mut self, error: impl Into<String>) {
        self.fail(error);
        self.abort = true;
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_abort(&self) -> bool {
        self.abort
    }

    /// Only set when the command did not succeed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Abort outranks pending, which outranks success
    pub fn signal(&self) -> Signal {
        if self.abort {
            Signal::Abort
        } else if self.pending {
            Signal::Pending
        } else if self.success {
            Signal::Success
        } else {
            Signal::Failed
        }
    }
}

/// Upstream status string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Failed,
    Pending,
}

impl From<Signal> for ResultStatus {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Success => ResultStatus::Success,
            Signal::Pending => ResultStatus::Pending,
            Signal::Failed | Signal::Abort => ResultStatus::Failed,
        }
    }
}

/// One entry of the batched result submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    pub success: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEntry {
    /// Entry keyed by a device command id
    pub fn for_command(id: impl Into<String>, result: &CommandResult) -> Self {
        Self {
            command_id: Some(id.into()),
            activity_id: None,
            success: result.signal().into(),
            error: result.error().map(str::to_string),
        }
    }

    /// Entry keyed by an app activity id
    pub fn for_activity(id: impl Into<String>, result: &CommandResult) -> Self {
        Self {
            command_id: None,
            activity_id: Some(id.into()),
            success: result.signal().into(),
            error: result.error().map(str::to_string),
        }
    }

    /// The id this entry reports on
    pub fn key(&self) -> Option<&str> {
        self.command_id
            .as_deref()
            .or(self.activity_id.as_deref())
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
