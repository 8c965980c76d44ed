// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External completion signals for asynchronous actions

use crate::id::ReferenceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Result code delivered when an external action finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletionCode {
    Success,
    Failure {
        #[serde(default)]
        message: Option<String>,
    },
    Cancelled,
}

impl CompletionCode {
    pub fn failure(message: impl Into<String>) -> Self {
        CompletionCode::Failure {
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CompletionCode::Success)
    }
}

impl fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionCode::Success => write!(f, "success"),
            CompletionCode::Failure {
                message: Some(message),
            } => write!(f, "failure: {}", message),
            CompletionCode::Failure { message: None } => write!(f, "failure"),
            CompletionCode::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Callback through which installers report completion of a started action
#[derive(Clone)]
pub struct CompletionSink {
    inner: Arc<dyn Fn(ReferenceId, CompletionCode) + Send + Sync>,
}

impl CompletionSink {
    pub fn new(f: impl Fn(ReferenceId, CompletionCode) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// A sink that discards every completion
    pub fn discard() -> Self {
        Self::new(|_, _| {})
    }

    pub fn complete(&self, reference: ReferenceId, code: CompletionCode) {
        (self.inner)(reference, code)
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
