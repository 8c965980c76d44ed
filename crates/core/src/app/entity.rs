// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed app entity

use super::lifecycle::{Category, Lifecycle, Outcome, Phase, TransitionError};
use super::source::{source_equals, version_differs, Source, Version};
use crate::clock::Clock;
use crate::id::AppId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps recorded across an app's lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub install_queued: Option<DateTime<Utc>>,
    pub update_queued: Option<DateTime<Utc>>,
    pub uninstall_queued: Option<DateTime<Utc>>,
    pub action_received: Option<DateTime<Utc>>,
    pub action_started: Option<DateTime<Utc>>,
    pub action_finished: Option<DateTime<Utc>>,
}

/// An app tracked by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// Local identity, assigned on first persistence
    pub id: Option<AppId>,
    pub remote_id: Option<String>,
    /// Package name, the natural key
    pub package: String,
    pub lifecycle: Lifecycle,
    pub source: Option<Source>,
    pub version: Option<Version>,
    #[serde(default)]
    pub timestamps: Timestamps,
    /// Set iff the current outcome is an error
    pub reason: Option<String>,
}

impl App {
    pub fn new(package: impl Into<String>, category: Category) -> Self {
        Self {
            id: None,
            remote_id: None,
            package: package.into(),
            lifecycle: Lifecycle::new(category),
            source: None,
            version: None,
            timestamps: Timestamps::default(),
            reason: None,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    pub fn category(&self) -> Category {
        self.lifecycle.category()
    }

    /// An install or update request arrived.
    ///
    /// Becomes an update when the app is already installed from an earlier
    /// install and is not currently mid-install; otherwise an install.
    pub fn received(&mut self, clock: &impl Clock) -> Phase {
        let phase = if self.lifecycle.is_installed()
            && self.timestamps.install_queued.is_some()
            && !self.lifecycle.is_installing()
        {
            Phase::Update
        } else {
            Phase::Install
        };

        let now = clock.utc_now();
        self.reason = None;
        self.lifecycle.enter(phase);
        match phase {
            Phase::Update => self.timestamps.update_queued = Some(now),
            _ => self.timestamps.install_queued = Some(now),
        }
        self.begin_action(now);
        phase
    }

    /// An uninstall request arrived
    pub fn uninstall_received(&mut self, clock: &impl Clock) {
        let now = clock.utc_now();
        self.reason = None;
        self.lifecycle.enter(Phase::Uninstall);
        self.timestamps.uninstall_queued = Some(now);
        self.begin_action(now);
    }

    /// Pending -> Downloading
    pub fn downloading_started(&mut self) -> Result<(), TransitionError> {
        self.lifecycle.begin_download()
    }

    /// Pending | Downloading -> Active
    pub fn processing_started(&mut self, clock: &impl Clock) -> Result<(), TransitionError> {
        self.lifecycle.begin_processing()?;
        self.timestamps.action_started = Some(self.stamp(clock));
        Ok(())
    }

    /// Settle the current phase with `outcome`.
    ///
    /// The reason is kept only for [`Outcome::Error`] and cleared otherwise.
    pub fn completed(
        &mut self,
        outcome: Outcome,
        reason: Option<String>,
        clock: &impl Clock,
    ) -> Result<(), TransitionError> {
        self.lifecycle.finish(outcome)?;
        self.timestamps.action_finished = Some(self.stamp(clock));
        self.reason = match outcome {
            Outcome::Error => Some(reason.unwrap_or_else(|| "unknown error".to_string())),
            Outcome::Completed | Outcome::Cancelled => None,
        };
        Ok(())
    }

    /// True iff both apps have the same install type and source descriptor
    pub fn source_equals(&self, other: &App) -> bool {
        source_equals(self.source.as_ref(), other.source.as_ref())
    }

    /// True iff installing `other` over `self` would change the version
    pub fn version_differs(&self, other: &App) -> bool {
        version_differs(self.version.as_ref(), other.version.as_ref())
    }

    fn begin_action(&mut self, now: DateTime<Utc>) {
        self.timestamps.action_received = Some(now);
        self.timestamps.action_started = None;
        self.timestamps.action_finished = None;
    }

    // Never earlier than the latest stamp of the current action
    fn stamp(&self, clock: &impl Clock) -> DateTime<Utc> {
        let now = clock.utc_now();
        [
            self.timestamps.action_received,
            self.timestamps.action_started,
        ]
        .into_iter()
        .flatten()
        .fold(now, |acc, t| acc.max(t))
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
