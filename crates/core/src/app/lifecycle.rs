// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle state machine for managed apps
//!
//! An app moves through three phases (install, update, uninstall). Exactly one
//! phase is in progress at a time; each phase walks
//! `Pending -> [Downloading ->] Active -> Done(outcome)`. Whether the app is
//! installed is tracked separately so that a failed update leaves the prior
//! install intact.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle segment of a managed app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Install,
    Update,
    Uninstall,
}

/// Terminal result of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Error,
    Cancelled,
}

/// Position within a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Pending,
    Downloading,
    Active,
    Done(Outcome),
}

/// Orthogonal category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// An app managed on behalf of the organization
    #[default]
    Managed,
    /// The agent's own package
    Agent,
}

/// Current phase and step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub phase: Phase,
    pub step: Step,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Install => write!(f, "install"),
            Phase::Update => write!(f, "update"),
            Phase::Uninstall => write!(f, "uninstall"),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Error => write!(f, "error"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Pending => write!(f, "pending"),
            Step::Downloading => write!(f, "downloading"),
            Step::Active => write!(f, "active"),
            Step::Done(outcome) => write!(f, "{}", outcome),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.phase, self.step)
    }
}

/// A transition was requested from a state that does not allow it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} from {}", describe(.from))]
pub struct TransitionError {
    pub action: &'static str,
    pub from: Option<Progress>,
}

fn describe(progress: &Option<Progress>) -> String {
    match progress {
        Some(p) => p.to_string(),
        None => "untracked".to_string(),
    }
}

/// Lifecycle state of one app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lifecycle {
    progress: Option<Progress>,
    installed: bool,
    category: Category,
}

impl Lifecycle {
    pub fn new(category: Category) -> Self {
        Self {
            progress: None,
            installed: false,
            category,
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub fn phase(&self) -> Option<Phase> {
        self.progress.map(|p| p.phase)
    }

    pub fn step(&self) -> Option<Step> {
        self.progress.map(|p| p.step)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.step() {
            Some(Step::Done(outcome)) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.step() == Some(Step::Pending)
    }

    pub fn is_downloading(&self) -> bool {
        self.step() == Some(Step::Downloading)
    }

    pub fn is_active(&self) -> bool {
        self.step() == Some(Step::Active)
    }

    /// Pending, downloading, or active in any phase
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self.step(),
            Some(Step::Pending | Step::Downloading | Step::Active)
        )
    }

    pub fn is_done(&self) -> bool {
        self.outcome().is_some()
    }

    pub fn has_error(&self) -> bool {
        self.outcome() == Some(Outcome::Error)
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome() == Some(Outcome::Cancelled)
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn is_installing(&self) -> bool {
        self.phase() == Some(Phase::Install) && self.is_in_progress()
    }

    pub fn is_updating(&self) -> bool {
        self.phase() == Some(Phase::Update) && self.is_in_progress()
    }

    pub fn is_uninstalling(&self) -> bool {
        self.phase() == Some(Phase::Uninstall) && self.is_in_progress()
    }

    /// Enter `phase` at the pending step, replacing whatever phase was current
    pub fn enter(&mut self, phase: Phase) {
        self.progress = Some(Progress {
            phase,
            step: Step::Pending,
        });
    }

    /// Pending -> Downloading
    pub fn begin_download(&mut self) -> Result<(), TransitionError> {
        match self.progress {
            Some(Progress {
                phase,
                step: Step::Pending,
            }) => {
                self.progress = Some(Progress {
                    phase,
                    step: Step::Downloading,
                });
                Ok(())
            }
            from => Err(TransitionError {
                action: "start downloading",
                from,
            }),
        }
    }

    /// Pending | Downloading -> Active
    pub fn begin_processing(&mut self) -> Result<(), TransitionError> {
        match self.progress {
            Some(Progress {
                phase,
                step: Step::Pending | Step::Downloading,
            }) => {
                self.progress = Some(Progress {
                    phase,
                    step: Step::Active,
                });
                Ok(())
            }
            from => Err(TransitionError {
                action: "start processing",
                from,
            }),
        }
    }

    /// Downloading | Active -> Done(outcome)
    ///
    /// A pending phase may also finish, but only with a non-success outcome
    /// (the action failed or was cancelled before any work began).
    pub fn finish(&mut self, outcome: Outcome) -> Result<(), TransitionError> {
        let phase = match self.progress {
            Some(Progress {
                phase,
                step: Step::Downloading | Step::Active,
            }) => phase,
            Some(Progress {
                phase,
                step: Step::Pending,
            }) if outcome != Outcome::Completed => phase,
            from => {
                return Err(TransitionError {
                    action: "complete",
                    from,
                })
            }
        };

        if outcome == Outcome::Completed {
            self.installed = phase != Phase::Uninstall;
        }
        self.progress = Some(Progress {
            phase,
            step: Step::Done(outcome),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
