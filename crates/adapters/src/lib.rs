// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external collaborators: persistence, server, installer

pub mod installer;
pub mod server;
pub mod store;
pub mod traced;

pub use installer::{
    InstallAdapter, InstallError, InstallRequest, NoOpInstallAdapter, ScriptInstallAdapter,
    Triggered, UninstallRequest,
};
pub use server::{
    DeviceIdentity, HttpServerAdapter, NoOpServerAdapter, Release, ServerAdapter, ServerError,
};
pub use store::{AppStore, StoreError};
pub use traced::{TracedInstallAdapter, TracedServerAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use installer::{FakeInstallAdapter, InstallCall};
#[cfg(any(test, feature = "test-support"))]
pub use server::{FakeServerAdapter, ServerCall};
#[cfg(any(test, feature = "test-support"))]
pub use store::{FakeAppStore, StoreCall};
