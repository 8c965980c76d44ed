// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level command types

mod payload;
mod result;

pub use payload::{CommandPayload, PayloadError};
pub use result::{CommandResult, ResultEntry, ResultStatus, Signal};
