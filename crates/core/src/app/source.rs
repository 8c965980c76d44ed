// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package sources and version descriptors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a package comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// A package file already present on the device
    LocalFile { path: PathBuf },
    /// A package file that must be downloaded first
    RemoteFile {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
    /// A package installed through the platform app store
    Store { id: String },
}

/// Install-type tag of a [`Source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallType {
    LocalFile,
    RemoteFile,
    Store,
}

impl Source {
    pub fn install_type(&self) -> InstallType {
        match self {
            Source::LocalFile { .. } => InstallType::LocalFile,
            Source::RemoteFile { .. } => InstallType::RemoteFile,
            Source::Store { .. } => InstallType::Store,
        }
    }

    /// The resolved descriptor string (path, URL, or store id)
    pub fn descriptor(&self) -> String {
        match self {
            Source::LocalFile { path } => path.display().to_string(),
            Source::RemoteFile { url, .. } => url.clone(),
            Source::Store { id } => id.clone(),
        }
    }

    pub fn is_remote_file(&self) -> bool {
        matches!(self, Source::RemoteFile { .. })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::LocalFile { path } => write!(f, "file:{}", path.display()),
            Source::RemoteFile { url, .. } => write!(f, "remote:{}", url),
            Source::Store { id } => write!(f, "store:{}", id),
        }
    }
}

/// Version descriptor of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Version {
    pub fn new(code: i64) -> Self {
        Self {
            code,
            code_string: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_code_string(mut self, code_string: impl Into<String>) -> Self {
        self.code_string = Some(code_string.into());
        self
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

/// True iff both sources have the same install type and descriptor.
///
/// Null on exactly one side is always different; null on both sides is the same.
pub fn source_equals(a: Option<&Source>, b: Option<&Source>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.install_type() == b.install_type() && a.descriptor() == b.descriptor()
        }
        _ => false,
    }
}

/// True iff the versions differ, meaning an update is actually needed.
///
/// Compares the version code, then the code string and name. Null on exactly
/// one side always differs; null on both sides does not.
pub fn version_differs(a: Option<&Version>, b: Option<&Version>) -> bool {
    match (a, b) {
        (None, None) => false,
        (Some(a), Some(b)) => {
            a.code != b.code
                || optional_differs(a.code_string.as_deref(), b.code_string.as_deref())
                || optional_differs(a.name.as_deref(), b.name.as_deref())
        }
        _ => true,
    }
}

fn optional_differs(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => false,
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
