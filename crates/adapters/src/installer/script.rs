// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell-command installer
//!
//! Install and uninstall are shell command templates. Placeholders are
//! replaced with single-quoted values:
//! `{package}`, `{file}`, `{url}`, `{store_id}`, `{version}`.

use super::{InstallAdapter, InstallError, InstallRequest, Triggered, UninstallRequest};
use async_trait::async_trait;
use dm_core::{CompletionCode, CompletionSink, ReferenceId, Source};
use std::sync::{Arc, Mutex};
use tokio::process::Command;

/// Runs one installer command at a time and reports its exit through the sink
#[derive(Clone)]
pub struct ScriptInstallAdapter {
    install_template: String,
    uninstall_template: String,
    running: Arc<Mutex<Option<ReferenceId>>>,
}

impl ScriptInstallAdapter {
    pub fn new(install_template: impl Into<String>, uninstall_template: impl Into<String>) -> Self {
        Self {
            install_template: install_template.into(),
            uninstall_template: uninstall_template.into(),
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Reference of the action currently running, if any
    pub fn running(&self) -> Option<ReferenceId> {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn launch(
        &self,
        script: String,
        reference: ReferenceId,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return Err(InstallError::Busy);
        }

        let child = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| InstallError::Spawn(e.to_string()))?;
        *running = Some(reference.clone());
        drop(running);

        let slot = Arc::clone(&self.running);
        tokio::spawn(async move {
            let code = match child.wait_with_output().await {
                Ok(output) if output.status.success() => CompletionCode::Success,
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let detail = stderr.lines().rev().find(|l| !l.trim().is_empty());
                    let status = match output.status.code() {
                        Some(code) => format!("exit status {}", code),
                        None => "terminated by signal".to_string(),
                    };
                    CompletionCode::failure(match detail {
                        Some(detail) => format!("{}: {}", status, detail.trim()),
                        None => status,
                    })
                }
                Err(e) => CompletionCode::failure(e.to_string()),
            };
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
            sink.complete(reference, code);
        });

        Ok(Triggered::Started)
    }
}

/// Single-quote a value for `sh`
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Substitute placeholders in a command template
pub(crate) fn render(template: &str, vars: &[(&str, Option<String>)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        let quoted = shell_quote(value.as_deref().unwrap_or_default());
        acc.replace(&format!("{{{}}}", name), &quoted)
    })
}

#[async_trait]
impl InstallAdapter for ScriptInstallAdapter {
    async fn install(
        &self,
        request: &InstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        if self.install_template.trim().is_empty() {
            return Err(InstallError::Unsupported(
                "no install command configured".to_string(),
            ));
        }
        let (url, store_id) = match &request.source {
            Source::RemoteFile { url, .. } => (Some(url.clone()), None),
            Source::Store { id } => (None, Some(id.clone())),
            Source::LocalFile { .. } => (None, None),
        };
        let file = request
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| match &request.source {
                Source::LocalFile { path } => Some(path.display().to_string()),
                _ => None,
            });
        let version = request.version.as_ref().map(|v| match &v.name {
            Some(name) => name.clone(),
            None => v.code.to_string(),
        });
        let script = render(
            &self.install_template,
            &[
                ("package", Some(request.package.clone())),
                ("file", file),
                ("url", url),
                ("store_id", store_id),
                ("version", version),
            ],
        );
        tracing::debug!(reference = %request.reference, %script, "launching installer");
        self.launch(script, request.reference.clone(), sink)
    }

    async fn uninstall(
        &self,
        request: &UninstallRequest,
        sink: CompletionSink,
    ) -> Result<Triggered, InstallError> {
        if self.uninstall_template.trim().is_empty() {
            return Err(InstallError::Unsupported(
                "no uninstall command configured".to_string(),
            ));
        }
        let script = render(
            &self.uninstall_template,
            &[("package", Some(request.package.clone()))],
        );
        tracing::debug!(reference = %request.reference, %script, "launching uninstaller");
        self.launch(script, request.reference.clone(), sink)
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
