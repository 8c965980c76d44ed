// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP server adapter
//!
//! Endpoints, relative to the base URL:
//! - `POST /devices/enroll` with a [`DeviceIdentity`]
//! - `GET /devices/{id}/commands` returning a JSON array of payloads
//! - `POST /devices/{id}/results` with a JSON array of result entries
//! - `GET /releases/latest` returning a [`Release`], or 204/404 for none

use super::{download_name, DeviceIdentity, Release, ServerAdapter, ServerError};
use async_trait::async_trait;
use dm_core::ResultEntry;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ureq-backed server adapter; blocking calls run on the blocking pool
#[derive(Clone)]
pub struct HttpServerAdapter {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpServerAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(ureq::Agent) -> Result<T, ServerError> + Send + 'static,
    {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || f(agent))
            .await
            .map_err(|e| ServerError::Request(format!("worker failed: {}", e)))?
    }
}

fn request_error(e: ureq::Error) -> ServerError {
    match e {
        ureq::Error::StatusCode(code) => ServerError::Status(code),
        ureq::Error::Io(e) => ServerError::Io(e),
        other => ServerError::Request(other.to_string()),
    }
}

fn post_json(agent: &ureq::Agent, url: &str, body: String) -> Result<(), ServerError> {
    agent
        .post(url)
        .header("content-type", "application/json")
        .send(body)
        .map_err(request_error)?;
    Ok(())
}

fn get_string(agent: &ureq::Agent, url: &str) -> Result<Option<String>, ServerError> {
    let mut response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::StatusCode(404)) => return Ok(None),
        Err(e) => return Err(request_error(e)),
    };
    if response.status().as_u16() == 204 {
        return Ok(None);
    }
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ServerError::InvalidResponse(e.to_string()))?;
    Ok(Some(body))
}

/// Parse the pending-commands response body
pub(crate) fn parse_commands(body: &str) -> Result<Vec<serde_json::Value>, ServerError> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => Ok(items),
        Ok(serde_json::Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(ServerError::InvalidResponse(format!(
            "expected an array of commands, got {}",
            other
        ))),
        Err(e) => Err(ServerError::InvalidResponse(e.to_string())),
    }
}

#[async_trait]
impl ServerAdapter for HttpServerAdapter {
    async fn enroll(&self, device: &DeviceIdentity) -> Result<(), ServerError> {
        let url = self.url("devices/enroll");
        let body =
            serde_json::to_string(device).map_err(|e| ServerError::Request(e.to_string()))?;
        self.blocking(move |agent| post_json(&agent, &url, body))
            .await
    }

    async fn fetch_pending_commands(
        &self,
        device_id: &str,
    ) -> Result<Vec<serde_json::Value>, ServerError> {
        let url = self.url(&format!("devices/{}/commands", device_id));
        let body = self
            .blocking(move |agent| get_string(&agent, &url))
            .await?;
        match body {
            Some(body) if !body.trim().is_empty() => parse_commands(&body),
            _ => Ok(Vec::new()),
        }
    }

    async fn submit_results(
        &self,
        device_id: &str,
        entries: &[ResultEntry],
    ) -> Result<(), ServerError> {
        let url = self.url(&format!("devices/{}/results", device_id));
        let body =
            serde_json::to_string(entries).map_err(|e| ServerError::Request(e.to_string()))?;
        self.blocking(move |agent| post_json(&agent, &url, body))
            .await
    }

    async fn latest_release(&self) -> Result<Option<Release>, ServerError> {
        let url = self.url("releases/latest");
        let body = self
            .blocking(move |agent| get_string(&agent, &url))
            .await?;
        match body {
            Some(body) if !body.trim().is_empty() => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| ServerError::InvalidResponse(e.to_string())),
            _ => Ok(None),
        }
    }

    async fn fetch_package(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ServerError> {
        let url = url.to_string();
        let dest = dest_dir.join(download_name(&url));
        let dest_dir = dest_dir.to_path_buf();
        self.blocking(move |agent| {
            std::fs::create_dir_all(&dest_dir)?;
            let mut response = agent.get(&url).call().map_err(request_error)?;
            let mut file = std::fs::File::create(&dest)?;
            let copied = std::io::copy(&mut response.body_mut().as_reader(), &mut file);
            if let Err(e) = copied {
                let _ = std::fs::remove_file(&dest);
                return Err(ServerError::Io(e));
            }
            file.sync_all()?;
            Ok(dest)
        })
        .await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
