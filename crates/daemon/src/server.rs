// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::time::Duration;

use dm_adapters::{AppStore, InstallAdapter, ServerAdapter};
use dm_core::Clock;
use dm_engine::Engine;
use tokio::net::UnixStream;
use tracing::{debug, error};

use crate::lifecycle::DaemonState;
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Handle a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    // Split stream for reading/writing
    let (mut reader, mut writer) = stream.into_split();

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(&daemon.engine, daemon.start_time.elapsed(), request).await;
    if response == Response::ShuttingDown {
        daemon.shutdown_requested = true;
    }

    debug!("Sending response: {:?}", response);

    // Write response with timeout
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request<S, V, I, C>(
    engine: &Engine<S, V, I, C>,
    uptime: Duration,
    request: Request,
) -> Response
where
    S: AppStore,
    V: ServerAdapter,
    I: InstallAdapter,
    C: Clock,
{
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => Response::Status {
            uptime_secs: uptime.as_secs(),
            engine: engine.status(),
        },

        Request::Submit { payload } => match engine.submit(payload) {
            Ok(()) => Response::Accepted,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Complete { reference, code } => {
            if engine.wake(reference.clone(), code) {
                Response::Ok
            } else {
                Response::Error {
                    message: format!("no command awaiting completion {}", reference),
                }
            }
        }

        Request::ListApps => match engine.apps().await {
            Ok(apps) => Response::Apps { apps },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::ListEvents => Response::Events {
            events: engine.events(),
        },

        Request::Shutdown => Response::ShuttingDown,
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
