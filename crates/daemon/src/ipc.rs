// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin, explicitly out-of-scope demonstration IPC listener (spec §1,
//! §6): a length-prefixed JSON request/response loop over a Unix domain
//! socket, reusing `warden_wire::framing` exactly as the teacher's own
//! socket protocol frames its messages. No auth, no session state — a
//! real external-facing API surface is named out of scope.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use warden_adapters::NotifyAdapter;
use warden_core::{KernelError, ScanFilter, ScanId, ScanOptions};
use warden_wire::{read_message, write_message, ProtocolError};

use crate::facade::Facade;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("failed to bind socket {0}: {1}")]
    Bind(PathBuf, std::io::Error),
    #[error("failed to remove stale socket {0}: {1}")]
    StaleSocket(PathBuf, std::io::Error),
}

/// One request the demonstration transport understands. Deliberately a
/// tiny subset of the Facade's surface — this exists to show the wiring,
/// not to be a complete remote protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    RunDiagnostics {
        system_id: String,
        system_version: String,
    },
    GetScan {
        scan_id: ScanId,
    },
    ListScans {
        system_id: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { payload: serde_json::Value },
    Err { message: String },
}

impl From<Result<serde_json::Value, KernelError>> for Response {
    fn from(result: Result<serde_json::Value, KernelError>) -> Self {
        match result {
            Ok(payload) => Response::Ok { payload },
            Err(e) => Response::Err { message: e.to_string() },
        }
    }
}

/// Binds `socket_path` and serves requests against `facade` until the
/// listener errors or the process is killed. Each connection is handled
/// sequentially on its own task; the Facade itself is already safe for
/// concurrent callers.
pub async fn serve<N: NotifyAdapter + 'static>(
    socket_path: &Path,
    facade: std::sync::Arc<Facade<N>>,
) -> Result<(), IpcError> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)
            .map_err(|e| IpcError::StaleSocket(socket_path.to_path_buf(), e))?;
    }
    let listener = UnixListener::bind(socket_path)
        .map_err(|e| IpcError::Bind(socket_path.to_path_buf(), e))?;
    tracing::info!(path = %socket_path.display(), "ipc listener bound");

    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "ipc accept failed");
                continue;
            }
        };
        let facade = facade.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, facade).await {
                tracing::warn!(error = %e, "ipc connection ended with an error");
            }
        });
    }
}

async fn handle_connection<N: NotifyAdapter + 'static>(
    mut stream: UnixStream,
    facade: std::sync::Arc<Facade<N>>,
) -> Result<(), ProtocolError> {
    loop {
        let bytes = match read_message(&mut stream).await {
            Ok(b) => b,
            Err(ProtocolError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        let request: Request = match warden_wire::decode(&bytes) {
            Ok(r) => r,
            Err(e) => {
                let response = Response::Err { message: e.to_string() };
                write_message(&mut stream, &warden_wire::encode(&response)?).await?;
                continue;
            }
        };
        let response = dispatch(&facade, request).await;
        write_message(&mut stream, &warden_wire::encode(&response)?).await?;
    }
}

async fn dispatch<N: NotifyAdapter + 'static>(facade: &Facade<N>, request: Request) -> Response {
    let result: Result<serde_json::Value, KernelError> = match request {
        Request::RunDiagnostics { system_id, system_version } => facade
            .run_diagnostics(system_id, system_version, ScanOptions::default())
            .await
            .and_then(|scan| serde_json::to_value(scan).map_err(|e| KernelError::InvalidInput(e.to_string()))),
        Request::GetScan { scan_id } => facade
            .get_scan(&scan_id)
            .await
            .and_then(|scan| serde_json::to_value(scan).map_err(|e| KernelError::InvalidInput(e.to_string()))),
        Request::ListScans { system_id } => {
            let filter = ScanFilter { system_id, status: None };
            facade
                .list_scans(&filter)
                .await
                .and_then(|scans| serde_json::to_value(scans).map_err(|e| KernelError::InvalidInput(e.to_string())))
        }
    };
    result.into()
}
