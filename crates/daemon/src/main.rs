// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wardend`: the Kernel Facade process. Single-instance guarded by an
//! exclusive lock file, the same way the teacher's own daemon binary
//! refuses to start twice against one state directory.

use fs2::FileExt;
use std::io::Write;
use std::sync::Arc;
use warden_adapters::{DesktopNotifyAdapter, FakeConnector};
use warden_daemon::{facade::FacadeError, Facade, KernelConfig};

const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("config error: {0}")]
    Config(#[from] warden_daemon::ConfigError),
    #[error("facade error: {0}")]
    Facade(#[from] FacadeError),
    #[error("could not acquire exclusive lock at {0}: {1}")]
    LockFailed(std::path::PathBuf, std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ipc(#[from] warden_daemon::ipc::IpcError),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "wardend exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    tracing::info!(version = PROTOCOL_VERSION, "starting wardend");

    let config_path = std::env::var("WARDEN_CONFIG_FILE").ok().map(std::path::PathBuf::from);
    let config = KernelConfig::load(config_path.as_deref())?;
    let state_dir = config.state_dir();
    std::fs::create_dir_all(&state_dir)?;

    // Acquire the lock before touching anything else so a second `wardend`
    // against the same state directory fails fast instead of racing the
    // first on the WAL files.
    let lock_path = state_dir.join("wardend.lock");
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|e| StartupError::LockFailed(lock_path.clone(), e))?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let connector = Arc::new(FakeConnector::new());
    let facade = Arc::new(Facade::new(
        config,
        connector,
        Default::default(),
        DesktopNotifyAdapter::new(),
    )?);
    facade.init();

    let socket_path = state_dir.join("wardend.sock");
    let serve = warden_daemon::ipc::serve(&socket_path, facade.clone());

    tokio::select! {
        result = serve => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    facade.shutdown().await;
    let _ = std::fs::remove_file(&lock_path);
    Ok(())
}
