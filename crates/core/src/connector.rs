// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Connector Port (spec §4.A): the narrow capability set scanners and
//! the remediation engine consume. Dialect translation to a specific CM
//! system's wire protocol is an external concern; implementations live in
//! `warden-adapters` and beyond.

use crate::value::Value;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// A language-agnostic query document. The kernel never interprets
/// `filter`/`select` beyond passing them to the adapter; dialect
/// translation happens entirely outside the kernel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    pub resource: String,
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub filter: BTreeMap<String, Value>,
    #[serde(default)]
    pub limit: Option<u64>,
}

impl QueryDocument {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }
}

pub type QueryRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthState,
    pub response_time: Duration,
    pub details: String,
}

/// Transient vs permanent, per spec §4.A / §7.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConnectorError {
    #[error("connector transient error: {0}")]
    Transient(String),
    #[error("connector permanent error: {0}")]
    Permanent(String),
}

impl ConnectorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectorError::Transient(_))
    }
}

impl From<ConnectorError> for crate::error::KernelError {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::Transient(m) => crate::error::KernelError::ConnectorTransient(m),
            ConnectorError::Permanent(m) => crate::error::KernelError::ConnectorPermanent(m),
        }
    }
}

/// Abstract query/health interface to a CM instance. Implementations must
/// be safe for concurrent reads (spec §5 "Shared-resource policy") — the
/// kernel serializes writes only through the Remediation Engine's
/// per-finding lease, never through this trait.
#[async_trait]
pub trait ConnectorPort: Send + Sync {
    async fn connect(&self) -> Result<(), ConnectorError>;
    async fn disconnect(&self) -> Result<(), ConnectorError>;
    fn is_connected(&self) -> bool;
    async fn health_check(&self) -> Result<HealthCheck, ConnectorError>;
    async fn execute_query(&self, query: &QueryDocument) -> Result<Vec<QueryRow>, ConnectorError>;
    /// Executes a remediation operation (named, parameterized) against the
    /// CM system, returning the freshly observed post-state. Used by the
    /// Remediation Engine's execute/rollback steps (spec §4.G).
    async fn execute_operation(
        &self,
        operation: &str,
        parameters: &BTreeMap<String, Value>,
    ) -> Result<Value, ConnectorError>;
}
