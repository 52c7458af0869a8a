// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test/dev implementation of [`ConnectorPort`]. Real protocol adapters
//! (per-CM-version dialect translation) are external to the kernel per
//! spec §1; this fake exists so the engine crate's tests can exercise the
//! Scanner Framework and Remediation Engine without a live CM instance.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use warden_core::{
    ConnectorError, ConnectorPort, HealthCheck, HealthState, QueryDocument, QueryRow, Value,
};

#[derive(Default)]
struct FakeConnectorState {
    connected: bool,
    /// Canned rows keyed by `QueryDocument.resource`.
    rows_by_resource: BTreeMap<String, Vec<QueryRow>>,
    /// Canned post-operation observed state, keyed by operation name.
    operation_results: BTreeMap<String, Value>,
    operations_invoked: Vec<(String, BTreeMap<String, Value>)>,
    /// When set, `execute_query`/`execute_operation` return this error once
    /// and then clear it — used to test scanner/remediation retry paths.
    next_error: Option<ConnectorError>,
}

/// A fully in-memory `ConnectorPort`, safe for concurrent reads per spec
/// §5's shared-resource policy (an internal `Mutex` serializes state
/// mutation, never the adapter's public API).
#[derive(Clone)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeConnectorState>>,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeConnectorState {
                connected: true,
                ..Default::default()
            })),
        }
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_rows(&self, resource: impl Into<String>, rows: Vec<QueryRow>) {
        self.state
            .lock()
            .rows_by_resource
            .insert(resource.into(), rows);
    }

    pub fn seed_operation_result(&self, operation: impl Into<String>, result: Value) {
        self.state
            .lock()
            .operation_results
            .insert(operation.into(), result);
    }

    pub fn fail_next_with(&self, error: ConnectorError) {
        self.state.lock().next_error = Some(error);
    }

    pub fn operations_invoked(&self) -> Vec<(String, BTreeMap<String, Value>)> {
        self.state.lock().operations_invoked.clone()
    }

    fn take_queued_error(&self) -> Option<ConnectorError> {
        self.state.lock().next_error.take()
    }
}

#[async_trait]
impl ConnectorPort for FakeConnector {
    async fn connect(&self) -> Result<(), ConnectorError> {
        self.state.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn health_check(&self) -> Result<HealthCheck, ConnectorError> {
        Ok(HealthCheck {
            status: if self.is_connected() {
                HealthState::Healthy
            } else {
                HealthState::Unreachable
            },
            response_time: Duration::from_millis(1),
            details: "fake connector".into(),
        })
    }

    async fn execute_query(&self, query: &QueryDocument) -> Result<Vec<QueryRow>, ConnectorError> {
        if let Some(err) = self.take_queued_error() {
            return Err(err);
        }
        let rows = self
            .state
            .lock()
            .rows_by_resource
            .get(&query.resource)
            .cloned()
            .unwrap_or_default();
        let rows = match query.limit {
            Some(limit) => rows.into_iter().take(limit as usize).collect(),
            None => rows,
        };
        Ok(rows)
    }

    async fn execute_operation(
        &self,
        operation: &str,
        parameters: &BTreeMap<String, Value>,
    ) -> Result<Value, ConnectorError> {
        if let Some(err) = self.take_queued_error() {
            return Err(err);
        }
        let mut state = self.state.lock();
        state
            .operations_invoked
            .push((operation.to_string(), parameters.clone()));
        Ok(state
            .operation_results
            .get(operation)
            .cloned()
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_rows_are_returned_for_matching_resource() {
        let connector = FakeConnector::new();
        let mut row = BTreeMap::new();
        row.insert("cpu_percent".to_string(), Value::Float(92.0));
        connector.seed_rows("performance", vec![row.clone()]);

        let result = connector
            .execute_query(&QueryDocument::new("performance"))
            .await
            .unwrap();
        assert_eq!(result, vec![row]);
    }

    #[tokio::test]
    async fn queued_error_is_returned_once_then_clears() {
        let connector = FakeConnector::new();
        connector.fail_next_with(ConnectorError::Transient("timeout".into()));
        let err = connector
            .execute_query(&QueryDocument::new("performance"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let ok = connector
            .execute_query(&QueryDocument::new("performance"))
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn execute_operation_records_invocation_and_returns_seeded_result() {
        let connector = FakeConnector::new();
        connector.seed_operation_result("increase-pool-size", Value::Int(200));
        let mut params = BTreeMap::new();
        params.insert("target".to_string(), Value::Int(200));

        let result = connector
            .execute_operation("increase-pool-size", &params)
            .await
            .unwrap();
        assert_eq!(result, Value::Int(200));
        assert_eq!(connector.operations_invoked().len(), 1);
    }
}
