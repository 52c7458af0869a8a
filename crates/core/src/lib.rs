// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-core: domain types of the Diagnostic Orchestration and
//! Remediation Kernel — ids, the `Value` algebra, entities (Scan, Rule,
//! Finding, RemediationAction/Attempt, Snapshot), the Connector port, the
//! kernel event set, the rule/scanner registry, and the error taxonomy.
//!
//! This crate has no I/O and no async runtime dependency beyond the
//! `ConnectorPort` trait signature (`async-trait`); everything else is
//! plain data plus invariant-enforcing constructors/transitions.

pub mod macros;

pub mod clock;
pub mod connector;
pub mod error;
pub mod event;
pub mod finding;
pub mod id;
pub mod ports;
pub mod registry;
pub mod remediation;
pub mod rule;
pub mod scan;
pub mod snapshot;
pub mod value;

pub use clock::{Clock, FakeClock, SystemClock};
pub use connector::{ConnectorError, ConnectorPort, HealthCheck, HealthState, QueryDocument, QueryRow};
pub use error::{KernelError, KernelResult};
pub use event::KernelEvent;
pub use finding::{Evidence, Finding, FindingId, FindingKey, RemediationHistoryEntry};
pub use id::{short, IdBuf};
pub use ports::{
    AttemptStorePort, FindingStorePort, ScanStorePort, SnapshotStorePort, StoreError, StoreResult,
};
pub use registry::{version_matches, Registry, RegistryError};
pub use remediation::{
    ActionId, ActionKind, AttemptId, AttemptStatus, ChangeSet, Guard, RemediationAction,
    RemediationAttempt, RemediationOptions, RemediationResult, RiskLevel, RollbackResult,
    ValidationResult,
};
pub use rule::{
    ConditionOperator, DiagnosticCategory, DiagnosticRule, RuleCondition, RuleId, Severity,
};
pub use scan::{FindingCounts, Scan, ScanFilter, ScanId, ScanOptions, ScanStatus, TriggerKind};
pub use snapshot::{Snapshot, SnapshotId, SnapshotScope, SnapshotType};
pub use value::{map_from_paths, Value};
