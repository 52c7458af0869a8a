// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The kernel-wide error taxonomy (spec §7).

use thiserror::Error;

/// Error kinds surfaced to callers of the kernel facade, the orchestrator,
/// and the remediation engine.
///
/// Each variant documents its propagation policy inline; see spec §7 for
/// the full table. `CONNECTOR_TRANSIENT` and `RULE_MISCONFIGURED` are
/// recovered from locally by scanners/remediation and rarely escape to a
/// caller — they are still represented here because scan-level error lists
/// (`ScanResult::errors`) carry them as data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    /// Unknown rule id, malformed options. No side effects occurred.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Concurrency or queue saturation; caller may retry.
    #[error("backpressure: {0}")]
    Backpressure(String),

    /// Attempted to mutate a terminal scan or attempt.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Timeout, reset; retried locally by scanner/remediation before
    /// ever reaching this variant in most paths.
    #[error("connector transient error: {0}")]
    ConnectorTransient(String),

    /// Auth failure, missing schema; surfaced in `ScanResult::errors`,
    /// scan continues.
    #[error("connector permanent error: {0}")]
    ConnectorPermanent(String),

    /// Bad regex, unresolvable field path; the rule is disabled for this
    /// scan and an event is emitted, scan continues.
    #[error("rule misconfigured: {0}")]
    RuleMisconfigured(String),

    /// A remediation pre-condition evaluated to false.
    #[error("precondition false: {0}")]
    PreconditionFalse(String),

    /// A remediation post-condition evaluated to false.
    #[error("postcondition false: {0}")]
    PostconditionFalse(String),

    /// Snapshot checksum mismatch; fatal to the remediation attempt.
    #[error("snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    /// Referenced snapshot id does not exist (expired or never created).
    #[error("snapshot missing: {0}")]
    SnapshotMissing(String),

    /// Memory or finding-count cap exceeded; scan fails, partial findings
    /// persisted.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Explicit cancellation or deadline; scan/attempt terminates.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl KernelError {
    /// Stable string tag for the error kind, used in event payloads and
    /// CLI output. Deliberately independent of the `Display` message so
    /// callers can match on it without string-matching prose.
    pub fn kind(&self) -> &'static str {
        match self {
            KernelError::InvalidInput(_) => "INVALID_INPUT",
            KernelError::Backpressure(_) => "BACKPRESSURE",
            KernelError::IllegalState(_) => "ILLEGAL_STATE",
            KernelError::ConnectorTransient(_) => "CONNECTOR_TRANSIENT",
            KernelError::ConnectorPermanent(_) => "CONNECTOR_PERMANENT",
            KernelError::RuleMisconfigured(_) => "RULE_MISCONFIGURED",
            KernelError::PreconditionFalse(_) => "PRECONDITION_FALSE",
            KernelError::PostconditionFalse(_) => "POSTCONDITION_FALSE",
            KernelError::SnapshotCorrupt(_) => "SNAPSHOT_CORRUPT",
            KernelError::SnapshotMissing(_) => "SNAPSHOT_MISSING",
            KernelError::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            KernelError::Cancelled(_) => "CANCELLED",
        }
    }

    /// Whether the scanner/remediation layer should retry locally rather
    /// than surface this to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KernelError::ConnectorTransient(_))
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
