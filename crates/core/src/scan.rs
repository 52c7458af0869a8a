// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scans: the top-level unit of diagnostic work (spec §3 `Scan`, §4.D).

use crate::rule::{DiagnosticCategory, RuleId, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    pub struct ScanId("scn-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    ScanStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::Failed | ScanStatus::Cancelled
        )
    }

    /// `pending → running → {completed|failed|cancelled}`; terminal
    /// states are absorbing (spec §4.D state machine).
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        use ScanStatus::*;
        match (self, next) {
            (Pending, Running) => true,
            (Pending, Cancelled) => true,
            (Running, Completed) | (Running, Failed) | (Running, Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Scheduled,
    Event,
    Api,
}

crate::simple_display! {
    TriggerKind {
        Manual => "manual",
        Scheduled => "scheduled",
        Event => "event",
        Api => "api",
    }
}

/// Options supplied to `createScan` (spec §4.D).
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub rules: Vec<RuleId>,
    pub categories: Vec<DiagnosticCategory>,
    pub trigger: Option<TriggerKind>,
    pub triggered_by: Option<String>,
}

/// Aggregated finding counts, kept by severity and by category, updated as
/// `ScanResult`s arrive (spec §3 `Scan.attributes`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub total: u64,
    pub by_severity: BTreeMap<Severity, u64>,
    pub by_category: BTreeMap<DiagnosticCategory, u64>,
}

// BTreeMap key types need Ord; derive it narrowly here rather than on the
// whole enum definitions to keep their public surface minimal.
impl Ord for DiagnosticCategory {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}
impl PartialOrd for DiagnosticCategory {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FindingCounts {
    pub fn record(&mut self, severity: Severity, category: DiagnosticCategory) {
        self.total += 1;
        *self.by_severity.entry(severity).or_insert(0) += 1;
        *self.by_category.entry(category).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: ScanId,
    pub system_id: String,
    pub requested_rules: Vec<RuleId>,
    pub categories: Vec<DiagnosticCategory>,
    pub status: ScanStatus,
    /// 0–100; `progress = 100 iff status == Completed` (spec §3 invariant).
    pub progress: u8,
    pub trigger: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub findings: FindingCounts,
}

impl Scan {
    pub fn new(system_id: impl Into<String>, opts: &ScanOptions, now: DateTime<Utc>) -> Self {
        Self {
            id: ScanId::new(),
            system_id: system_id.into(),
            requested_rules: opts.rules.clone(),
            categories: opts.categories.clone(),
            status: ScanStatus::Pending,
            progress: 0,
            trigger: opts.trigger.unwrap_or(TriggerKind::Manual),
            triggered_by: opts.triggered_by.clone(),
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            findings: FindingCounts::default(),
        }
    }

    /// Enforces the state machine and the `completedAt ≥ startedAt`,
    /// `progress == 100 iff completed` invariants (spec §3).
    pub fn transition(&mut self, next: ScanStatus, now: DateTime<Utc>) -> Result<(), ScanStatus> {
        if !self.status.can_transition_to(next) {
            return Err(next);
        }
        match next {
            ScanStatus::Running => self.started_at = Some(now),
            ScanStatus::Completed => {
                self.completed_at = Some(now);
                self.progress = 100;
            }
            ScanStatus::Failed | ScanStatus::Cancelled => {
                self.completed_at = Some(now);
            }
            ScanStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }

    pub fn set_progress(&mut self, completed_tasks: usize, total_tasks: usize) {
        if total_tasks == 0 {
            self.progress = 0;
            return;
        }
        let pct = (completed_tasks as f64 / total_tasks as f64) * 100.0;
        self.progress = pct.clamp(0.0, 99.0) as u8;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub system_id: Option<String>,
    pub status: Option<ScanStatus>,
}
