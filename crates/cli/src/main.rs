// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `warden`: the Kernel Facade driven in-process from a one-shot command
//! line, the same wiring `wardend` uses for its long-running process but
//! without the socket listener — useful for scripting and for operators
//! who would rather not keep a daemon around.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use warden_adapters::{DesktopNotifyAdapter, FakeConnector};
use warden_core::{
    ActionId, AttemptId, DiagnosticCategory, FindingId, KernelError, RemediationOptions, RuleId,
    ScanFilter, ScanId, ScanOptions, TriggerKind,
};
use warden_daemon::{Facade, KernelConfig};

const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Debug, Parser)]
#[command(name = "warden", version = PROTOCOL_VERSION, about = "Diagnostic orchestration and remediation kernel")]
struct Cli {
    /// Path to a KernelConfig TOML file; falls back to WARDEN_CONFIG_FILE, then defaults.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan lifecycle operations (spec §4.A).
    Scan {
        #[command(subcommand)]
        command: ScanCommand,
    },
    /// Finding lifecycle operations (spec §4.B).
    Finding {
        #[command(subcommand)]
        command: FindingCommand,
    },
    /// Remediation execution operations (spec §4.E-§4.G).
    Remediate {
        #[command(subcommand)]
        command: RemediateCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ScanCommand {
    /// Start a scan and block until it reaches a terminal status.
    Run {
        #[arg(long)]
        system: String,
        #[arg(long)]
        version: String,
        /// Restrict the scan to these rule ids; repeat for more than one.
        #[arg(long = "rule")]
        rules: Vec<String>,
        /// Restrict the scan to these categories: performance, security,
        /// configuration, data_integrity, conflicts.
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// List scans, optionally filtered by system id.
    List {
        #[arg(long)]
        system: Option<String>,
    },
    /// Show one scan by id.
    Show { scan_id: String },
    /// Cancel a running or pending scan.
    Cancel { scan_id: String },
}

#[derive(Debug, Subcommand)]
enum FindingCommand {
    /// List open findings for a system.
    List { system: String },
    /// Show one finding by id.
    Show { finding_id: String },
}

#[derive(Debug, Subcommand)]
enum RemediateCommand {
    /// Check whether an action currently applies to a finding.
    Validate { finding_id: String, action_id: String },
    /// Execute a remediation action against a finding.
    Execute {
        finding_id: String,
        action_id: String,
        #[arg(long)]
        approved_by: Option<String>,
        #[arg(long)]
        executed_by: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Roll back a completed attempt.
    Rollback { attempt_id: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] warden_daemon::ConfigError),
    #[error("facade error: {0}")]
    Facade(#[from] warden_daemon::FacadeError),
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("not found")]
    NotFound,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let config_path = cli.config.or_else(|| std::env::var("WARDEN_CONFIG_FILE").ok().map(std::path::PathBuf::from));
    let config = KernelConfig::load(config_path.as_deref())?;

    let connector = Arc::new(FakeConnector::new());
    let scanners = HashMap::new();
    let facade = Facade::new(config, connector, scanners, DesktopNotifyAdapter::new())?;
    facade.init();

    let result = dispatch(&facade, cli.command).await;

    facade.shutdown().await;
    result
}

async fn dispatch(facade: &Facade, command: Command) -> Result<(), CliError> {
    match command {
        Command::Scan { command } => scan_command(facade, command).await,
        Command::Finding { command } => finding_command(facade, command).await,
        Command::Remediate { command } => remediate_command(facade, command).await,
    }
}

async fn scan_command(facade: &Facade, command: ScanCommand) -> Result<(), CliError> {
    match command {
        ScanCommand::Run { system, version, rules, categories } => {
            let categories = categories
                .iter()
                .map(|c| parse_category(c))
                .collect::<Result<Vec<_>, _>>()?;
            let opts = ScanOptions {
                rules: rules.into_iter().map(RuleId::from_string).collect(),
                categories,
                trigger: Some(TriggerKind::Manual),
                triggered_by: None,
            };
            let scan = facade.run_diagnostics(system, version, opts).await?;
            let scan = wait_terminal(facade, &scan.id).await?;
            print_json(&scan)
        }
        ScanCommand::List { system } => {
            let filter = ScanFilter { system_id: system, status: None };
            let scans = facade.list_scans(&filter).await?;
            print_json(&scans)
        }
        ScanCommand::Show { scan_id } => {
            let scan = facade.get_scan(&ScanId::from_string(scan_id)).await?.ok_or(CliError::NotFound)?;
            print_json(&scan)
        }
        ScanCommand::Cancel { scan_id } => {
            facade.cancel_scan(&ScanId::from_string(scan_id)).await?;
            Ok(())
        }
    }
}

async fn finding_command(facade: &Facade, command: FindingCommand) -> Result<(), CliError> {
    match command {
        FindingCommand::List { system } => {
            let findings = facade.list_findings(&system).await?;
            print_json(&findings)
        }
        FindingCommand::Show { finding_id } => {
            let finding = facade
                .get_finding(&FindingId::from_string(finding_id))
                .await?
                .ok_or(CliError::NotFound)?;
            print_json(&finding)
        }
    }
}

async fn remediate_command(facade: &Facade, command: RemediateCommand) -> Result<(), CliError> {
    match command {
        RemediateCommand::Validate { finding_id, action_id } => {
            let finding = facade
                .get_finding(&FindingId::from_string(finding_id))
                .await?
                .ok_or(CliError::NotFound)?;
            let action = facade.action(&ActionId::from_string(action_id)).ok_or(CliError::NotFound)?;
            let result = facade.validate_remediation(&finding, &action).await;
            println!("{result:#?}");
            Ok(())
        }
        RemediateCommand::Execute { finding_id, action_id, approved_by, executed_by, dry_run } => {
            let finding = facade
                .get_finding(&FindingId::from_string(finding_id))
                .await?
                .ok_or(CliError::NotFound)?;
            let action = facade.action(&ActionId::from_string(action_id)).ok_or(CliError::NotFound)?;
            let opts = RemediationOptions { approved_by, executed_by, dry_run };
            let result = facade.remediate(&finding, &action, opts).await?;
            println!("{result:#?}");
            Ok(())
        }
        RemediateCommand::Rollback { attempt_id } => {
            let mut attempt = facade
                .get_attempt(&AttemptId::from_string(attempt_id))
                .await?
                .ok_or(CliError::NotFound)?;
            let action = facade.action(&attempt.action_id).ok_or(CliError::NotFound)?;
            let result = facade.rollback(&mut attempt, &action).await?;
            println!("{result:#?}");
            Ok(())
        }
    }
}

fn parse_category(s: &str) -> Result<DiagnosticCategory, CliError> {
    Ok(match s {
        "performance" => DiagnosticCategory::Performance,
        "security" => DiagnosticCategory::Security,
        "configuration" => DiagnosticCategory::Configuration,
        "data_integrity" => DiagnosticCategory::DataIntegrity,
        "conflicts" => DiagnosticCategory::Conflicts,
        other => return Err(CliError::Kernel(KernelError::InvalidInput(format!("unknown category: {other}")))),
    })
}

async fn wait_terminal(facade: &Facade, id: &ScanId) -> Result<warden_core::Scan, CliError> {
    for _ in 0..600 {
        let scan = facade.get_scan(id).await?.ok_or(CliError::NotFound)?;
        if scan.status.is_terminal() {
            return Ok(scan);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    facade.get_scan(id).await?.ok_or(CliError::NotFound)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
