//! # Evaluate Subcommand
//!
//! Runs trigger definitions against one identity refresh (a previous and/or
//! new snapshot) and prints each trigger's outcome.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use idtrig_engine::{AuditEntry, TriggerResult, TriggerStatus};

use crate::config::CliConfig;
use crate::input::{load_optional_snapshot, load_triggers};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per trigger.
    #[default]
    Text,
    /// A JSON report.
    Json,
}

/// Arguments for `idtrig evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// YAML file holding a list of trigger definitions.
    #[arg(long, value_name = "TRIGGERS")]
    pub triggers: PathBuf,

    /// JSON snapshot of the identity before refresh. Omit for a new identity.
    #[arg(long, value_name = "JSON")]
    pub previous: Option<PathBuf>,

    /// JSON snapshot of the identity after refresh. Omit for a deletion.
    #[arg(long, value_name = "JSON")]
    pub new: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Include the audit trail in the output.
    #[arg(long)]
    pub audit: bool,
}

/// A definition that failed registration.
#[derive(Debug, Serialize)]
pub struct Rejected {
    /// Trigger identifier.
    pub trigger_id: String,
    /// Validation error.
    pub error: String,
}

/// Everything `evaluate` reports.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    /// Definitions that failed validation.
    pub rejected: Vec<Rejected>,
    /// Per-trigger outcomes.
    pub results: Vec<TriggerResult>,
    /// Audit entries, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<Vec<AuditEntry>>,
}

impl EvaluationReport {
    /// Whether anything was rejected or failed.
    pub fn has_failures(&self) -> bool {
        !self.rejected.is_empty() || self.results.iter().any(TriggerResult::is_failed)
    }
}

/// Load inputs and run the processor.
pub fn evaluate(args: &EvaluateArgs, config: CliConfig) -> Result<EvaluationReport> {
    let definitions = load_triggers(&args.triggers)?;
    let previous = load_optional_snapshot(args.previous.as_deref())?;
    let new = load_optional_snapshot(args.new.as_deref())?;

    let mut processor = config.into_processor();
    let mut rejected = Vec::new();
    for definition in definitions {
        let id = definition.id.to_string();
        if let Err(e) = processor.register(definition) {
            tracing::warn!(trigger = %id, error = %e, "rejecting trigger definition");
            rejected.push(Rejected {
                trigger_id: id,
                error: e.to_string(),
            });
        }
    }

    let results = processor.process(previous.as_ref(), new.as_ref());
    let audit = args.audit.then(|| processor.audit_trail.drain());
    Ok(EvaluationReport {
        rejected,
        results,
        audit,
    })
}

/// Execute the evaluate subcommand.
///
/// Returns 0 when nothing failed, 1 when a definition was rejected or a
/// trigger failed.
pub fn run_evaluate(args: &EvaluateArgs, config: CliConfig) -> Result<u8> {
    let report = evaluate(args, config)?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("failed to serialize evaluation report")?;
            println!("{json}");
        }
        OutputFormat::Text => print_text(&report),
    }

    Ok(u8::from(report.has_failures()))
}

fn print_text(report: &EvaluationReport) {
    for rejected in &report.rejected {
        println!("  REJECTED: {}: {}", rejected.trigger_id, rejected.error);
    }
    for result in &report.results {
        let line = match &result.status {
            TriggerStatus::NotMatched => "not matched".to_string(),
            TriggerStatus::Matched { event: Some(event) } => format!("MATCHED: {}", event.cause()),
            TriggerStatus::Matched { event: None } => "MATCHED (no event)".to_string(),
            TriggerStatus::Skipped { reason } => format!("skipped ({})", reason.as_str()),
            TriggerStatus::Failed { error } => format!("FAILED: {error}"),
        };
        println!("  {} [{}]: {line}", result.trigger_id, result.trigger_type);
    }
    if let Some(audit) = &report.audit {
        for entry in audit {
            let subject = entry
                .trigger_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            println!("  audit {} {} {subject}", entry.timestamp.to_rfc3339(), entry.entry_type);
        }
    }
    let matched = report.results.iter().filter(|r| r.is_matched()).count();
    println!("Triggers: {matched}/{} matched", report.results.len());
}
