//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

/// logsieve -- log pattern mining and deduplication.
///
/// Use `logsieve <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logsieve", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logsieve.toml configuration file.
    #[arg(short, long, global = true, default_value = "logsieve.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read all sources, detect patterns, optionally alert Alertmanager.
    Run(RunArgs),

    /// Suppress a pattern by fingerprint or sample line.
    Suppress(SuppressArgs),

    /// Compare the store with the latest snapshot.
    DetectChanges(DetectChangesArgs),

    /// Suggest suppress/alert rules from the latest changes.
    SuggestRules(SuggestRulesArgs),

    /// Apply a suggested rule to one pattern.
    ApplyRule(ApplyRuleArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Read every configured source once and update the pattern store.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Save a snapshot generation after the run.
    #[arg(long)]
    pub save_snapshot: bool,

    /// Snapshot directory (default: [snapshot] dir).
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Print every non-suppressed result while processing.
    #[arg(long)]
    pub print_results: bool,
}

// ---- suppress ----

/// Suppress a pattern so it is no longer counted or alerted.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["hash", "pattern"])))]
pub struct SuppressArgs {
    /// Pattern fingerprint (32 hex characters).
    #[arg(long)]
    pub hash: Option<String>,

    /// Sample log line; its fingerprint is computed.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Reason recorded with the suppression.
    #[arg(long, default_value = "one-click")]
    pub reason: String,

    /// Also create an Alertmanager silence for the pattern.
    #[arg(long)]
    pub create_silence: bool,
}

// ---- detect-changes ----

/// Show new, gone and changed patterns since the latest snapshot.
#[derive(Args, Debug)]
pub struct DetectChangesArgs {
    /// Snapshot directory (default: [snapshot] dir).
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,
}

// ---- suggest-rules ----

/// Suggest rules from the changes since the latest snapshot.
#[derive(Args, Debug)]
pub struct SuggestRulesArgs {
    /// Snapshot directory (default: [snapshot] dir).
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Suggest suppressing new INFO/DEBUG patterns at or above this count
    /// (default: [pipeline] suppress_threshold).
    #[arg(long)]
    pub suppress_threshold: Option<u64>,
}

// ---- apply-rule ----

/// Rule actions accepted by `apply-rule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApplyAction {
    /// Suppress the pattern.
    Suppress,
    /// Post a one-off alert for the pattern.
    Alert,
}

/// Apply a rule to one pattern.
#[derive(Args, Debug)]
pub struct ApplyRuleArgs {
    /// Action to apply.
    pub action: ApplyAction,

    /// Pattern fingerprint.
    pub fingerprint: String,

    /// Reason recorded with a suppression.
    #[arg(long, default_value = "applied")]
    pub reason: String,

    /// Also create an Alertmanager silence (suppress only).
    #[arg(long)]
    pub create_silence: bool,
}

// ---- config ----

/// Manage logsieve configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section
        /// (general, store, snapshot, alertmanager, metrics, pipeline, sources).
        #[arg(long)]
        section: Option<String>,
    },
}
