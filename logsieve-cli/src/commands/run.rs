//! `logsieve run` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use logsieve_core::config::SieveConfig;
use logsieve_core::error::StorageError;
use logsieve_pattern::{DedupEngine, MemoryStore, PatternEntry, PatternResult, PatternStore};
use logsieve_pipeline::{PipelineConfig, RunReport, SievePipelineBuilder, sources_from_config};

use super::{alertmanager_client, open_store, snapshot_dir};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::metrics_server::install_metrics_recorder;
use crate::output::{OutputWriter, Render, severity_label, truncate};

const SAMPLE_DISPLAY_CHARS: usize = 80;

/// Execute the `run` command.
///
/// Reads every configured source once, merges the results into the pattern
/// store, and prints a summary. The store is saved even when the run is
/// interrupted with Ctrl-C; a failed save makes the command fail.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = SieveConfig::load(config_path).await?;

    if config.metrics.enabled {
        install_metrics_recorder(&config.metrics)?;
    }
    if config.sources.is_empty() {
        warn!("no [[sources]] configured, nothing to read");
    }

    let store = open_store(&config).await?;
    let engine = Arc::new(DedupEngine::new(Arc::clone(&store)));
    let primed = engine.prime_index()?;
    info!(templates = primed, "template index primed from store");

    let cancel = CancellationToken::new();
    let mut builder = SievePipelineBuilder::new(Arc::clone(&engine))
        .config(PipelineConfig::from_core(&config))
        .sources(sources_from_config(&config.sources)?)
        .cancel_token(cancel.clone());

    if let Some(client) = alertmanager_client(&config)? {
        info!(url = %client.base_url(), "alerting to Alertmanager");
        builder = builder.sink(Arc::new(client));
    }

    let printer = if args.print_results {
        let (tx, rx) = mpsc::channel(config.pipeline.channel_capacity);
        builder = builder.observer(tx);
        Some(tokio::spawn(print_results(rx, *writer, std::io::stdout())))
    } else {
        None
    };

    let pipeline = builder.build()?;
    info!(sources = pipeline.source_count(), "starting run");

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping sources");
            cancel.cancel();
        }
    });

    let report = pipeline.run().await;
    interrupt.abort();

    let (saved, printed) = save_then_join(&store, printer).await;

    let snapshot = if args.save_snapshot {
        let dir = snapshot_dir(args.snapshot_dir, &config)?;
        let path = dir.save(store.list()?).await?;
        Some(path.display().to_string())
    } else {
        None
    };

    // stdout is gone once the printer has failed
    if printed.is_ok() {
        let summary = RunSummary::new(report, store.list()?, snapshot);
        writer.render(&summary)?;
    }

    saved?;
    printed
}

/// Saves the store, then waits for the result printer.
async fn save_then_join(
    store: &MemoryStore,
    printer: Option<JoinHandle<Result<(), CliError>>>,
) -> (Result<(), StorageError>, Result<(), CliError>) {
    let saved = store.save().await;
    if let Err(e) = &saved {
        error!(error = %e, "failed to save pattern store");
    }

    let printed = match printer {
        Some(printer) => printer
            .await
            .map_err(|e| CliError::Command(format!("result printer failed: {e}")))
            .and_then(|printed| printed),
        None => Ok(()),
    };
    if let Err(e) = &printed {
        warn!(error = %e, "result printing stopped early");
    }

    (saved, printed)
}

async fn print_results<W: Write>(
    mut rx: mpsc::Receiver<PatternResult>,
    writer: OutputWriter,
    mut out: W,
) -> Result<(), CliError> {
    while let Some(result) = rx.recv().await {
        writer.render_line_to(&mut out, &ResultLine(result))?;
    }
    Ok(())
}

/// One streamed `--print-results` line.
#[derive(Serialize)]
#[serde(transparent)]
pub struct ResultLine(pub PatternResult);

impl Render for ResultLine {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let r = &self.0;
        let marker = if r.is_new {
            "NEW".cyan().bold()
        } else {
            "   ".normal()
        };
        writeln!(
            w,
            "{} {} {} x{:<6} {}",
            marker,
            severity_label(r.severity),
            r.fingerprint.to_string().dimmed(),
            r.count,
            truncate(&r.sample, SAMPLE_DISPLAY_CHARS)
        )
    }
}

/// Summary printed after a run.
#[derive(Serialize)]
pub struct RunSummary {
    /// Per-run counters and source failures
    pub report: RunReport,
    /// Distinct patterns in the store after the run
    pub total_patterns: usize,
    /// Sum of all pattern counts in the store
    pub total_messages: u64,
    /// Snapshot file written by `--save-snapshot`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    /// All patterns, most frequent first
    pub patterns: Vec<PatternEntry>,
}

impl RunSummary {
    pub fn new(report: RunReport, mut patterns: Vec<PatternEntry>, snapshot: Option<String>) -> Self {
        patterns.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.severity.cmp(&a.severity))
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        Self {
            report,
            total_patterns: patterns.len(),
            total_messages: patterns.iter().map(|p| p.count).sum(),
            snapshot,
            patterns,
        }
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let r = &self.report;
        writeln!(w, "{}", "Run complete".bold())?;
        writeln!(
            w,
            "  Records: {} (new: {}, known: {}, suppressed: {})",
            r.records, r.new, r.known, r.suppressed
        )?;
        if r.degraded > 0 {
            writeln!(w, "  Degraded: {}", r.degraded.to_string().yellow())?;
        }
        writeln!(
            w,
            "  Alerts: sent {}, failed {}, throttled {}",
            r.alerts_sent, r.alerts_failed, r.alerts_throttled
        )?;

        if !r.source_errors.is_empty() {
            writeln!(w, "  {}", "Source errors:".red().bold())?;
            for failure in &r.source_errors {
                writeln!(w, "    {}: {}", failure.source_id.bold(), failure.error.red())?;
            }
        }

        if let Some(path) = &self.snapshot {
            writeln!(w, "  Snapshot: {}", path)?;
        }

        writeln!(w)?;
        writeln!(
            w,
            "Patterns: {} total, {} messages",
            self.total_patterns.to_string().bold(),
            self.total_messages
        )?;
        if self.patterns.is_empty() {
            return Ok(());
        }
        writeln!(
            w,
            "  {:<8} {:<7} {:<32}  {}",
            "COUNT", "LEVEL", "HASH", "SAMPLE"
        )?;
        for p in &self.patterns {
            writeln!(
                w,
                "  {:<8} {} {}  {}",
                p.count,
                severity_label(p.severity),
                p.fingerprint,
                truncate(&p.sample, SAMPLE_DISPLAY_CHARS)
            )?;
        }

        Ok(())
    }
}
