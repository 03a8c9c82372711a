//! `logsieve detect-changes` command handler

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use logsieve_core::config::SieveConfig;
use logsieve_pattern::{Changes, PatternStore, SnapshotDir, diff};

use super::{open_store, snapshot_dir};
use crate::cli::DetectChangesArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, severity_label, truncate};

const SAMPLE_DISPLAY_CHARS: usize = 80;

/// Execute the `detect-changes` command.
pub async fn execute(
    args: DetectChangesArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = SieveConfig::load(config_path).await?;
    let dir = snapshot_dir(args.snapshot_dir, &config)?;
    let (baseline, changes) = changes_since_latest(&config, &dir).await?;

    writer.render(&ChangeReport {
        snapshot_dir: dir.dir().display().to_string(),
        baseline,
        changes,
    })
}

/// Compare the current store with the newest snapshot generation.
///
/// Without any generation every stored pattern counts as new.
pub(crate) async fn changes_since_latest(
    config: &SieveConfig,
    dir: &SnapshotDir,
) -> Result<(Option<DateTime<Utc>>, Changes), CliError> {
    let store = open_store(config).await?;
    let previous = dir.latest().await?;
    if previous.is_none() {
        info!(dir = %dir.dir().display(), "no snapshot found, treating all patterns as new");
    }

    let mut current = store.list()?;
    current.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });

    let changes = diff(&current, previous.as_ref());
    Ok((previous.map(|s| s.timestamp), changes))
}

/// Changes between the store and the latest snapshot.
#[derive(Serialize)]
pub struct ChangeReport {
    pub snapshot_dir: String,
    /// Timestamp of the snapshot compared against (None = no snapshot)
    pub baseline: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub changes: Changes,
}

impl Render for ChangeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match self.baseline {
            Some(ts) => writeln!(
                w,
                "Changes since snapshot {} ({})",
                ts.to_rfc3339().bold(),
                self.snapshot_dir
            )?,
            None => writeln!(
                w,
                "No snapshot in {}; every pattern is new",
                self.snapshot_dir.bold()
            )?,
        }

        if self.changes.is_empty() {
            writeln!(w, "  {}", "No changes".green())?;
            return Ok(());
        }

        writeln!(w)?;
        writeln!(w, "New patterns: {}", self.changes.new_patterns.len())?;
        for p in &self.changes.new_patterns {
            writeln!(
                w,
                "  {} {} {} x{}  {}",
                "+".green().bold(),
                severity_label(p.severity),
                p.fingerprint,
                p.count,
                truncate(&p.sample, SAMPLE_DISPLAY_CHARS)
            )?;
        }

        writeln!(w, "Gone patterns: {}", self.changes.gone_patterns.len())?;
        for p in &self.changes.gone_patterns {
            writeln!(
                w,
                "  {} {} {} x{}  {}",
                "-".red().bold(),
                severity_label(p.severity),
                p.fingerprint,
                p.count,
                truncate(&p.sample, SAMPLE_DISPLAY_CHARS)
            )?;
        }

        writeln!(w, "Count changes: {}", self.changes.count_deltas.len())?;
        for d in &self.changes.count_deltas {
            writeln!(
                w,
                "  {} {} {} {} -> {}  {}",
                "~".yellow().bold(),
                severity_label(d.severity),
                d.fingerprint,
                d.old_count,
                d.new_count,
                truncate(&d.sample, SAMPLE_DISPLAY_CHARS)
            )?;
        }

        Ok(())
    }
}
