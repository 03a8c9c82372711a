//! `logsieve apply-rule` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logsieve_core::config::SieveConfig;
use logsieve_core::pipeline::AlertSink;
use logsieve_pattern::{Fingerprint, MemoryStore, PatternEntry, PatternStore};
use logsieve_pipeline::alert_for;

use super::suppress::{parse_fingerprint, suppress_pattern};
use super::{open_store, require_alertmanager};
use crate::cli::{ApplyAction, ApplyRuleArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Source label on alerts posted by hand.
const MANUAL_SOURCE: &str = "apply-rule";

/// Execute the `apply-rule` command.
pub async fn execute(
    args: ApplyRuleArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = SieveConfig::load(config_path).await?;
    let fingerprint = parse_fingerprint(&args.fingerprint)?;

    match args.action {
        ApplyAction::Suppress => {
            let silencer = if args.create_silence {
                Some(require_alertmanager(&config, "--create-silence")?)
            } else {
                None
            };
            let store = open_store(&config).await?;
            let report =
                suppress_pattern(&store, &config, fingerprint, &args.reason, silencer.as_ref())
                    .await?;
            writer.render(&report)
        }
        ApplyAction::Alert => {
            let client = require_alertmanager(&config, "apply-rule alert")?;
            let store = open_store(&config).await?;
            let entry = stored_pattern(&store, fingerprint)?;

            let alert = alert_for(entry.severity, fingerprint, &entry.sample, MANUAL_SOURCE);
            client.post_alerts(&[alert]).await?;
            info!(fingerprint = %fingerprint, severity = %entry.severity, "alert posted");

            writer.render(&AlertReport {
                fingerprint: fingerprint.to_string(),
                severity: entry.severity.as_str().to_owned(),
                sample: entry.sample,
                count: entry.count,
                alertmanager: client.base_url().to_owned(),
            })
        }
    }
}

/// The stored entry for a fingerprint.
///
/// A fingerprint can be stored under several severities; the most severe one wins.
fn stored_pattern(store: &MemoryStore, fingerprint: Fingerprint) -> Result<PatternEntry, CliError> {
    store
        .list()?
        .into_iter()
        .filter(|entry| entry.fingerprint == fingerprint)
        .max_by_key(|entry| entry.severity)
        .ok_or_else(|| {
            CliError::Command(format!("pattern {} is not in the store", fingerprint))
        })
}

/// Result of `apply-rule alert`.
#[derive(Debug, Serialize)]
pub struct AlertReport {
    pub fingerprint: String,
    pub severity: String,
    pub sample: String,
    pub count: u64,
    pub alertmanager: String,
}

impl Render for AlertReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Alert posted for {}", self.fingerprint.bold())?;
        writeln!(w, "  Level: {}", self.severity)?;
        writeln!(w, "  Sample: {} (seen {} times)", self.sample, self.count)?;
        writeln!(w, "  Alertmanager: {}", self.alertmanager)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsieve_core::types::Severity;

    #[test]
    fn test_stored_pattern_prefers_most_severe() {
        let store = MemoryStore::new();
        let fp = Fingerprint::of("disk full");
        store.seen(Severity::Warn, fp, "WARN disk full").expect("seen");
        store.seen(Severity::Error, fp, "ERROR disk full").expect("seen");

        let entry = stored_pattern(&store, fp).expect("found");
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.sample, "ERROR disk full");
    }

    #[test]
    fn test_stored_pattern_missing_is_command_error() {
        let store = MemoryStore::new();
        let err = stored_pattern(&store, Fingerprint::of("nothing")).expect_err("missing");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("is not in the store"));
    }
}
