//! `logsieve suppress` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logsieve_core::config::SieveConfig;
use logsieve_core::pipeline::AlertSink;
use logsieve_pattern::{Fingerprint, MemoryStore, PatternStore, Template};
use logsieve_pipeline::{AlertmanagerClient, PipelineConfig, silence_for};

use super::{open_store, require_alertmanager};
use crate::cli::SuppressArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `suppress` command.
pub async fn execute(
    args: SuppressArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = SieveConfig::load(config_path).await?;

    let fingerprint = match (&args.hash, &args.pattern) {
        (Some(hash), _) => parse_fingerprint(hash)?,
        (None, Some(line)) => Template::of(line).fingerprint(),
        (None, None) => {
            return Err(CliError::Command(
                "either --hash or --pattern is required".to_owned(),
            ));
        }
    };

    let silencer = if args.create_silence {
        Some(require_alertmanager(&config, "--create-silence")?)
    } else {
        None
    };

    let store = open_store(&config).await?;
    let report = suppress_pattern(
        &store,
        &config,
        fingerprint,
        &args.reason,
        silencer.as_ref(),
    )
    .await?;

    writer.render(&report)
}

/// Parse a `--hash` / rule fingerprint argument.
pub(crate) fn parse_fingerprint(s: &str) -> Result<Fingerprint, CliError> {
    s.trim()
        .parse()
        .map_err(|e| CliError::Command(format!("invalid fingerprint '{}': {}", s, e)))
}

/// Suppress a fingerprint, persist the store, and optionally create a silence.
///
/// The store is saved before the silence is requested so a failing
/// Alertmanager never loses the local suppression.
pub(crate) async fn suppress_pattern(
    store: &MemoryStore,
    config: &SieveConfig,
    fingerprint: Fingerprint,
    reason: &str,
    silencer: Option<&AlertmanagerClient>,
) -> Result<SuppressReport, CliError> {
    let previous_reason = store.suppression_reason(fingerprint)?;
    store.suppress(fingerprint, reason)?;
    store.save().await?;
    info!(fingerprint = %fingerprint, reason, "pattern suppressed");

    let silence_id = match silencer {
        Some(client) => {
            let duration = PipelineConfig::from_core(config).silence_duration();
            let silence = silence_for(fingerprint, reason, duration);
            let id = client.post_silence(&silence).await?;
            info!(fingerprint = %fingerprint, silence_id = %id, "silence created");
            Some(id)
        }
        None => None,
    };

    let matching: Vec<_> = store
        .list()?
        .into_iter()
        .filter(|entry| entry.fingerprint == fingerprint)
        .collect();

    Ok(SuppressReport {
        fingerprint: fingerprint.to_string(),
        reason: reason.to_owned(),
        previous_reason,
        known_count: matching.iter().map(|e| e.count).sum(),
        sample: matching.into_iter().map(|e| e.sample).find(|s| !s.is_empty()),
        persisted: store.path().map(|p| p.display().to_string()),
        silence_id,
    })
}

/// Result of a suppression.
#[derive(Debug, Serialize)]
pub struct SuppressReport {
    pub fingerprint: String,
    pub reason: String,
    /// Reason of an earlier suppression that was overwritten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_reason: Option<String>,
    /// Count already in the store for this fingerprint (all severities)
    pub known_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
    /// Store file the suppression was written to (None = in-memory only)
    pub persisted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_id: Option<String>,
}

impl Render for SuppressReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Suppressed {}", self.fingerprint.bold())?;
        writeln!(w, "  Reason: {}", self.reason)?;
        if let Some(previous) = &self.previous_reason {
            writeln!(w, "  Previous reason: {}", previous)?;
        }
        match &self.sample {
            Some(sample) => writeln!(w, "  Sample: {} (seen {} times)", sample, self.known_count)?,
            None => writeln!(w, "  Sample: {}", "(not seen yet)".dimmed())?,
        }
        match &self.persisted {
            Some(path) => writeln!(w, "  Saved to: {}", path)?,
            None => writeln!(
                w,
                "  {}",
                "No [store] path configured; suppression is not persisted".yellow()
            )?,
        }
        if let Some(id) = &self.silence_id {
            writeln!(w, "  Silence: {}", id.green())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsieve_core::types::Severity;

    #[test]
    fn test_parse_fingerprint_accepts_hex() {
        let fp = Fingerprint::of("ERROR disk full");
        let parsed = parse_fingerprint(&format!(" {fp} ")).expect("valid fingerprint");
        assert_eq!(parsed, fp);
    }

    #[test]
    fn test_parse_fingerprint_rejects_garbage() {
        let err = parse_fingerprint("not-a-hash").expect_err("invalid");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("not-a-hash"));
    }

    #[tokio::test]
    async fn test_suppress_pattern_persists_and_reports_sample() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        let store = MemoryStore::with_path(&path);

        let fp = Template::of("INFO heartbeat ok").fingerprint();
        store.seen(Severity::Info, fp, "INFO heartbeat ok").expect("seen");
        store.seen(Severity::Info, fp, "INFO heartbeat ok").expect("seen");

        let report = suppress_pattern(&store, &SieveConfig::default(), fp, "noise", None)
            .await
            .expect("suppress succeeds");
        assert_eq!(report.known_count, 2);
        assert_eq!(report.sample.as_deref(), Some("INFO heartbeat ok"));
        assert!(report.previous_reason.is_none());
        assert!(report.silence_id.is_none());

        let reloaded = MemoryStore::with_path(&path);
        reloaded.load().await.expect("load");
        assert_eq!(
            reloaded.suppression_reason(fp).expect("reason"),
            Some("noise".to_owned())
        );
    }

    #[tokio::test]
    async fn test_suppress_pattern_overwrites_reason() {
        let store = MemoryStore::new();
        let fp = Fingerprint::of("x");
        store.suppress(fp, "first").expect("suppress");

        let report = suppress_pattern(&store, &SieveConfig::default(), fp, "second", None)
            .await
            .expect("suppress succeeds");
        assert_eq!(report.previous_reason.as_deref(), Some("first"));
        assert_eq!(report.known_count, 0);
        assert!(report.persisted.is_none());
        assert_eq!(
            store.suppression_reason(fp).expect("reason"),
            Some("second".to_owned())
        );
    }
}
