//! Command handlers -- one module per subcommand

pub mod apply_rule;
pub mod config;
pub mod detect_changes;
pub mod run;
pub mod suggest_rules;
pub mod suppress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use logsieve_core::config::SieveConfig;
use logsieve_pattern::{MemoryStore, PatternStore, SnapshotDir};
use logsieve_pipeline::{AlertmanagerClient, PipelineConfig};

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Dispatch a parsed subcommand to its handler.
pub async fn execute(
    command: Commands,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => run::execute(args, config_path, writer).await,
        Commands::Suppress(args) => suppress::execute(args, config_path, writer).await,
        Commands::DetectChanges(args) => detect_changes::execute(args, config_path, writer).await,
        Commands::SuggestRules(args) => suggest_rules::execute(args, config_path, writer).await,
        Commands::ApplyRule(args) => apply_rule::execute(args, config_path, writer).await,
        Commands::Config(args) => config::execute(args, config_path, writer).await,
    }
}

/// Open the pattern store described by `[store]`.
///
/// With a path, the JSON state file is loaded (a missing file is an empty store).
/// Without one, the store lives in memory for this invocation only.
pub(crate) async fn open_store(config: &SieveConfig) -> Result<Arc<MemoryStore>, CliError> {
    let store = if config.has_store_path() {
        MemoryStore::with_path(&config.store.path)
    } else {
        debug!("no [store] path configured, using in-memory store");
        MemoryStore::new()
    };
    store.load().await?;
    debug!(
        patterns = store.len(),
        suppressed = store.suppressed_len(),
        "pattern store opened"
    );
    Ok(Arc::new(store))
}

/// Alertmanager client for `[alertmanager]`, or `None` when no url is set.
pub(crate) fn alertmanager_client(
    config: &SieveConfig,
) -> Result<Option<AlertmanagerClient>, CliError> {
    let pipeline_config = PipelineConfig::from_core(config);
    if !pipeline_config.alerts_enabled() {
        return Ok(None);
    }
    let client = AlertmanagerClient::new(
        &pipeline_config.alertmanager_url,
        pipeline_config.alertmanager_timeout(),
    )?;
    Ok(Some(client))
}

/// Alertmanager client, failing when `[alertmanager] url` is unset.
pub(crate) fn require_alertmanager(
    config: &SieveConfig,
    what: &str,
) -> Result<AlertmanagerClient, CliError> {
    alertmanager_client(config)?.ok_or_else(|| {
        CliError::Config(format!("{what} requires [alertmanager] url to be set"))
    })
}

/// Snapshot generations from `--snapshot-dir` or `[snapshot] dir`.
pub(crate) fn snapshot_dir(
    flag: Option<PathBuf>,
    config: &SieveConfig,
) -> Result<SnapshotDir, CliError> {
    let dir = match flag {
        Some(dir) => dir,
        None if !config.snapshot.dir.is_empty() => PathBuf::from(&config.snapshot.dir),
        None => {
            return Err(CliError::Config(
                "no snapshot directory: pass --snapshot-dir or set [snapshot] dir".to_owned(),
            ));
        }
    };
    Ok(SnapshotDir::new(dir, config.snapshot.retain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_dir_prefers_flag() {
        let mut config = SieveConfig::default();
        config.snapshot.dir = "/var/lib/logsieve/snapshots".to_owned();

        let dir = snapshot_dir(Some(PathBuf::from("/tmp/other")), &config).expect("flag wins");
        assert_eq!(dir.dir(), Path::new("/tmp/other"));

        let dir = snapshot_dir(None, &config).expect("config dir");
        assert_eq!(dir.dir(), Path::new("/var/lib/logsieve/snapshots"));
    }

    #[test]
    fn test_snapshot_dir_missing_is_config_error() {
        let err = snapshot_dir(None, &SieveConfig::default()).expect_err("no dir configured");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_alertmanager_client_disabled_without_url() {
        let config = SieveConfig::default();
        assert!(alertmanager_client(&config).expect("no error").is_none());

        let err = require_alertmanager(&config, "--create-silence").expect_err("url required");
        assert!(err.to_string().contains("--create-silence"));
    }

    #[tokio::test]
    async fn test_open_store_loads_existing_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        std::fs::write(
            &path,
            r#"{"seen":[{"level":"ERROR","hash":"0123456789abcdef0123456789abcdef","sample":"ERROR disk full","count":4}],"suppressed":{}}"#,
        )
        .expect("write store");

        let mut config = SieveConfig::default();
        config.store.path = path.display().to_string();

        let store = open_store(&config).await.expect("store opens");
        assert_eq!(store.len(), 1);
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_open_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = SieveConfig::default();
        config.store.path = dir.path().join("absent.json").display().to_string();

        let store = open_store(&config).await.expect("store opens");
        assert!(store.is_empty());
    }
}
