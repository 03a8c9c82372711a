//! `logsieve config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logsieve_core::config::{SieveConfig, SourceSpec};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
const SECTIONS: [&str; 7] = [
    "general",
    "store",
    "snapshot",
    "alertmanager",
    "metrics",
    "pipeline",
    "sources",
];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Execute the config validate subcommand.
///
/// Attempts to load and validate the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (parse errors, invalid values,
/// duplicate source ids, missing file).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match SieveConfig::load(config_path).await {
        Ok(config) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            sources: config.sources.len(),
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            sources: 0,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Loads and displays the effective configuration (file + env overrides + defaults).
/// Credentials embedded in the Alertmanager and source URLs are redacted.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = SieveConfig::load(config_path).await?;
    redact_credentials(&mut config);

    let source = config_path.display().to_string();
    let report = match section.as_deref() {
        None => ConfigReport::new(source, None, &config),
        Some("general") => ConfigReport::new(source, section, &config.general),
        Some("store") => ConfigReport::new(source, section, &config.store),
        Some("snapshot") => ConfigReport::new(source, section, &config.snapshot),
        Some("alertmanager") => ConfigReport::new(source, section, &config.alertmanager),
        Some("metrics") => ConfigReport::new(source, section, &config.metrics),
        Some("pipeline") => ConfigReport::new(source, section, &config.pipeline),
        Some("sources") => ConfigReport::new(
            source,
            section,
            &SourcesSection {
                sources: &config.sources,
            },
        ),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    writer.render(&report)?;

    Ok(())
}

/// `[[sources]]` needs a table wrapper to serialize as TOML.
#[derive(Serialize)]
struct SourcesSection<'a> {
    sources: &'a [SourceSpec],
}

/// Redact credentials from every URL in the configuration.
fn redact_credentials(config: &mut SieveConfig) {
    config.alertmanager.url = redact_url(&config.alertmanager.url);
    for source in &mut config.sources {
        source.url = redact_url(&source.url);
    }
}

/// Redact credentials from a URL.
///
/// Preserves the scheme and host while replacing user:password with ***REDACTED***.
fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_owned();
    };
    let scheme = &url[..scheme_end + 3];
    let rest = &url[scheme_end + 3..];

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at_pos) => format!("{}***REDACTED***{}", scheme, &rest[at_pos..]),
        None => url.to_owned(),
    }
}

/// Configuration display report.
///
/// Text output shows the TOML rendering; JSON output carries the same
/// values as a structured `config` object.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Effective values (with redacted credentials)
    pub config: serde_json::Value,
    /// Serialized TOML configuration (text output only)
    #[serde(skip)]
    pub config_toml: String,
}

impl ConfigReport {
    fn new<T: Serialize>(source: String, section: Option<String>, value: &T) -> Self {
        Self {
            source,
            section,
            config: serde_json::to_value(value)
                .unwrap_or_else(|e| serde_json::Value::String(format!("(serialization error: {})", e))),
            config_toml: toml::to_string_pretty(value)
                .unwrap_or_else(|e| format!("(serialization error: {})\n", e)),
        }
    }
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Number of configured sources (0 when invalid)
    pub sources: usize,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            writeln!(w, "  Sources: {}", self.sources)?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
