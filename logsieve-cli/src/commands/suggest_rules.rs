//! `logsieve suggest-rules` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use logsieve_core::config::SieveConfig;
use logsieve_pattern::{RuleAction, SuggestedRule, suggest_rules};

use super::detect_changes::changes_since_latest;
use super::snapshot_dir;
use crate::cli::SuggestRulesArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, severity_label, truncate};

/// Execute the `suggest-rules` command.
pub async fn execute(
    args: SuggestRulesArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = SieveConfig::load(config_path).await?;
    let dir = snapshot_dir(args.snapshot_dir, &config)?;
    let threshold = args
        .suppress_threshold
        .unwrap_or(config.pipeline.suppress_threshold);

    let (_, changes) = changes_since_latest(&config, &dir).await?;
    let rules = suggest_rules(&changes, threshold);

    writer.render(&RuleReport {
        suppress_threshold: threshold,
        rules,
    })
}

/// Suggested rules.
#[derive(Serialize)]
pub struct RuleReport {
    pub suppress_threshold: u64,
    pub rules: Vec<SuggestedRule>,
}

impl Render for RuleReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.rules.is_empty() {
            writeln!(w, "No rules suggested")?;
            return Ok(());
        }

        writeln!(w, "Suggested rules: {}", self.rules.len().to_string().bold())?;
        for rule in &self.rules {
            let action = match rule.action {
                RuleAction::Suppress => format!("{:<8}", rule.action.to_string()).blue(),
                RuleAction::Alert => format!("{:<8}", rule.action.to_string()).red().bold(),
            };
            writeln!(
                w,
                "  {} {} {}  {} ({})",
                action,
                severity_label(rule.severity),
                rule.fingerprint,
                truncate(&rule.sample, 60),
                rule.reason.dimmed()
            )?;
        }
        writeln!(w)?;
        writeln!(w, "Apply with: logsieve apply-rule <suppress|alert> <fingerprint>")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logsieve_core::types::Severity;
    use logsieve_pattern::Fingerprint;

    #[test]
    fn test_rule_report_render_text() {
        colored::control::set_override(false);
        let fp = Fingerprint::of("INFO heartbeat ok");
        let report = RuleReport {
            suppress_threshold: 5,
            rules: vec![SuggestedRule {
                action: RuleAction::Suppress,
                fingerprint: fp,
                severity: Severity::Info,
                sample: "INFO heartbeat ok".to_owned(),
                reason: "new INFO pattern, count 12".to_owned(),
            }],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Suggested rules: 1"));
        assert!(output.contains("suppress"));
        assert!(output.contains(&fp.to_string()));
        assert!(output.contains("new INFO pattern, count 12"));
    }

    #[test]
    fn test_rule_report_empty() {
        let report = RuleReport {
            suppress_threshold: 5,
            rules: Vec::new(),
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "No rules suggested\n");
    }

    #[test]
    fn test_rule_report_json_action_lowercase() {
        let report = RuleReport {
            suppress_threshold: 3,
            rules: vec![SuggestedRule {
                action: RuleAction::Alert,
                fingerprint: Fingerprint::of("ERROR x"),
                severity: Severity::Error,
                sample: "ERROR x".to_owned(),
                reason: "new ERROR pattern".to_owned(),
            }],
        };
        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!(json["rules"][0]["action"], "alert");
        assert_eq!(json["suppress_threshold"], 3);
    }
}
