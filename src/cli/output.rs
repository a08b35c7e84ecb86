//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying plans, drift
//! reports, and reconciliation results in text or JSON.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::UserLicenseConfig;
use crate::diff::DiffType;
use crate::reconciler::{DriftReport, ReconciliationResult};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan row for table display.
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Add")]
    add: usize,
    #[tabled(rename = "Remove")]
    remove: usize,
    #[tabled(rename = "Plan changes")]
    plan_changes: usize,
}

/// Status row for table display.
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Disabled plans")]
    disabled_plans: usize,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a drift report as an apply plan.
    #[must_use]
    pub fn format_plan(&self, report: &DriftReport, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(report, detailed),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(report: &DriftReport, detailed: bool) -> String {
        if report.is_converged() {
            return format!(
                "{} No changes required - license assignments are up to date.\n",
                "ok".green()
            );
        }

        let mut output = String::from("\nLicense plan\n\n");

        let rows: Vec<PlanRow> = report
            .diffs
            .iter()
            .filter(|d| d.has_changes())
            .map(|d| PlanRow {
                user: d.user_principal_name.clone(),
                action: Self::format_diff_type(d.diff_type),
                add: d.added.len(),
                remove: d.removed.len(),
                plan_changes: d.plan_changes.len(),
            })
            .collect();

        if !rows.is_empty() {
            let table = Table::new(rows).to_string();
            output.push_str(&table);
            output.push('\n');
        }

        if detailed {
            for diff in report.diffs.iter().filter(|d| d.has_changes()) {
                let _ = writeln!(output, "\n{}:", diff.user_principal_name);
                for sku in &diff.added {
                    let _ = writeln!(output, "   {} {sku}", "+".green());
                }
                for sku in &diff.removed {
                    let _ = writeln!(output, "   {} {sku}", "-".red());
                }
                for sku in &diff.plan_changes {
                    let _ = writeln!(output, "   {} {sku} (disabled plans)", "~".yellow());
                }
            }
        }

        if !report.missing_users.is_empty() {
            let _ = write!(output, "\n{} Users missing from tenant:\n", "warning".yellow());
            for user in &report.missing_users {
                let _ = writeln!(output, "   - {user}");
            }
        }

        let changed = report.drifted_users().len();
        let _ = write!(
            output,
            "\nPlan: {} of {} user(s) to change\n",
            changed.to_string().yellow(),
            report.total_users
        );

        output
    }

    /// Formats current license assignments for display.
    #[must_use]
    pub fn format_status(&self, states: &[UserLicenseConfig]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(states).unwrap_or_default(),
            OutputFormat::Text => Self::format_status_text(states),
        }
    }

    /// Formats status as text.
    fn format_status_text(states: &[UserLicenseConfig]) -> String {
        let mut output = String::from("\nAssigned licenses\n\n");

        let rows: Vec<StatusRow> = states
            .iter()
            .flat_map(|u| {
                u.licenses.iter().map(|l| StatusRow {
                    user: u.user_principal_name.clone(),
                    sku: l.skuid.clone(),
                    disabled_plans: l.disabled_plans.len(),
                })
            })
            .collect();

        if rows.is_empty() {
            output.push_str("   No licenses assigned.\n");
            return output;
        }

        let table = Table::new(rows).to_string();
        output.push_str(&table);
        output.push('\n');

        output
    }

    /// Formats a drift report.
    #[must_use]
    pub fn format_drift(&self, report: &DriftReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                if report.is_converged() {
                    format!("{} No drift detected - state is converged.\n", "ok".green())
                } else {
                    let mut output = format!("{} Drift detected:\n\n", "warning".yellow());
                    for user in report.drifted_users() {
                        let _ = writeln!(output, "   - {user}");
                    }
                    for user in &report.missing_users {
                        let _ = writeln!(output, "   - {user} (missing from tenant)");
                    }
                    let _ = write!(
                        output,
                        "\n{}/{} user(s) have drifted.\n",
                        report.drifted_users().len() + report.missing_users.len(),
                        report.total_users
                    );
                    output
                }
            }
        }
    }

    /// Formats a reconciliation result.
    #[must_use]
    pub fn format_reconciliation(&self, result: &ReconciliationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let status = if result.success {
                    format!("{} Reconciliation successful", "ok".green())
                } else {
                    format!("{} Reconciliation failed", "error".red())
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Created: {}", result.created);
                let _ = writeln!(output, "   Updated: {}", result.updated);
                let _ = writeln!(output, "   Deleted: {}", result.deleted);
                let _ = writeln!(output, "   Unchanged: {}", result.unchanged);

                if !result.errors.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "warning".yellow());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                output
            }
        }
    }

    /// Formats an imported user as a ready-to-paste config snippet.
    #[must_use]
    pub fn format_import(&self, user: &UserLicenseConfig) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(user).unwrap_or_default(),
            OutputFormat::Text => {
                let snippet = ImportSnippet {
                    users: std::slice::from_ref(user),
                };
                serde_yaml::to_string(&snippet).unwrap_or_default()
            }
        }
    }

    /// Formats a diff action with color.
    fn format_diff_type(diff_type: DiffType) -> String {
        match diff_type {
            DiffType::Create => "+assign".green().to_string(),
            DiffType::Update => "~converge".yellow().to_string(),
            DiffType::NoChange => "noop".dimmed().to_string(),
        }
    }
}

/// YAML wrapper so the import snippet nests under a `users:` key.
#[derive(serde::Serialize)]
struct ImportSnippet<'a> {
    users: &'a [UserLicenseConfig],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LicenseAssignmentConfig;

    fn formatter() -> OutputFormatter {
        OutputFormatter::new(OutputFormat::Text)
    }

    #[test]
    fn test_format_import_emits_users_snippet() {
        let user = UserLicenseConfig {
            user_principal_name: String::from("alice@contoso.com"),
            licenses: vec![LicenseAssignmentConfig {
                skuid: String::from("sku-1"),
                disabled_plans: vec![String::from("plan-a")],
            }],
        };

        let yaml = formatter().format_import(&user);
        assert!(yaml.contains("users:"));
        assert!(yaml.contains("user_principal_name: alice@contoso.com"));
        assert!(yaml.contains("skuid: sku-1"));
    }

    #[test]
    fn test_format_status_lists_assignments() {
        let states = vec![UserLicenseConfig {
            user_principal_name: String::from("alice@contoso.com"),
            licenses: vec![LicenseAssignmentConfig {
                skuid: String::from("sku-1"),
                disabled_plans: vec![],
            }],
        }];

        let text = formatter().format_status(&states);
        assert!(text.contains("alice@contoso.com"));
        assert!(text.contains("sku-1"));
    }

    #[test]
    fn test_format_status_empty() {
        let text = formatter().format_status(&[]);
        assert!(text.contains("No licenses assigned"));
    }
}
