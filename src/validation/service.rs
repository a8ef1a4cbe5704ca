/*!
 * Validation orchestration.
 *
 * Runs the environment, brace, and quality validators according to enable
 * flags and folds their findings into a single report of hard errors and
 * soft warnings. The report never interrupts a pipeline run; the caller
 * decides whether to accept, retry, or reject.
 */

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::validation::braces::{self, BraceValidation};
use crate::validation::environment::{self, EnvironmentValidation};
use crate::validation::quality::{self, QualityCheck, QualityConfig};

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

/// Aggregated validation outcome
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    /// Raw environment findings, when that check ran
    pub environment: Option<EnvironmentValidation>,
    /// Raw brace findings, when that check ran
    pub braces: Option<BraceValidation>,
    /// Raw quality findings, when that check ran
    pub quality: Option<QualityCheck>,
}

impl ValidationReport {
    /// True when no hard errors were found
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count()
    }

    fn error(&mut self, message: String) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            message,
        });
    }

    fn warning(&mut self, message: String) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            message,
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "validation passed");
        }
        writeln!(
            f,
            "validation found {} error(s), {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            let tag = match issue.severity {
                IssueSeverity::Error => "ERROR",
                IssueSeverity::Warning => "WARNING",
            };
            writeln!(f, "  {}: {}", tag, issue.message)?;
        }
        Ok(())
    }
}

/// Orchestrates the individual validators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralValidator {
    #[serde(default = "default_true")]
    pub check_environments: bool,
    #[serde(default = "default_true")]
    pub check_nesting: bool,
    #[serde(default = "default_true")]
    pub check_braces: bool,
    #[serde(default = "default_true")]
    pub check_quality: bool,
    #[serde(default)]
    pub quality: QualityConfig,
}

fn default_true() -> bool {
    true
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self {
            check_environments: true,
            check_nesting: true,
            check_braces: true,
            check_quality: true,
            quality: QualityConfig::default(),
        }
    }
}

impl StructuralValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality_config(quality: QualityConfig) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    /// Validate a transformed document against its original.
    pub fn validate(&self, original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.check_environments || self.check_nesting {
            let env = environment::validate_environments(translated);
            if self.check_environments {
                for m in &env.mismatches {
                    report.error(format!(
                        "environment '{}' is unbalanced: {} begin, {} end (difference {:+})",
                        m.name, m.begin_count, m.end_count, m.difference
                    ));
                }
            }
            if self.check_nesting {
                if let Some(err) = &env.nesting_error {
                    report.error(err.to_string());
                }
            }
            report.environment = Some(env);
        }

        if self.check_braces {
            let brace = braces::validate_braces(translated);
            if !brace.is_balanced() {
                report.error(format!(
                    "braces are unbalanced: {} open, {} close (difference {:+})",
                    brace.open_count,
                    brace.close_count,
                    brace.difference()
                ));
            }
            report.braces = Some(brace);
        }

        if self.check_quality {
            let quality = quality::check_quality(original, translated, &self.quality);
            for e in &quality.errors {
                report.error(e.clone());
            }
            for w in &quality.warnings {
                report.warning(w.clone());
            }
            report.quality = Some(quality);
        }

        if report.is_valid() {
            debug!(
                "Validation passed with {} warning(s)",
                report.warning_count()
            );
        } else {
            warn!("Validation failed: {} error(s)", report.error_count());
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_withWellFormedDocument_shouldPass() {
        let text = "\\documentclass{article}\n\\begin{document}\nhello\n\\end{document}\n";
        let report = StructuralValidator::new().validate(text, text);
        assert!(report.is_valid(), "unexpected report: {}", report);
    }

    #[test]
    fn test_validate_withUnclosedEnvironment_shouldFail() {
        let report = StructuralValidator::new().validate("content", "\\begin{figure}\ncontent");
        assert!(!report.is_valid());
        let env = report.environment.as_ref().unwrap();
        assert_eq!(env.mismatches[0].name, "figure");
        assert_eq!(env.mismatches[0].difference, 1);
    }

    #[test]
    fn test_validate_withExtraClosingBrace_shouldFail() {
        let report = StructuralValidator::new().validate("\\textbf{hello}", "\\textbf{hello}}");
        assert!(!report.is_valid());
        let brace = report.braces.as_ref().unwrap();
        assert_eq!(brace.difference(), -1);
    }

    #[test]
    fn test_validate_withChecksDisabled_shouldSkipThem() {
        let validator = StructuralValidator {
            check_environments: false,
            check_nesting: false,
            check_braces: false,
            check_quality: false,
            quality: QualityConfig::default(),
        };
        let report = validator.validate("x", "\\begin{figure}}}}");
        assert!(report.is_valid());
        assert!(report.environment.is_none());
        assert!(report.braces.is_none());
    }

    #[test]
    fn test_display_withIssues_shouldListThem() {
        let report = StructuralValidator::new().validate("x", "\\begin{figure}\ncontent");
        let rendered = report.to_string();
        assert!(rendered.contains("ERROR"));
        assert!(rendered.contains("figure"));
    }
}
