/*!
 * Environment balance and nesting validation.
 *
 * Two independent views of `\begin`/`\end` pairing: per-name counting with
 * a signed difference, and a stack walk that reports the first nesting
 * violation with the originating line numbers.
 */

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static BEGIN_END_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(begin|end)\s*\{([^}]+)\}").expect("valid regex"));

/// Count imbalance for one environment name.
///
/// `difference` is `begin_count - end_count`: positive means missing
/// `\end` tags, negative means extra ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMismatch {
    pub name: String,
    pub begin_count: usize,
    pub end_count: usize,
    pub difference: i64,
}

/// First nesting violation found during the stack walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestingError {
    /// An `\end` with no open environment
    UnexpectedEnd { name: String, line: usize },
    /// An `\end` that closes a different environment than the innermost open one
    MismatchedEnd {
        expected: String,
        found: String,
        begin_line: usize,
        end_line: usize,
    },
    /// End of input reached with the named environment still open
    UnclosedAtEof { name: String, line: usize },
}

impl fmt::Display for NestingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd { name, line } => {
                write!(f, "unexpected \\end{{{}}} at line {}", name, line)
            }
            Self::MismatchedEnd {
                expected,
                found,
                begin_line,
                end_line,
            } => write!(
                f,
                "expected \\end{{{}}} (opened at line {}) but found \\end{{{}}} at line {}",
                expected, begin_line, found, end_line
            ),
            Self::UnclosedAtEof { name, line } => {
                write!(f, "environment '{}' opened at line {} is never closed", name, line)
            }
        }
    }
}

/// Result of environment validation
#[derive(Debug, Clone, Default)]
pub struct EnvironmentValidation {
    /// Per-name count mismatches, sorted by environment name
    pub mismatches: Vec<EnvMismatch>,
    /// First nesting violation, if any
    pub nesting_error: Option<NestingError>,
}

impl EnvironmentValidation {
    pub fn is_balanced(&self) -> bool {
        self.mismatches.is_empty() && self.nesting_error.is_none()
    }
}

/// Validate `\begin`/`\end` balance and nesting order in `text`.
pub fn validate_environments(text: &str) -> EnvironmentValidation {
    let mut begins: HashMap<String, usize> = HashMap::new();
    let mut ends: HashMap<String, usize> = HashMap::new();
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut nesting_error = None;

    let mut line = 1usize;
    let mut scanned_to = 0usize;

    for caps in BEGIN_END_TAG.captures_iter(text) {
        let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
        line += text[scanned_to..whole].matches('\n').count();
        scanned_to = whole;

        let kind = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();

        if kind == "begin" {
            *begins.entry(name.clone()).or_insert(0) += 1;
            stack.push((name, line));
            continue;
        }

        *ends.entry(name.clone()).or_insert(0) += 1;
        if nesting_error.is_some() {
            continue;
        }
        match stack.pop() {
            None => {
                nesting_error = Some(NestingError::UnexpectedEnd { name, line });
            }
            Some((open_name, open_line)) => {
                if open_name != name {
                    nesting_error = Some(NestingError::MismatchedEnd {
                        expected: open_name,
                        found: name,
                        begin_line: open_line,
                        end_line: line,
                    });
                }
            }
        }
    }

    if nesting_error.is_none() {
        if let Some((name, line)) = stack.pop() {
            nesting_error = Some(NestingError::UnclosedAtEof { name, line });
        }
    }

    let mut names: Vec<&String> = begins.keys().chain(ends.keys()).collect();
    names.sort();
    names.dedup();

    let mut mismatches = Vec::new();
    for name in names {
        let b = begins.get(name).copied().unwrap_or(0);
        let e = ends.get(name).copied().unwrap_or(0);
        if b != e {
            mismatches.push(EnvMismatch {
                name: name.clone(),
                begin_count: b,
                end_count: e,
                difference: b as i64 - e as i64,
            });
        }
    }

    EnvironmentValidation {
        mismatches,
        nesting_error,
    }
}
