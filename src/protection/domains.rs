/*!
 * Domain-specific span finders feeding the protection engine.
 *
 * Each finder returns candidate byte ranges tagged with a protection
 * category; the engine resolves overlaps and splices tokens.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::protection::engine::ProtectionCategory;
use crate::scanner::{self, SpanScanner};

/// A candidate span produced by a domain finder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Start byte offset, inclusive
    pub start: usize,
    /// End byte offset, exclusive
    pub end: usize,
    /// Protection domain
    pub category: ProtectionCategory,
}

/// Environments whose entire body must never reach the external transform.
const PROTECTED_ENVS: &[&str] = &[
    // Math environments
    "equation", "align", "alignat", "gather", "multline", "flalign", "eqnarray",
    "math", "displaymath",
    // TikZ
    "tikzpicture", "tikzcd", "pgfpicture",
    // Tables
    "tabular", "tabularx", "longtable", "array",
    // Algorithms
    "algorithm", "algorithmic", "algorithm2e",
    // Verbatim
    "verbatim", "lstlisting", "minted", "Verbatim",
    // Other technical environments
    "proof", "cases", "matrix", "pmatrix", "bmatrix", "vmatrix", "Vmatrix",
    "split", "subequations",
];

// Document structure commands
static SECTION_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\\(section|subsection|subsubsection|chapter|part|paragraph|subparagraph)\*?\s*(\[[^\]]*\])?\s*\{[^}]*\}",
    )
    .expect("valid regex")
});
static BEGIN_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(begin|end)\s*\{[^}]+\}").expect("valid regex"));
static DOCUMENT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(documentclass|usepackage|RequirePackage)(\[[^\]]*\])?\s*\{[^}]*\}")
        .expect("valid regex")
});
static INPUT_INCLUDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(input|include|includeonly|bibliography|bibliographystyle)\s*\{[^}]*\}")
        .expect("valid regex")
});

// Reference commands
static REF_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(ref|eqref|pageref|autoref|cref|Cref|nameref)\s*\{[^}]*\}").expect("valid regex")
});
static CITE_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(cite|citep|citet|citeauthor|citeyear|citealt|citealp|nocite)(\[[^\]]*\])*\s*\{[^}]*\}")
        .expect("valid regex")
});
static LABEL_CMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\label\s*\{[^}]*\}").expect("valid regex"));

// Formatting commands
static TEXT_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\\(textbf|textit|texttt|textrm|textsf|textsc|emph|underline|overline|textcolor)\s*(\{[^}]*\})?\s*\{[^}]*\}",
    )
    .expect("valid regex")
});
static FONT_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(tiny|scriptsize|footnotesize|small|normalsize|large|Large|LARGE|huge|Huge)\b")
        .expect("valid regex")
});
static FONT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(bfseries|itshape|ttfamily|rmfamily|sffamily|scshape|upshape|slshape|mdseries)\b")
        .expect("valid regex")
});

// Spacing, special characters, and the generic fallback
static SPACING_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(newline|linebreak|pagebreak|newpage|clearpage|hspace|vspace|hfill|vfill|quad|qquad|,|;|!)\*?(\{[^}]*\})?")
        .expect("valid regex")
});
static DOUBLE_BACKSLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\\\").expect("valid regex"));
static SPECIAL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[%$&#_{}~^]").expect("valid regex"));
static GENERIC_CMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[a-zA-Z]+\*?(\[[^\]]*\])*(\{[^}]*\})*").expect("valid regex"));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[^\n]*").expect("valid regex"));

static AUTHOR_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\author\s*\{").expect("valid regex"));
static TITLE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\title\s*\{").expect("valid regex"));

/// Math candidates: all five math forms found by the scanner.
pub fn math_candidates(text: &str, scanner: &SpanScanner) -> Vec<Candidate> {
    scanner
        .scan_math(text)
        .into_iter()
        .map(|s| Candidate {
            start: s.start,
            end: s.end,
            category: ProtectionCategory::Math,
        })
        .collect()
}

/// Table candidates: whole table environments found by the scanner.
pub fn table_candidates(text: &str, scanner: &SpanScanner) -> Vec<Candidate> {
    scanner
        .scan_tables(text)
        .into_iter()
        .map(|s| Candidate {
            start: s.start,
            end: s.end,
            category: ProtectionCategory::Table,
        })
        .collect()
}

/// Candidates for environments protected as an indivisible whole, in both
/// plain and starred variants.
pub fn protected_environment_candidates(text: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for base in PROTECTED_ENVS {
        for starred in [false, true] {
            let name = if starred {
                format!("{}*", base)
            } else {
                base.to_string()
            };
            for (start, end) in scanner::find_environment_spans(text, &name) {
                candidates.push(Candidate {
                    start,
                    end,
                    category: ProtectionCategory::Environment,
                });
            }
        }
    }

    candidates
}

/// Command candidates: structure, reference, formatting, spacing, special
/// characters, comments, and a generic fallback for anything shaped like
/// `\command[...]{...}`.
pub fn command_candidates(text: &str) -> Vec<Candidate> {
    let patterns: &[&Lazy<Regex>] = &[
        &SECTION_CMD,
        &BEGIN_END,
        &DOCUMENT_CLASS,
        &INPUT_INCLUDE,
        &REF_CMD,
        &CITE_CMD,
        &LABEL_CMD,
        &TEXT_FORMAT,
        &FONT_SIZE,
        &FONT_STYLE,
        &COMMENT,
        &DOUBLE_BACKSLASH,
        &SPACING_CMD,
        &SPECIAL_CHAR,
        &GENERIC_CMD,
    ];

    let mut candidates = Vec::new();
    for pattern in patterns {
        for m in pattern.find_iter(text) {
            if m.start() == m.end() {
                continue;
            }
            candidates.push(Candidate {
                start: m.start(),
                end: m.end(),
                category: ProtectionCategory::Command,
            });
        }
    }

    candidates
}

/// `\author{...}` blocks with their complete brace-balanced argument.
pub fn author_candidates(text: &str) -> Vec<Candidate> {
    balanced_block_candidates(text, &AUTHOR_OPEN, ProtectionCategory::Author)
}

/// `\title{...}` blocks with their complete brace-balanced argument.
pub fn title_candidates(text: &str) -> Vec<Candidate> {
    balanced_block_candidates(text, &TITLE_OPEN, ProtectionCategory::Title)
}

/// Locate a command key and capture through the matching closing brace by
/// explicit depth counting; arguments may nest braces, so pattern matching
/// alone cannot delimit the block. Unbalanced occurrences are skipped.
fn balanced_block_candidates(
    text: &str,
    opener: &Regex,
    category: ProtectionCategory,
) -> Vec<Candidate> {
    let bytes = text.as_bytes();
    let mut candidates = Vec::new();

    for m in opener.find_iter(text) {
        let start = m.start();
        let mut depth = 1usize;
        let mut pos = m.end();

        while pos < bytes.len() && depth > 0 {
            match bytes[pos] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            pos += 1;
        }

        if depth != 0 {
            continue;
        }

        candidates.push(Candidate {
            start,
            end: pos,
            category,
        });
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorCandidates_withNestedBraces_shouldCaptureWholeBlock() {
        let text = r"\author{John \textbf{Doe} and Jane}";
        let candidates = author_candidates(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].start, 0);
        assert_eq!(candidates[0].end, text.len());
    }

    #[test]
    fn test_authorCandidates_withUnbalancedBraces_shouldSkipOccurrence() {
        let candidates = author_candidates(r"\author{never closed");
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_titleCandidates_withTwoBlocks_shouldFindBoth() {
        let text = "\\title{First}\ntext\n\\title{Second}";
        let candidates = title_candidates(text);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_protectedEnvironmentCandidates_withVerbatim_shouldCoverBody() {
        let text = "before \\begin{verbatim}\nraw $stuff$ {\n\\end{verbatim} after";
        let candidates = protected_environment_candidates(text);
        assert_eq!(candidates.len(), 1);
        let body = &text[candidates[0].start..candidates[0].end];
        assert!(body.starts_with("\\begin{verbatim}"));
        assert!(body.ends_with("\\end{verbatim}"));
    }

    #[test]
    fn test_commandCandidates_withCitation_shouldMatchWholeCommand() {
        let text = r"see \cite[p.~4]{smith2019} for details";
        let candidates = command_candidates(text);
        assert!(candidates
            .iter()
            .any(|c| &text[c.start..c.end] == r"\cite[p.~4]{smith2019}"));
    }

    #[test]
    fn test_commandCandidates_withUnknownCommand_shouldUseGenericFallback() {
        let text = r"custom \mymacro[opt]{arg} here";
        let candidates = command_candidates(text);
        assert!(candidates
            .iter()
            .any(|c| &text[c.start..c.end] == r"\mymacro[opt]{arg}"));
    }

    #[test]
    fn test_commandCandidates_withComment_shouldRunToEndOfLine() {
        let text = "text % a note\nnext line";
        let candidates = command_candidates(text);
        assert!(candidates
            .iter()
            .any(|c| &text[c.start..c.end] == "% a note"));
    }
}
