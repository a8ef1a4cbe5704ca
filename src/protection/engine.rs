/*!
 * Protect/restore core: overlap resolution, token splicing, and the
 * placeholder table.
 */

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::protection::domains::{self, Candidate};
use crate::scanner::SpanScanner;

/// The protection domain a placeholder belongs to.
///
/// The ordering of `priority()` breaks ties when two candidate spans share
/// the same start and length: lower wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtectionCategory {
    /// An indivisible environment body (tikz, verbatim, tabular, ...)
    Environment,
    /// A table environment
    Table,
    /// A math region
    Math,
    /// An `\author{...}` block
    Author,
    /// A `\title{...}` block
    Title,
    /// A single command, comment, or special character
    Command,
}

impl ProtectionCategory {
    /// The category tag embedded in tokens.
    pub fn tag(&self) -> &'static str {
        match self {
            ProtectionCategory::Environment => "ENV",
            ProtectionCategory::Table => "TABLE",
            ProtectionCategory::Math => "MATH",
            ProtectionCategory::Author => "AUTHOR",
            ProtectionCategory::Title => "TITLE",
            ProtectionCategory::Command => "CMD",
        }
    }

    /// Tie-break rank for overlap resolution, lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            ProtectionCategory::Environment => 0,
            ProtectionCategory::Table => 1,
            ProtectionCategory::Math => 2,
            ProtectionCategory::Author | ProtectionCategory::Title => 3,
            ProtectionCategory::Command => 4,
        }
    }
}

fn default_delimiter_open() -> String {
    "<<<".to_string()
}

fn default_delimiter_close() -> String {
    ">>>".to_string()
}

fn default_prefix() -> String {
    "LATEX".to_string()
}

/// Token rendering configuration.
///
/// Tokens look like `<<<LATEX_MATH_0>>>`: the triple-angle delimiters are
/// unlikely to occur in documents and tend to survive external transforms
/// unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenFormat {
    /// Opening delimiter
    #[serde(default = "default_delimiter_open")]
    pub open: String,
    /// Closing delimiter
    #[serde(default = "default_delimiter_close")]
    pub close: String,
    /// Domain prefix shared by all tokens
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for TokenFormat {
    fn default() -> Self {
        Self {
            open: default_delimiter_open(),
            close: default_delimiter_close(),
            prefix: default_prefix(),
        }
    }
}

impl TokenFormat {
    /// Render the token for a category and sequence number.
    pub fn token(&self, category: ProtectionCategory, sequence: usize) -> String {
        format!(
            "{}{}_{}_{}{}",
            self.open,
            self.prefix,
            category.tag(),
            sequence,
            self.close
        )
    }
}

/// One protected span and the token standing in for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderEntry {
    /// The opaque token spliced into the text
    pub token: String,
    /// The exact original text the token replaced
    pub original_text: String,
    /// Which protection domain produced the entry
    pub domain: ProtectionCategory,
    /// Zero-based sequence number within the domain
    pub sequence_number: usize,
}

/// Token -> original-text mapping accumulated across protection passes.
///
/// Tokens are injective: no two entries ever share a token, even across
/// passes, because sequence numbers resume from the per-category count.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    entries: HashMap<String, PlaceholderEntry>,
    counts: HashMap<ProtectionCategory, usize>,
}

impl PlaceholderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of placeholders in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no placeholders.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its token.
    pub fn get(&self, token: &str) -> Option<&PlaceholderEntry> {
        self.entries.get(token)
    }

    /// All entries, ordered by domain tag then sequence number.
    pub fn entries(&self) -> Vec<&PlaceholderEntry> {
        let mut all: Vec<&PlaceholderEntry> = self.entries.values().collect();
        all.sort_by(|a, b| {
            a.domain
                .tag()
                .cmp(b.domain.tag())
                .then(a.sequence_number.cmp(&b.sequence_number))
        });
        all
    }

    /// Next sequence number for a category, resuming from prior passes.
    fn next_sequence(&self, category: ProtectionCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    fn insert(&mut self, entry: PlaceholderEntry) {
        *self.counts.entry(entry.domain).or_insert(0) += 1;
        self.entries.insert(entry.token.clone(), entry);
    }

    /// Replace every token in the text with its original content.
    ///
    /// Runs to a fixpoint so that spans protected in a later pass, whose
    /// original text embeds tokens from an earlier pass, restore fully.
    pub fn restore(&self, text: &str) -> String {
        let mut result = text.to_string();
        for _ in 0..=self.entries.len() {
            let mut changed = false;
            for entry in self.entries.values() {
                if result.contains(&entry.token) {
                    result = result.replace(&entry.token, &entry.original_text);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        result
    }

    /// Tokens from the table that do not appear in the text, ordered by
    /// domain tag then sequence number.
    pub fn missing_tokens(&self, text: &str) -> Vec<String> {
        let mut missing: Vec<&PlaceholderEntry> = self
            .entries
            .values()
            .filter(|e| !text.contains(&e.token))
            .collect();
        missing.sort_by(|a, b| {
            a.domain
                .tag()
                .cmp(b.domain.tag())
                .then(a.sequence_number.cmp(&b.sequence_number))
        });
        missing.iter().map(|e| e.token.clone()).collect()
    }

    /// Re-append tokens that were present in the source chunk but dropped
    /// by the external transform, so a later restore still reproduces
    /// every protected span.
    pub fn recover_missing(&self, source_chunk: &str, output: &str) -> String {
        let mut dropped: Vec<&PlaceholderEntry> = self
            .entries
            .values()
            .filter(|e| source_chunk.contains(&e.token) && !output.contains(&e.token))
            .collect();
        if dropped.is_empty() {
            return output.to_string();
        }

        dropped.sort_by(|a, b| {
            a.domain
                .tag()
                .cmp(b.domain.tag())
                .then(a.sequence_number.cmp(&b.sequence_number))
        });

        let mut result = output.to_string();
        for entry in dropped {
            warn!("recovered dropped placeholder by appending: {}", entry.token);
            result.push(' ');
            result.push_str(&entry.token);
        }
        result
    }
}

fn default_true() -> bool {
    true
}

/// Which protection domains to run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionConfig {
    /// Protect math regions
    #[serde(default = "default_true")]
    pub protect_math: bool,
    /// Protect table environments
    #[serde(default = "default_true")]
    pub protect_tables: bool,
    /// Protect indivisible environments (tikz, verbatim, algorithm, ...)
    #[serde(default = "default_true")]
    pub protect_environments: bool,
    /// Protect commands, comments and special characters
    #[serde(default = "default_true")]
    pub protect_commands: bool,
    /// Protect `\author{...}` and `\title{...}` blocks
    #[serde(default = "default_true")]
    pub protect_author_title: bool,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            protect_math: true,
            protect_tables: true,
            protect_environments: true,
            protect_commands: true,
            protect_author_title: true,
        }
    }
}

/// Converts domain span finders into reversible placeholder substitution
#[derive(Debug, Clone, Default)]
pub struct ProtectionEngine {
    format: TokenFormat,
    config: ProtectionConfig,
    scanner: SpanScanner,
}

impl ProtectionEngine {
    /// Create an engine with default token format and all domains enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(format: TokenFormat, config: ProtectionConfig) -> Self {
        Self {
            format,
            config,
            scanner: SpanScanner::new(),
        }
    }

    /// The token format in use.
    pub fn format(&self) -> &TokenFormat {
        &self.format
    }

    /// Protect all configured domains, returning the protected text and a
    /// fresh placeholder table.
    pub fn protect(&self, text: &str) -> (String, PlaceholderTable) {
        let mut table = PlaceholderTable::new();
        let protected = self.protect_into(text, &mut table);
        (protected, table)
    }

    /// Protect all configured domains, accumulating into an existing table.
    pub fn protect_into(&self, text: &str, table: &mut PlaceholderTable) -> String {
        let mut candidates: Vec<Candidate> = Vec::new();

        if self.config.protect_environments {
            candidates.extend(domains::protected_environment_candidates(text));
        }
        if self.config.protect_tables {
            candidates.extend(domains::table_candidates(text, &self.scanner));
        }
        if self.config.protect_math {
            candidates.extend(domains::math_candidates(text, &self.scanner));
        }
        if self.config.protect_author_title {
            candidates.extend(domains::author_candidates(text));
            candidates.extend(domains::title_candidates(text));
        }
        if self.config.protect_commands {
            candidates.extend(domains::command_candidates(text));
        }

        let kept = resolve_overlaps(candidates);
        let result = self.splice(text, &kept, table);

        debug!(
            "protected {} spans, {} -> {} bytes, table now holds {}",
            kept.len(),
            text.len(),
            result.len(),
            table.len()
        );
        result
    }

    /// Replace the kept spans with tokens, splicing in descending start
    /// order so earlier offsets stay valid. Sequence numbers are assigned
    /// ascending beforehand so they reflect final left-to-right order.
    fn splice(&self, text: &str, kept: &[Candidate], table: &mut PlaceholderTable) -> String {
        let mut next: HashMap<ProtectionCategory, usize> = HashMap::new();
        let mut tokens: Vec<String> = Vec::with_capacity(kept.len());
        for candidate in kept {
            let seq = next
                .entry(candidate.category)
                .or_insert_with(|| table.next_sequence(candidate.category));
            let token = self.format.token(candidate.category, *seq);
            *seq += 1;
            tokens.push(token);
        }

        let mut result = text.to_string();
        for (candidate, token) in kept.iter().zip(tokens.iter()).rev() {
            table.insert(PlaceholderEntry {
                token: token.clone(),
                original_text: text[candidate.start..candidate.end].to_string(),
                domain: candidate.category,
                sequence_number: token_sequence(token),
            });
            result.replace_range(candidate.start..candidate.end, token);
        }

        result
    }
}

/// Extract the trailing sequence number from a rendered token.
fn token_sequence(token: &str) -> usize {
    token
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Sort candidates by `(start asc, length desc, domain priority)` and keep
/// a span only if it starts at or after the previous kept span's end. The
/// longer or higher-priority span wins; overlapping spans are dropped,
/// never merged.
fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    if candidates.len() <= 1 {
        return candidates;
    }

    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then((b.end - b.start).cmp(&(a.end - a.start)))
            .then(a.category.priority().cmp(&b.category.priority()))
    });

    let mut kept: Vec<Candidate> = Vec::new();
    let mut last_end = 0usize;
    for candidate in candidates {
        if !kept.is_empty() && candidate.start < last_end {
            continue;
        }
        last_end = candidate.end;
        kept.push(candidate);
    }

    kept
}
