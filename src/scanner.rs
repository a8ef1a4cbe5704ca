/*!
 * Structural span detection for LaTeX-like documents.
 *
 * The scanner finds comments, math regions, tables, environments and marks
 * nesting relationships between them. It never fails on malformed input:
 * an unmatched `\begin` simply produces no span, and the consequences are
 * caught later by the validator.
 */

use std::collections::HashSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// The kind of structural region a span represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// A single command like `\textbf{...}`
    Command,
    /// A `\begin{name}...\end{name}` region
    Environment,
    /// Inline math: `$...$` or `\(...\)`
    MathInline,
    /// Display math: `$$...$$`, `\[...\]`, or a named math environment
    MathDisplay,
    /// A table environment
    Table,
    /// A `%` comment to end of line
    Comment,
}

/// A recognized structural region with a half-open byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// What kind of structure this is
    pub kind: SpanKind,
    /// Structure name (environment name, `"$"`, `"comment"`, ...)
    pub name: String,
    /// Start byte offset, inclusive
    pub start: usize,
    /// End byte offset, exclusive
    pub end: usize,
    /// The raw text covered by the span
    pub raw_text: String,
    /// Whether this span lies strictly inside another span
    pub is_nested: bool,
    /// Kind of the first enclosing span found, if nested
    pub parent_kind: Option<SpanKind>,
}

impl Span {
    fn new(kind: SpanKind, name: &str, start: usize, end: usize, text: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            start,
            end,
            raw_text: text[start..end].to_string(),
            is_nested: false,
            parent_kind: None,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

static DOUBLE_DOLLAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\$[\s\S]*?\$\$").expect("valid regex"));
static BRACKET_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\[[\s\S]*?\\\]").expect("valid regex"));
static PAREN_MATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\([\s\S]*?\\\)").expect("valid regex"));
static BEGIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\begin\{([^}]+)\}").expect("valid regex"));

/// Environment name tables used by the scanner.
///
/// These are immutable after construction so a scanner can be shared freely
/// across concurrent workers.
#[derive(Debug, Clone)]
pub struct ScannerVocabulary {
    /// Named math environments (`equation`, `align`, ...) including starred variants
    pub math_envs: Vec<String>,
    /// Table environments including the matrix family
    pub table_envs: Vec<String>,
    /// Other well-known general environments
    pub general_envs: Vec<String>,
}

impl Default for ScannerVocabulary {
    fn default() -> Self {
        let to_vec = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            math_envs: to_vec(&[
                "equation", "equation*",
                "align", "align*",
                "gather", "gather*",
                "multline", "multline*",
                "eqnarray", "eqnarray*",
                "displaymath", "math",
                "flalign", "flalign*",
                "alignat", "alignat*",
            ]),
            table_envs: to_vec(&[
                "table", "table*",
                "tabular", "tabular*",
                "tabularx", "tabulary",
                "longtable", "longtable*",
                "supertabular", "array",
                "matrix", "pmatrix", "bmatrix", "vmatrix", "Vmatrix", "Bmatrix",
                "smallmatrix",
            ]),
            general_envs: to_vec(&[
                "document", "abstract", "figure", "figure*",
                "itemize", "enumerate", "description",
                "quote", "quotation", "verse",
                "center", "flushleft", "flushright",
                "minipage", "parbox",
                "verbatim", "verbatim*",
                "lstlisting",
                "theorem", "lemma", "proof", "definition", "corollary", "proposition",
                "example", "remark", "note",
                "appendix", "bibliography",
                "tikzpicture",
                "algorithm", "algorithmic",
                "frame", "block", "alertblock", "exampleblock",
                "columns", "column",
                "thebibliography",
                "filecontents", "filecontents*",
            ]),
        }
    }
}

impl ScannerVocabulary {
    /// Whether the name belongs to any of the fixed vocabularies.
    pub fn is_known(&self, name: &str) -> bool {
        self.math_envs.iter().any(|e| e == name)
            || self.table_envs.iter().any(|e| e == name)
            || self.general_envs.iter().any(|e| e == name)
    }
}

/// Scans text for structural spans
#[derive(Debug, Clone, Default)]
pub struct SpanScanner {
    vocabulary: ScannerVocabulary,
}

impl SpanScanner {
    /// Create a scanner with the default vocabularies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with custom vocabularies.
    pub fn with_vocabulary(vocabulary: ScannerVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Access the vocabulary tables.
    pub fn vocabulary(&self) -> &ScannerVocabulary {
        &self.vocabulary
    }

    /// Find all structural spans in the text, ordered by start position,
    /// with nesting relationships assigned.
    pub fn scan(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        spans.extend(scan_comments(text));
        spans.extend(self.scan_math(text));
        spans.extend(self.scan_environments(text));
        spans.extend(self.scan_tables(text));

        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        mark_nested(&mut spans);

        debug!(
            "identified {} structural spans in {} bytes",
            spans.len(),
            text.len()
        );
        spans
    }

    /// Find all math spans: `$$...$$`, `$...$`, `\[...\]`, `\(...\)`,
    /// and named math environments.
    pub fn scan_math(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        for m in DOUBLE_DOLLAR.find_iter(text) {
            spans.push(Span::new(SpanKind::MathDisplay, "$$", m.start(), m.end(), text));
        }
        spans.extend(scan_single_dollar(text));
        for m in BRACKET_MATH.find_iter(text) {
            spans.push(Span::new(SpanKind::MathDisplay, "\\[\\]", m.start(), m.end(), text));
        }
        for m in PAREN_MATH.find_iter(text) {
            spans.push(Span::new(SpanKind::MathInline, "\\(\\)", m.start(), m.end(), text));
        }
        for env in &self.vocabulary.math_envs {
            for (start, end) in find_environment_spans(text, env) {
                spans.push(Span::new(SpanKind::MathDisplay, env, start, end, text));
            }
        }

        spans
    }

    /// Find all table environment spans.
    pub fn scan_tables(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        for env in &self.vocabulary.table_envs {
            for (start, end) in find_environment_spans(text, env) {
                spans.push(Span::new(SpanKind::Table, env, start, end, text));
            }
        }
        spans
    }

    /// Find general environments: the known vocabulary plus every distinct
    /// name discovered in a `\begin{...}` that is not already covered by
    /// the math or table vocabularies.
    fn scan_environments(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        for env in &self.vocabulary.general_envs {
            for (start, end) in find_environment_spans(text, env) {
                spans.push(Span::new(SpanKind::Environment, env, start, end, text));
            }
        }

        // User-defined environments: collect names dynamically
        let mut seen: HashSet<&str> = HashSet::new();
        for cap in BEGIN_NAME.captures_iter(text) {
            if let Some(name) = cap.get(1) {
                seen.insert(name.as_str());
            }
        }
        for name in seen {
            if self.vocabulary.is_known(name) {
                continue;
            }
            for (start, end) in find_environment_spans(text, name) {
                spans.push(Span::new(SpanKind::Environment, name, start, end, text));
            }
        }

        spans
    }
}

/// Find all `\begin{name}...\end{name}` spans for one environment name,
/// pairing nested occurrences with an explicit depth stack. Unmatched
/// `\begin` tags produce no span.
pub fn find_environment_spans(text: &str, name: &str) -> Vec<(usize, usize)> {
    let begin_tag = format!("\\begin{{{}}}", name);
    let end_tag = format!("\\end{{{}}}", name);

    // Collect begin/end tag positions in document order
    let mut events: Vec<(usize, bool, usize)> = Vec::new();
    for (pos, _) in text.match_indices(&begin_tag) {
        events.push((pos, true, pos + begin_tag.len()));
    }
    for (pos, _) in text.match_indices(&end_tag) {
        events.push((pos, false, pos + end_tag.len()));
    }
    events.sort_by_key(|&(pos, _, _)| pos);

    let mut stack: Vec<usize> = Vec::new();
    let mut matched = Vec::new();
    for (pos, is_begin, tag_end) in events {
        if is_begin {
            stack.push(pos);
        } else if let Some(start) = stack.pop() {
            matched.push((start, tag_end));
        }
    }

    matched.sort_by_key(|&(start, _)| start);
    matched
}

/// Find the matching `\end{name}` for the `\begin{name}` at `start`,
/// counting nesting depth forward. Returns the byte offset just past the
/// closing tag, or `None` if the environment never closes.
pub fn find_environment_end(text: &str, start: usize, name: &str) -> Option<usize> {
    let begin_tag = format!("\\begin{{{}}}", name);
    let end_tag = format!("\\end{{{}}}", name);

    let mut depth = 1usize;
    let mut search = start + begin_tag.len();

    while depth > 0 && search < text.len() {
        let next_begin = text[search..].find(&begin_tag);
        let next_end = text[search..].find(&end_tag)?;

        match next_begin {
            Some(b) if b < next_end => {
                depth += 1;
                search += b + begin_tag.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(search + next_end + end_tag.len());
                }
                search += next_end + end_tag.len();
            }
        }
    }

    None
}

/// Scan for `$...$` inline math, skipping `$$` pairs, escaped `\$`,
/// and empty `$$` pairs.
pub fn scan_single_dollar(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        // Skip a $$...$$ region entirely
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'$' {
            match text[i + 2..].find("$$") {
                Some(idx) => i = i + 2 + idx + 2,
                None => i += 2,
            }
            continue;
        }

        if bytes[i] == b'$' {
            if i > 0 && bytes[i - 1] == b'\\' {
                i += 1;
                continue;
            }

            let start = i;
            i += 1;
            while i < bytes.len() {
                if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'$' {
                    i += 2;
                    continue;
                }
                if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'$' {
                    i += 2;
                    continue;
                }
                if bytes[i] == b'$' {
                    // Reject the empty pair
                    if i > start + 1 {
                        spans.push(Span::new(SpanKind::MathInline, "$", start, i + 1, text));
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            continue;
        }

        i += 1;
    }

    spans
}

/// Find comment spans: a line whose first non-space character is `%` is a
/// full-line comment; otherwise the first unescaped `%` starts an inline
/// comment running to end of line.
pub fn scan_comments(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;

    for line in text.split('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('%') {
            if let Some(offset) = line.find('%') {
                spans.push(Span::new(
                    SpanKind::Comment,
                    "comment",
                    pos + offset,
                    pos + line.len(),
                    text,
                ));
            }
        } else if let Some(offset) = find_unescaped_percent(line) {
            spans.push(Span::new(
                SpanKind::Comment,
                "inline_comment",
                pos + offset,
                pos + line.len(),
                text,
            ));
        }
        pos += line.len() + 1;
    }

    spans
}

/// Find the first `%` in a line that is not escaped by an odd run of
/// backslashes.
pub fn find_unescaped_percent(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let idx = line[i..].find('%')?;
        let pos = i + idx;

        if pos > 0 && bytes[pos - 1] == b'\\' {
            let mut backslashes = 0;
            let mut j = pos;
            while j > 0 && bytes[j - 1] == b'\\' {
                backslashes += 1;
                j -= 1;
            }
            if backslashes % 2 == 1 {
                i = pos + 1;
                continue;
            }
        }

        return Some(pos);
    }

    None
}

/// Containment pass: span i is nested in the first span j found with
/// `start_j < start_i` and `end_i < end_j`.
fn mark_nested(spans: &mut [Span]) {
    for i in 0..spans.len() {
        for j in 0..spans.len() {
            if i == j {
                continue;
            }
            if spans[i].start > spans[j].start && spans[i].end < spans[j].end {
                spans[i].is_nested = true;
                spans[i].parent_kind = Some(spans[j].kind);
                break;
            }
        }
    }
}
