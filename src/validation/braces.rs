/*!
 * Brace balance validation.
 *
 * A single character scan that ignores full-line comments and escaped
 * braces, tracks nesting depth, and records the location of every
 * unmatched brace.
 */

/// Location of a brace in the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceSite {
    /// Byte offset
    pub position: usize,
    /// 1-based line number
    pub line: usize,
}

/// Result of brace validation
#[derive(Debug, Clone, Default)]
pub struct BraceValidation {
    pub open_count: usize,
    pub close_count: usize,
    /// Deepest nesting level reached
    pub max_depth: usize,
    /// Opening braces never closed
    pub unmatched_open: Vec<BraceSite>,
    /// Closing braces with no matching open
    pub unmatched_close: Vec<BraceSite>,
}

impl BraceValidation {
    pub fn is_balanced(&self) -> bool {
        self.unmatched_open.is_empty() && self.unmatched_close.is_empty()
    }

    /// `open_count - close_count`
    pub fn difference(&self) -> i64 {
        self.open_count as i64 - self.close_count as i64
    }
}

/// Validate brace balance in `text`.
///
/// Lines whose first non-blank character is `%` are comments and do not
/// contribute braces. A brace preceded by an odd run of backslashes is a
/// literal character, not a group delimiter.
pub fn validate_braces(text: &str) -> BraceValidation {
    let mut result = BraceValidation::default();
    let mut stack: Vec<BraceSite> = Vec::new();

    let mut line = 1usize;
    let mut line_blank = true;
    let mut in_comment = false;

    for (pos, ch) in text.char_indices() {
        if ch == '\n' {
            line += 1;
            line_blank = true;
            in_comment = false;
            continue;
        }
        if in_comment {
            continue;
        }
        if ch == '%' && line_blank && !is_escaped(text, pos) {
            in_comment = true;
            continue;
        }
        if !ch.is_whitespace() {
            line_blank = false;
        }

        match ch {
            '{' if !is_escaped(text, pos) => {
                result.open_count += 1;
                stack.push(BraceSite { position: pos, line });
                result.max_depth = result.max_depth.max(stack.len());
            }
            '}' if !is_escaped(text, pos) => {
                result.close_count += 1;
                if stack.pop().is_none() {
                    result.unmatched_close.push(BraceSite { position: pos, line });
                }
            }
            _ => {}
        }
    }

    result.unmatched_open = stack;
    result
}

/// True when the byte at `pos` is preceded by an odd run of backslashes.
fn is_escaped(text: &str, pos: usize) -> bool {
    let bytes = text.as_bytes();
    let mut backslashes = 0usize;
    let mut i = pos;
    while i > 0 && bytes[i - 1] == b'\\' {
        backslashes += 1;
        i -= 1;
    }
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validateBraces_withCommentedBraces_shouldIgnoreCommentLine() {
        let result = validate_braces("% {{{{\n\\textbf{hello}");
        assert_eq!(result.open_count, 1);
        assert_eq!(result.close_count, 1);
        assert!(result.is_balanced());
    }

    #[test]
    fn test_validateBraces_withExtraClose_shouldRecordLocation() {
        let result = validate_braces("\\textbf{hello}}");
        assert_eq!(result.open_count, 1);
        assert_eq!(result.close_count, 2);
        assert_eq!(result.difference(), -1);
        assert_eq!(result.unmatched_close.len(), 1);
        assert_eq!(result.unmatched_close[0].line, 1);
    }

    #[test]
    fn test_validateBraces_withEscapedBraces_shouldNotCountThem() {
        let result = validate_braces(r"a \{ b \} c");
        assert_eq!(result.open_count, 0);
        assert_eq!(result.close_count, 0);
        assert!(result.is_balanced());
    }

    #[test]
    fn test_validateBraces_withDoubleBackslashBrace_shouldCountBrace() {
        // \\{ is a line break followed by a real group open
        let result = validate_braces(r"a \\{ b }");
        assert_eq!(result.open_count, 1);
        assert_eq!(result.close_count, 1);
        assert!(result.is_balanced());
    }

    #[test]
    fn test_validateBraces_withNestedGroups_shouldTrackMaxDepth() {
        let result = validate_braces(r"\a{\b{\c{x}}}");
        assert_eq!(result.max_depth, 3);
        assert!(result.is_balanced());
    }

    #[test]
    fn test_validateBraces_withUnclosedOpen_shouldReportLine() {
        let result = validate_braces("line one\n\\begin{x\nmore");
        assert_eq!(result.unmatched_open.len(), 1);
        assert_eq!(result.unmatched_open[0].line, 2);
    }

    #[test]
    fn test_validateBraces_withInlineComment_shouldStillCountBraces() {
        // Only full-line comments are skipped by this scan
        let result = validate_braces("text % {\nrest}");
        assert_eq!(result.open_count, 1);
        assert_eq!(result.close_count, 1);
    }
}
