/*!
 * Reference-based structural repair.
 *
 * Conservative fixes for drift introduced by the external transform, each
 * driven by comparing the output against the original text. Every fix is
 * independent and idempotent, so repairing an already repaired document
 * changes nothing.
 */

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

static CAPTION_BOLD_ITALIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\\textbf\{\\textit\{[^}]+)\}([=,;:\u{ff0c}\u{ff1b}\u{ff1a}])")
        .expect("valid regex")
});
static CAPTION_BOLD_ITALIC_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\\textbf\{\\textit\{[^}]+)\}([\u{ff09})])").expect("valid regex")
});
static CAPTION_ITALIC_BOLD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\\textit\{\\textbf\{[^}]+)\}([=,;:\u{ff0c}\u{ff1b}\u{ff1a}])")
        .expect("valid regex")
});
static ENV_BEGIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\begin\{([^}]+)\}").expect("valid regex"));

/// Repairs a transformed document by reference to the original
#[derive(Debug, Clone, Default)]
pub struct ReferenceRepairer;

impl ReferenceRepairer {
    pub fn new() -> Self {
        Self
    }

    /// Apply all fixes. Returns the input unchanged when `original` is empty.
    pub fn repair(&self, original: &str, translated: &str) -> String {
        if original.is_empty() {
            return translated.to_string();
        }

        let mut result = translated.to_string();
        result = fix_resizebox_closing(original, &result);
        result = fix_caption_braces(&result);
        result = fix_trailing_garbage(original, &result);
        result = fix_missing_ends(original, &result);
        result
    }
}

/// Restore the extra closing brace after `\end{tabular}` inside a
/// `\resizebox{...}{...}{...}` wrapper when the transform dropped it.
fn fix_resizebox_closing(original: &str, translated: &str) -> String {
    let wanted = original.matches("\\end{tabular}}").count();
    let present = translated.matches("\\end{tabular}}").count();
    if wanted <= present {
        return translated.to_string();
    }

    let mut missing = wanted - present;
    let mut out = Vec::new();
    let mut in_resizebox = false;

    for line in translated.split_inclusive('\n') {
        let mut fixed = line.to_string();
        if line.contains("\\resizebox") {
            in_resizebox = true;
        }
        if in_resizebox && missing > 0 && line.contains("\\end{tabular}") && !line.contains("\\end{tabular}}")
        {
            fixed = fixed.replacen("\\end{tabular}", "\\end{tabular}}", 1);
            missing -= 1;
            in_resizebox = false;
            debug!("Restored resizebox closing brace");
        }
        if line.contains("\\end{table") {
            in_resizebox = false;
        }
        out.push(fixed);
    }

    out.concat()
}

/// Close nested `\textbf{\textit{...}}` caption formatting that lost its
/// outer brace before a punctuation mark.
fn fix_caption_braces(translated: &str) -> String {
    let mut result = CAPTION_BOLD_ITALIC
        .replace_all(translated, "${1}}}${2}")
        .into_owned();
    result = CAPTION_BOLD_ITALIC_PAREN
        .replace_all(&result, "${1}}}${2}")
        .into_owned();
    result = CAPTION_ITALIC_BOLD
        .replace_all(&result, "${1}}}${2}")
        .into_owned();
    result
}

/// Strip a run of trailing closing braces that exceeds the original's
/// trailing run by more than two.
fn fix_trailing_garbage(original: &str, translated: &str) -> String {
    let orig_trailing = trailing_close_braces(original);
    let trans_trailing = trailing_close_braces(translated);
    if trans_trailing <= orig_trailing + 2 {
        return translated.to_string();
    }

    info!(
        "Stripping {} trailing garbage brace(s)",
        trans_trailing - orig_trailing
    );
    let mut trimmed = translated.trim_end().to_string();
    for _ in 0..(trans_trailing - orig_trailing) {
        match trimmed.pop() {
            Some('}') => {}
            Some(other) => {
                trimmed.push(other);
                break;
            }
            None => break,
        }
        while trimmed.ends_with([' ', '\t', '\n', '\r']) {
            trimmed.pop();
        }
    }
    trimmed.push('\n');
    trimmed
}

/// Count closing braces at the end of the text, ignoring interleaved
/// whitespace.
fn trailing_close_braces(text: &str) -> usize {
    let mut count = 0usize;
    for c in text.chars().rev() {
        match c {
            '}' => count += 1,
            c if c.is_whitespace() => {}
            _ => break,
        }
    }
    count
}

/// Reinsert `\end{name}` tags the transform dropped, by reference to the
/// original's per-environment counts. Insertion goes before
/// `\end{document}` when present, otherwise at the end of the text.
fn fix_missing_ends(original: &str, translated: &str) -> String {
    let mut result = translated.to_string();

    let mut names: Vec<String> = ENV_BEGIN_NAME
        .captures_iter(original)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();
    names.sort();
    names.dedup();

    for name in names {
        if name == "document" {
            continue;
        }
        let end_tag = format!("\\end{{{}}}", name);
        let begin_tag = format!("\\begin{{{}}}", name);

        let orig_ends = original.matches(end_tag.as_str()).count();
        let trans_ends = result.matches(end_tag.as_str()).count();
        let orig_begins = original.matches(begin_tag.as_str()).count();
        let trans_begins = result.matches(begin_tag.as_str()).count();

        if trans_ends >= orig_ends || trans_begins < orig_begins {
            continue;
        }

        for _ in 0..(orig_ends - trans_ends) {
            info!("Reinserting missing {}", end_tag);
            if result.contains("\\end{document}") {
                result = result.replacen(
                    "\\end{document}",
                    &format!("{}\n\\end{{document}}", end_tag),
                    1,
                );
            } else {
                result.push('\n');
                result.push_str(&end_tag);
            }
        }
    }

    result
}
