/*!
 * Boundary-respecting chunk splitting.
 *
 * Protected text is cut into size-bounded pieces for the external transform.
 * Splitting prefers section starts, then blank-line paragraph breaks, then
 * sentence endings inside an oversized piece. Concatenating the returned
 * chunks always reproduces the input byte for byte.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default maximum chunk size in bytes
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 4000;

static SECTION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\\(section|subsection|subsubsection|chapter|part)\s*[\[{]")
        .expect("valid regex")
});
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// Sentence endings searched when an oversized piece must be cut mid-text.
/// Both Latin and CJK full-width punctuation are recognized.
const SENTENCE_ENDINGS: &[&str] = &[
    ". ", ".\n", "? ", "?\n", "! ", "!\n", "\u{3002}", "\u{ff1f}", "\u{ff01}",
];

/// Splits text into chunks no larger than a configured maximum,
/// cutting at structural boundaries whenever possible
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    max_size: usize,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl ChunkSplitter {
    /// Create a splitter with the given maximum chunk size in bytes
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
        }
    }

    /// Maximum chunk size in bytes
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Split text into chunks whose concatenation equals the input.
    ///
    /// Strategy order: if the text already fits, return it whole; if it has
    /// at least two section starts, pack whole sections; otherwise pack
    /// blank-line separated paragraphs. Pieces still over the limit are cut
    /// at sentence endings, newlines, or spaces, with a hard cut as the
    /// last resort.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() <= self.max_size {
            return vec![text.to_string()];
        }

        let pieces = self.split_by_sections(text).unwrap_or_else(|| {
            debug!("Fewer than two section starts, splitting by paragraphs");
            split_at_boundaries(
                text,
                PARAGRAPH_BREAK.find_iter(text).map(|m| m.end()).collect(),
            )
        });

        let mut chunks = Vec::new();
        let mut current = String::new();
        for piece in pieces {
            if !current.is_empty() && current.len() + piece.len() > self.max_size {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(&piece);
            while current.len() > self.max_size {
                let cut = self.find_break_point(&current);
                let rest = current.split_off(cut);
                chunks.push(std::mem::take(&mut current));
                current = rest;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        debug!("Split {} bytes into {} chunks", text.len(), chunks.len());
        chunks
    }

    /// Split at section starts when the document has at least two of them.
    fn split_by_sections(&self, text: &str) -> Option<Vec<String>> {
        let mut match_count = 0usize;
        let mut starts = Vec::new();
        for m in SECTION_START.find_iter(text) {
            match_count += 1;
            if m.start() > 0 {
                starts.push(m.start());
            }
        }
        if match_count < 2 {
            return None;
        }
        Some(split_at_boundaries(text, starts))
    }

    /// Pick a cut position for an oversized piece.
    ///
    /// Searches for the rightmost sentence ending inside the window between
    /// 80% of the limit and the limit; failing that, the last newline in the
    /// window; failing that, the last space in the first `max_size` bytes if
    /// it lies past the halfway mark; failing everything, a hard cut at the
    /// limit clamped to a character boundary.
    fn find_break_point(&self, text: &str) -> usize {
        let max = self.max_size;
        if text.len() <= max {
            return text.len();
        }

        let window_start = floor_char_boundary(text, max * 80 / 100);
        let window_end = floor_char_boundary(text, max);
        let window = &text[window_start..window_end];

        let mut best = 0usize;
        for ending in SENTENCE_ENDINGS {
            if let Some(idx) = window.rfind(ending) {
                let cut = window_start + idx + ending.len();
                if cut > best {
                    best = cut;
                }
            }
        }
        if best > 0 {
            return best;
        }

        if let Some(idx) = window.rfind('\n') {
            return window_start + idx + 1;
        }

        if let Some(idx) = text[..window_end].rfind(' ') {
            if idx > max / 2 {
                return idx + 1;
            }
        }

        if window_end > 0 {
            return window_end;
        }
        // The limit is smaller than the first character; emit it whole
        // rather than cut inside its encoding.
        text.char_indices().nth(1).map_or(text.len(), |(i, _)| i)
    }
}

/// Cut `text` at the given ascending byte offsets. Offsets at 0 or past the
/// end are ignored; every piece keeps its original bytes so the pieces
/// concatenate back to `text`.
fn split_at_boundaries(text: &str, mut boundaries: Vec<usize>) -> Vec<String> {
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut pieces = Vec::new();
    let mut prev = 0usize;
    for b in boundaries {
        if b == 0 || b >= text.len() {
            continue;
        }
        pieces.push(text[prev..b].to_string());
        prev = b;
    }
    pieces.push(text[prev..].to_string());
    pieces
}

/// Largest byte index not exceeding `index` that lies on a char boundary.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}
