/*!
 * Translation quality heuristics.
 *
 * Length-ratio bounds, target-script density with lenient tiers for short
 * inputs, fixed forbidden template fragments, and required structural
 * patterns that must survive the transformation.
 */

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration for the quality heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Output shorter than this fraction of the input is an error
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,
    /// Output longer than this multiple of the input is a warning
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,
    /// Minimum fraction of target-script characters expected in the output
    #[serde(default = "default_min_target_density")]
    pub min_target_density: f64,
    /// Relaxed density bound applied to outputs below the relaxed threshold
    #[serde(default = "default_relaxed_target_density")]
    pub relaxed_target_density: f64,
    /// Outputs shorter than this many characters use the relaxed density
    #[serde(default = "default_relaxed_length_threshold")]
    pub relaxed_length_threshold: usize,
    /// Density is not checked for outputs at or below this many characters
    #[serde(default = "default_density_skip_below")]
    pub density_skip_below: usize,
    /// Regex patterns that must appear in the output if present in the input
    #[serde(default = "default_required_patterns")]
    pub required_patterns: Vec<String>,
    /// Literal fragments whose presence marks the output as template text
    #[serde(default = "default_forbidden_fragments")]
    pub forbidden_fragments: Vec<String>,
}

fn default_min_length_ratio() -> f64 {
    0.3
}

fn default_max_length_ratio() -> f64 {
    3.0
}

fn default_min_target_density() -> f64 {
    0.05
}

fn default_relaxed_target_density() -> f64 {
    0.02
}

fn default_relaxed_length_threshold() -> usize {
    10_000
}

fn default_density_skip_below() -> usize {
    1_000
}

fn default_required_patterns() -> Vec<String> {
    vec![r"\\documentclass".to_string()]
}

fn default_forbidden_fragments() -> Vec<String> {
    [
        "This document contains the translated content",
        "Please add your paper content here",
        "Add related work section here",
        "Add methodology section here",
        "Add experiments section here",
        "Add conclusion section here",
        "此处应放置",
        "此处应填写",
        "请在此处添加",
        "的翻译版本",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
            min_target_density: default_min_target_density(),
            relaxed_target_density: default_relaxed_target_density(),
            relaxed_length_threshold: default_relaxed_length_threshold(),
            density_skip_below: default_density_skip_below(),
            required_patterns: default_required_patterns(),
            forbidden_fragments: default_forbidden_fragments(),
        }
    }
}

/// Outcome of the quality heuristics
#[derive(Debug, Clone, Default)]
pub struct QualityCheck {
    /// Output length divided by input length, in characters
    pub length_ratio: f64,
    /// Target-script characters counted in the output
    pub target_char_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl QualityCheck {
    pub fn is_acceptable(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run the quality heuristics on a transformed document.
pub fn check_quality(original: &str, translated: &str, config: &QualityConfig) -> QualityCheck {
    let original_chars = original.chars().count();
    let translated_chars = translated.chars().count();

    let mut check = QualityCheck {
        length_ratio: if original_chars == 0 {
            1.0
        } else {
            translated_chars as f64 / original_chars as f64
        },
        target_char_count: translated.chars().filter(|&c| is_target_script(c)).count(),
        ..QualityCheck::default()
    };

    if translated.trim().is_empty() {
        check.errors.push("translation output is empty".to_string());
        return check;
    }

    if check.length_ratio < config.min_length_ratio {
        warn!(
            "Translation unusually short: ratio {:.2} below {:.2}",
            check.length_ratio, config.min_length_ratio
        );
        check
            .errors
            .push("translation output is unusually short, content may have been lost".to_string());
    }
    if check.length_ratio > config.max_length_ratio {
        warn!(
            "Translation unusually long: ratio {:.2} above {:.2}",
            check.length_ratio, config.max_length_ratio
        );
        check
            .warnings
            .push("translation output is unusually long, content may be duplicated".to_string());
    }

    if translated_chars > config.density_skip_below {
        let density = check.target_char_count as f64 / translated_chars as f64;
        let threshold = if translated_chars < config.relaxed_length_threshold {
            config.relaxed_target_density
        } else {
            config.min_target_density
        };
        if density < threshold {
            check.errors.push(format!(
                "too few target-language characters in translation ({:.2}% of output, at least {:.2}% expected)",
                density * 100.0,
                threshold * 100.0
            ));
        }
    }

    for pattern in &config.required_patterns {
        if let Ok(re) = Regex::new(pattern) {
            if re.is_match(original) && !re.is_match(translated) {
                warn!("Required pattern missing in translation: {}", pattern);
                check
                    .errors
                    .push(format!("required structure lost in translation: {}", pattern));
            }
        }
    }

    for fragment in &config.forbidden_fragments {
        if translated.contains(fragment.as_str()) {
            warn!("Forbidden template fragment in translation: {}", fragment);
            check
                .errors
                .push("translation contains template placeholder text".to_string());
            break;
        }
    }

    check
}

/// CJK unified ideographs, extension A, and compatibility ideographs.
pub fn is_target_script(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkQuality_withEmptyOutput_shouldFail() {
        let check = check_quality("\\documentclass{article}", "  \n ", &QualityConfig::default());
        assert!(!check.is_acceptable());
    }

    #[test]
    fn test_checkQuality_withSevereShrinkage_shouldFail() {
        let original = "word ".repeat(200);
        let check = check_quality(&original, "tiny", &QualityConfig::default());
        assert!(!check.is_acceptable());
        assert!(check.length_ratio < 0.3);
    }

    #[test]
    fn test_checkQuality_withExcessiveGrowth_shouldWarnOnly() {
        let translated = "\u{8bcd}".repeat(400);
        let check = check_quality("short input", &translated, &QualityConfig::default());
        assert!(check.is_acceptable());
        assert!(!check.warnings.is_empty());
    }

    #[test]
    fn test_checkQuality_withMissingDocumentClass_shouldFail() {
        let original = format!("\\documentclass{{article}}\n{}", "text ".repeat(10));
        let translated = "translated body without the declaration".to_string();
        let check = check_quality(&original, &translated, &QualityConfig::default());
        assert!(check
            .errors
            .iter()
            .any(|e| e.contains("required structure")));
    }

    #[test]
    fn test_checkQuality_withForbiddenFragment_shouldFail() {
        let check = check_quality(
            "input text here",
            "Please add your paper content here",
            &QualityConfig::default(),
        );
        assert!(check
            .errors
            .iter()
            .any(|e| e.contains("template placeholder")));
    }

    #[test]
    fn test_checkQuality_withLowDensityLongOutput_shouldFail() {
        let original = "a".repeat(2000);
        let translated = "b".repeat(2000);
        let check = check_quality(&original, &translated, &QualityConfig::default());
        assert!(check
            .errors
            .iter()
            .any(|e| e.contains("target-language")));
    }

    #[test]
    fn test_checkQuality_withShortOutput_shouldSkipDensityCheck() {
        let check = check_quality("abc def ghi", "abc def ghi", &QualityConfig::default());
        assert!(check.is_acceptable());
    }

    #[test]
    fn test_isTargetScript_withHanAndLatin_shouldDistinguish() {
        assert!(is_target_script('\u{6587}'));
        assert!(!is_target_script('a'));
        assert!(!is_target_script('\u{3002}'));
    }
}
