/*!
 * Integration tests for the document translation workflow
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_test::assert_ok;

use latrans::pipeline::{DocumentTranslator, TranslationOptions};
use latrans::protection::ProtectionEngine;
use latrans::providers::mock::{MockBehavior, MockProvider};
use latrans::splitter::ChunkSplitter;
use latrans::validation::StructuralValidator;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_document() -> String {
    let mut doc = String::new();
    doc.push_str("\\documentclass{article}\n");
    doc.push_str("\\title{A Study of Things}\n");
    doc.push_str("\\author{J. Doe}\n");
    doc.push_str("\\begin{document}\n");
    for section in 1..=4 {
        doc.push_str(&format!("\\section{{Part {}}}\n", section));
        doc.push_str("% section notes\n");
        for _ in 0..12 {
            doc.push_str("Some prose with inline math $x^2 + y^2 = z^2$ in it. ");
            doc.push_str("More prose follows here, referencing \\ref{fig:one}.\n");
        }
        doc.push_str("\\begin{equation}\nE = mc^2\n\\end{equation}\n\n");
    }
    doc.push_str("\\begin{table}\n\\begin{tabular}{cc}\na & b \\\\\nc & d\n\\end{tabular}\n\\end{table}\n");
    doc.push_str("\\end{document}\n");
    doc
}

fn fast_options() -> TranslationOptions {
    TranslationOptions {
        max_chunk_size: 600,
        base_retry_delay: Duration::from_millis(1),
        ..TranslationOptions::default()
    }
}

/// Quality heuristics expect translated output in the target script, which
/// an echo test cannot provide; structural checks stay on.
fn structural_only() -> StructuralValidator {
    StructuralValidator {
        check_quality: false,
        ..StructuralValidator::new()
    }
}

/// An echoing provider must reproduce the document exactly through
/// protect, split, transform, join, repair, and restore.
#[tokio::test]
async fn test_pipeline_withEchoProvider_shouldReproduceDocument() {
    init_logging();
    let document = sample_document();
    let translator = DocumentTranslator::with_options(MockProvider::working(), fast_options())
        .with_validator(structural_only());

    let outcome = translator.translate(&document).await.unwrap();

    assert_eq!(outcome.translated, document);
    assert!(outcome.report.is_valid(), "report: {}", outcome.report);
}

/// The round trip must hold for arbitrary prose, not just hand-picked text.
#[tokio::test]
async fn test_pipeline_withGeneratedDocuments_shouldAlwaysRoundTrip() -> Result<()> {
    init_logging();
    let mut rng = StdRng::seed_from_u64(7);
    let words = ["alpha", "beta", "$x$", "\\cite{k}", "gamma%note", "\\textbf{b}"];

    for _ in 0..5 {
        let mut doc = String::new();
        for _ in 0..rng.random_range(50..200) {
            doc.push_str(words[rng.random_range(0..words.len())]);
            if rng.random_range(0..8) == 0 {
                doc.push_str("\n\n");
            } else {
                doc.push(' ');
            }
        }
        let options = TranslationOptions {
            max_chunk_size: rng.random_range(80..400),
            ..fast_options()
        };
        let translator = DocumentTranslator::with_options(MockProvider::working(), options);
        let outcome = translator.translate(&doc).await?;
        assert_eq!(outcome.translated, doc);
    }
    Ok(())
}

/// Chunks completing out of order must still reassemble in input order.
#[tokio::test]
async fn test_pipeline_withStaggeredDelays_shouldReassembleInOrder() {
    init_logging();
    let document = sample_document();
    let options = TranslationOptions {
        concurrency: 4,
        ..fast_options()
    };
    let provider = MockProvider::new(MockBehavior::Staggered { step_ms: 3 });
    let translator = DocumentTranslator::with_options(provider, options);

    let outcome = translator.translate(&document).await.unwrap();

    assert_eq!(outcome.translated, document);
}

/// Protected spans are opaque tokens, so no chunk may contain a torn one.
#[test]
fn test_protectAndSplit_withSmallChunks_shouldNeverTearTokens() {
    let document = sample_document();
    let engine = ProtectionEngine::new();
    let (protected, table) = engine.protect(&document);
    assert!(!table.is_empty());

    let splitter = ChunkSplitter::new(200);
    let chunks = splitter.split(&protected);
    assert!(chunks.len() > 1);
    assert_eq!(chunks.concat(), protected);

    for chunk in &chunks {
        assert_eq!(
            chunk.matches("<<<").count(),
            chunk.matches(">>>").count(),
            "torn token in chunk: {:?}",
            chunk
        );
    }
}

/// A table smaller than the chunk limit must land whole in a single chunk,
/// with its begin and end in the same piece.
#[test]
fn test_protectAndSplit_withTableUnderLimit_shouldKeepTableInOneChunk() {
    let document = sample_document();
    let engine = ProtectionEngine::new();
    let (protected, table) = engine.protect(&document);

    let splitter = ChunkSplitter::new(200);
    let chunks = splitter.split(&protected);
    assert!(chunks.len() > 1);

    let mut chunks_with_table = 0usize;
    for chunk in &chunks {
        let restored = table.restore(chunk);
        assert_eq!(
            restored.matches("\\begin{table}").count(),
            restored.matches("\\end{table}").count(),
            "table torn across chunks: {:?}",
            chunk
        );
        if restored.contains("\\begin{table}") {
            chunks_with_table += 1;
        }
    }
    assert_eq!(chunks_with_table, 1);
}

/// A provider that drops placeholder tokens still yields a document with
/// every protected structure present after recovery and restore.
#[tokio::test]
async fn test_pipeline_withTokenDroppingProvider_shouldRecoverProtectedSpans() {
    init_logging();
    let document = sample_document();
    let translator =
        DocumentTranslator::with_options(MockProvider::dropping_tokens(), fast_options());

    let outcome = translator.translate(&document).await.unwrap();

    assert!(outcome.translated.contains("E = mc^2"));
    assert!(outcome.translated.contains("\\begin{tabular}{cc}"));
    assert!(outcome.translated.contains("$x^2 + y^2 = z^2$"));
    assert!(!outcome.translated.contains("<<<"));
}

/// Transient provider failures within the retry budget must not surface.
#[tokio::test]
async fn test_pipeline_withTransientFailures_shouldCompleteAfterRetries() {
    init_logging();
    let document = sample_document();
    let provider = MockProvider::failing_first(2);
    let translator = DocumentTranslator::with_options(provider.clone(), fast_options());

    let result = translator.translate(&document).await;
    let outcome = assert_ok!(result);

    assert_eq!(outcome.translated, document);
    // Two failed requests plus one successful call per chunk
    assert!(provider.request_count() > 2);
}

/// The progress callback must report a stable total and end at done == total.
#[tokio::test]
async fn test_pipeline_withProgressCallback_shouldReachTotal() {
    init_logging();
    let document = sample_document();
    let progress = Arc::new(std::sync::Mutex::new((0usize, 0usize)));
    let progress_in_callback = Arc::clone(&progress);
    let translator = DocumentTranslator::with_options(MockProvider::working(), fast_options())
        .with_progress_callback(Arc::new(move |done, total| {
            if let Ok(mut last) = progress_in_callback.lock() {
                *last = (done, total);
            }
        }));

    translator.translate(&document).await.unwrap();

    let (done, total) = *progress.lock().unwrap();
    assert!(total > 1);
    assert_eq!(done, total);
}

/// Options deserialize from JSON with every omitted field defaulted.
#[test]
fn test_translationOptions_fromJson_shouldApplyDefaults() -> Result<()> {
    let options: TranslationOptions = serde_json::from_str(r#"{"concurrency": 8}"#)?;
    assert_eq!(options.concurrency, 8);
    assert_eq!(options.max_chunk_size, 4000);
    assert_eq!(options.max_retries, 2);
    assert_eq!(options.base_retry_delay, Duration::from_secs(2));
    Ok(())
}
