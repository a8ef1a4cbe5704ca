/*!
 * End-to-end document translation.
 *
 * Orchestrates the full run: protect structures behind placeholder tokens,
 * split into size-bounded chunks, transform chunks concurrently with
 * bounded parallelism and retries, reassemble in order, repair drift
 * against the protected original, restore the placeholders, and validate
 * the result against the input document.
 */

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::errors::{ProviderError, TranslationError};
use crate::protection::ProtectionEngine;
use crate::providers::TransformProvider;
use crate::repair::ReferenceRepairer;
use crate::splitter::ChunkSplitter;
use crate::validation::{StructuralValidator, ValidationReport};

/// Callback invoked after each chunk completes: (done, total)
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options controlling chunking, concurrency, and retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOptions {
    /// Maximum chunk size in bytes
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Maximum concurrent provider calls
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retries per chunk after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Base delay for linear retry backoff
    #[serde(default = "default_base_retry_delay")]
    pub base_retry_delay: Duration,
    /// Per-call timeout; timed-out calls count as network errors
    #[serde(default)]
    pub request_timeout: Option<Duration>,
}

fn default_max_chunk_size() -> usize {
    4000
}

fn default_concurrency() -> usize {
    3
}

fn default_max_retries() -> usize {
    2
}

fn default_base_retry_delay() -> Duration {
    Duration::from_secs(2)
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            base_retry_delay: default_base_retry_delay(),
            request_timeout: None,
        }
    }
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// The transformed document with all placeholders restored
    pub translated: String,
    /// Structural validation of the result against the input.
    /// A failed report never aborts the run; the caller decides.
    pub report: ValidationReport,
}

/// Drives a document through the whole translation pipeline
pub struct DocumentTranslator<P: TransformProvider> {
    provider: Arc<P>,
    options: TranslationOptions,
    engine: ProtectionEngine,
    repairer: ReferenceRepairer,
    validator: StructuralValidator,
    progress_callback: Option<ProgressCallback>,
}

impl<P: TransformProvider + 'static> DocumentTranslator<P> {
    /// Create a translator with default options
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, TranslationOptions::default())
    }

    /// Create a translator with explicit options
    pub fn with_options(provider: P, options: TranslationOptions) -> Self {
        Self {
            provider: Arc::new(provider),
            options,
            engine: ProtectionEngine::new(),
            repairer: ReferenceRepairer::new(),
            validator: StructuralValidator::new(),
            progress_callback: None,
        }
    }

    /// Replace the protection engine
    pub fn with_engine(mut self, engine: ProtectionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Replace the validator
    pub fn with_validator(mut self, validator: StructuralValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Install a progress callback
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Current options
    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    /// Translate a whole document.
    ///
    /// Fails fast on the first chunk whose retries are exhausted or that
    /// hits a non-retryable provider error; the error carries the chunk
    /// index. Validation findings never fail the run.
    pub async fn translate(&self, document: &str) -> Result<TranslationOutcome, TranslationError> {
        if document.is_empty() {
            return Ok(TranslationOutcome {
                translated: String::new(),
                report: ValidationReport::default(),
            });
        }

        let (protected, table) = self.engine.protect(document);
        debug!("Protected {} span(s)", table.len());

        let splitter = ChunkSplitter::new(self.options.max_chunk_size);
        let chunks = splitter.split(&protected);
        let total_chunks = chunks.len();
        info!(
            "Translating {} chunk(s) with concurrency {} via provider '{}'",
            total_chunks,
            self.options.concurrency,
            self.provider.name()
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let completed = Arc::new(StdMutex::new(0usize));

        let mut results: Vec<(usize, Result<String, ProviderError>)> =
            stream::iter(chunks.iter().enumerate())
                .map(|(chunk_index, chunk)| {
                    let semaphore = Arc::clone(&semaphore);
                    let completed = Arc::clone(&completed);
                    let table = &table;
                    async move {
                        let _permit = match semaphore.acquire().await {
                            Ok(permit) => permit,
                            Err(_) => {
                                return (
                                    chunk_index,
                                    Err(ProviderError::Internal(
                                        "worker pool closed unexpectedly".to_string(),
                                    )),
                                );
                            }
                        };

                        let result = self
                            .transform_with_retry(chunk_index, chunk)
                            .await
                            .map(|output| table.recover_missing(chunk, &output));

                        if let Ok(mut done) = completed.lock() {
                            *done += 1;
                            if let Some(callback) = &self.progress_callback {
                                callback(*done, total_chunks);
                            }
                        }

                        (chunk_index, result)
                    }
                })
                .buffer_unordered(self.options.concurrency.max(1))
                .collect()
                .await;

        // Reassemble in original order regardless of completion order
        results.sort_by_key(|(idx, _)| *idx);

        let mut joined = String::with_capacity(protected.len());
        for (chunk_index, result) in results {
            match result {
                Ok(text) => joined.push_str(&text),
                Err(e) => return Err(TranslationError::for_chunk(chunk_index, e)),
            }
        }

        let repaired = self.repairer.repair(&protected, &joined);
        let restored = table.restore(&repaired);
        let report = self.validator.validate(document, &restored);
        if !report.is_valid() {
            warn!("Translation completed with validation errors:\n{}", report);
        }

        Ok(TranslationOutcome {
            translated: restored,
            report,
        })
    }

    /// Call the provider for one chunk, retrying transient failures with
    /// linear backoff. A configured timeout counts as a network failure.
    async fn transform_with_retry(
        &self,
        chunk_index: usize,
        chunk: &str,
    ) -> Result<String, ProviderError> {
        let mut attempt = 0usize;
        loop {
            let call = self.provider.transform(chunk);
            let result = match self.options.request_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(inner) => inner,
                    Err(_) => Err(ProviderError::Network(format!(
                        "request timed out after {:?}",
                        limit
                    ))),
                },
                None => call.await,
            };

            match result {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    let delay = self.options.base_retry_delay * attempt as u32;
                    warn!(
                        "Chunk {} attempt {} failed ({}), retrying in {:?}",
                        chunk_index, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("Chunk {} failed permanently: {}", chunk_index, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    fn fast_options() -> TranslationOptions {
        TranslationOptions {
            base_retry_delay: Duration::from_millis(1),
            ..TranslationOptions::default()
        }
    }

    #[tokio::test]
    async fn test_translate_withEmptyDocument_shouldReturnEmptyOutcome() {
        let translator = DocumentTranslator::new(MockProvider::working());
        let outcome = translator.translate("").await.unwrap();
        assert_eq!(outcome.translated, "");
        assert!(outcome.report.is_valid());
    }

    #[tokio::test]
    async fn test_translate_withEchoProvider_shouldRoundTrip() {
        let document = "\\documentclass{article}\n\\begin{document}\nText $a$ here.\n\\end{document}\n";
        let translator =
            DocumentTranslator::with_options(MockProvider::working(), fast_options());
        let outcome = translator.translate(document).await.unwrap();
        assert_eq!(outcome.translated, document);
        assert!(outcome.report.is_valid(), "report: {}", outcome.report);
    }

    #[tokio::test]
    async fn test_translate_withRejectingProvider_shouldCarryChunkIndex() {
        let translator =
            DocumentTranslator::with_options(MockProvider::rejecting(), fast_options());
        let err = translator.translate("plain text").await.unwrap_err();
        match err {
            TranslationError::ChunkFailed { chunk_index, source } => {
                assert_eq!(chunk_index, 0);
                assert!(!source.is_retryable());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_withTransientFailures_shouldRecoverThroughRetries() {
        // Two failures fit inside the default retry budget of 2
        let translator =
            DocumentTranslator::with_options(MockProvider::failing_first(2), fast_options());
        let outcome = translator.translate("hello world").await.unwrap();
        assert_eq!(outcome.translated, "hello world");
    }

    #[tokio::test]
    async fn test_transformWithRetry_withFailingProvider_shouldGiveUpAfterRetries() {
        let provider = MockProvider::failing();
        let translator = DocumentTranslator::with_options(provider.clone(), fast_options());
        let err = translator.translate("text").await.unwrap_err();
        assert!(matches!(err, TranslationError::ChunkFailed { .. }));
        // Initial attempt plus max_retries
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_translate_withProgressCallback_shouldReportEveryChunk() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_in_callback = Arc::clone(&seen);
        let options = TranslationOptions {
            max_chunk_size: 40,
            ..fast_options()
        };
        let translator = DocumentTranslator::with_options(MockProvider::working(), options)
            .with_progress_callback(Arc::new(move |done, total| {
                if let Ok(mut log) = seen_in_callback.lock() {
                    log.push((done, total));
                }
            }));

        let document = format!("{}\n\n{}\n\n{}", "a".repeat(30), "b".repeat(30), "c".repeat(30));
        translator.translate(&document).await.unwrap();

        let log = seen.lock().unwrap();
        assert!(!log.is_empty());
        let total = log[0].1;
        assert!(log.iter().all(|(_, t)| *t == total));
        assert!(log.iter().any(|(done, t)| done == t));
    }

    #[tokio::test]
    async fn test_translate_withSlowProviderAndTimeout_shouldFailAsNetworkError() {
        let options = TranslationOptions {
            request_timeout: Some(Duration::from_millis(5)),
            max_retries: 1,
            base_retry_delay: Duration::from_millis(1),
            ..TranslationOptions::default()
        };
        let provider = MockProvider::new(crate::providers::MockBehavior::Slow { delay_ms: 50 });
        let translator = DocumentTranslator::with_options(provider, options);
        let err = translator.translate("text").await.unwrap_err();
        match err {
            TranslationError::ChunkFailed { source, .. } => {
                assert!(matches!(source, ProviderError::Network(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
