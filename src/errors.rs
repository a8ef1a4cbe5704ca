/*!
 * Error types for the latrans library.
 *
 * This module contains custom error types for the different parts of the
 * translation pipeline, using the thiserror crate for ergonomic error
 * definitions.
 */

use thiserror::Error;

/// Errors that can occur when calling an external transform provider.
///
/// The classification drives retry behavior: network, rate-limit and
/// server failures are transient; client-request and internal failures
/// abort the chunk immediately.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Connection or transport failure, including per-call timeouts
    #[error("network error: {0}")]
    Network(String),

    /// The provider rejected the call due to rate limiting
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// The request itself was malformed or unauthorized
    #[error("client request error: {0}")]
    ClientRequest(String),

    /// The provider failed on its side
    #[error("server error: {0}")]
    Server(String),

    /// A failure inside the provider implementation
    #[error("internal provider error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Whether a retry with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::RateLimit(_) | ProviderError::Server(_)
        )
    }
}

/// Errors that can occur while translating a document
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A chunk exhausted its retries or hit a non-retryable provider error
    #[error("chunk {chunk_index} failed: {source}")]
    ChunkFailed {
        /// Zero-based index of the failing chunk
        chunk_index: usize,
        /// The provider error that ended the chunk
        #[source]
        source: ProviderError,
    },

    /// Error from the provider outside any specific chunk
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The translated document failed structural validation
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

impl TranslationError {
    /// Attach a chunk index to a provider error.
    pub fn for_chunk(chunk_index: usize, source: ProviderError) -> Self {
        Self::ChunkFailed {
            chunk_index,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providerError_withTransientVariants_shouldBeRetryable() {
        assert!(ProviderError::Network("connection reset".to_string()).is_retryable());
        assert!(ProviderError::RateLimit("429".to_string()).is_retryable());
        assert!(ProviderError::Server("502 bad gateway".to_string()).is_retryable());
    }

    #[test]
    fn test_providerError_withFatalVariants_shouldNotBeRetryable() {
        assert!(!ProviderError::ClientRequest("invalid key".to_string()).is_retryable());
        assert!(!ProviderError::Internal("poisoned state".to_string()).is_retryable());
    }

    #[test]
    fn test_translationError_forChunk_shouldCarryChunkIndex() {
        let err = TranslationError::for_chunk(4, ProviderError::ClientRequest("401".to_string()));
        assert!(err.to_string().contains("chunk 4"));
    }
}
