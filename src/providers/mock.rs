/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Echoes every chunk back unchanged
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with a retryable error
 * - `MockProvider::rejecting()` - Always fails with a fatal error
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::TransformProvider;

static PLACEHOLDER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<<[A-Za-z]+_[A-Z]+_\d+>>>").expect("valid regex"));

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds, returning the chunk unchanged
    Working,
    /// Fails intermittently (every nth request) with a retryable error
    Intermittent { fail_every: usize },
    /// Fails the first n requests with a retryable error, then succeeds
    FailingFirst { failures: usize },
    /// Always fails with a retryable server error
    Failing,
    /// Always fails with a fatal client-request error
    Rejecting,
    /// Succeeds but strips every placeholder token from the output
    DroppingTokens,
    /// Returns an empty response
    Empty,
    /// Simulates a slow response (for timeout testing)
    Slow { delay_ms: u64 },
    /// Earlier requests respond more slowly, forcing out-of-order completion
    Staggered { step_ms: u64 },
}

/// Mock provider for testing pipeline behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared across clones
    request_count: Arc<AtomicUsize>,
    /// Custom transform applied on success (optional)
    custom_transform: Option<fn(&str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_transform: None,
        }
    }

    /// Create a working mock provider that echoes chunks unchanged
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that fails its first `failures` requests, then succeeds
    pub fn failing_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailingFirst { failures })
    }

    /// Create a failing mock provider with a retryable error
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock provider that always fails with a fatal error
    pub fn rejecting() -> Self {
        Self::new(MockBehavior::Rejecting)
    }

    /// Create a mock that strips placeholder tokens from its output
    pub fn dropping_tokens() -> Self {
        Self::new(MockBehavior::DroppingTokens)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom transform applied to successful responses
    pub fn with_transform(mut self, transform: fn(&str) -> String) -> Self {
        self.custom_transform = Some(transform);
        self
    }

    /// Number of requests served so far, across all clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn respond(&self, chunk: &str) -> String {
        match self.custom_transform {
            Some(transform) => transform(chunk),
            None => chunk.to_string(),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_transform: self.custom_transform,
        }
    }
}

#[async_trait]
impl TransformProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transform(&self, chunk: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.respond(chunk)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::Server(format!(
                        "simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(chunk))
                }
            }

            MockBehavior::FailingFirst { failures } => {
                if count < failures {
                    Err(ProviderError::Server(format!(
                        "simulated startup failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(self.respond(chunk))
                }
            }

            MockBehavior::Failing => Err(ProviderError::Server(
                "simulated provider failure".to_string(),
            )),

            MockBehavior::Rejecting => Err(ProviderError::ClientRequest(
                "simulated invalid request".to_string(),
            )),

            MockBehavior::DroppingTokens => {
                Ok(PLACEHOLDER_TOKEN.replace_all(&self.respond(chunk), "").into_owned())
            }

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.respond(chunk))
            }

            MockBehavior::Staggered { step_ms } => {
                let slots = 16usize.saturating_sub(count);
                tokio::time::sleep(tokio::time::Duration::from_millis(
                    step_ms * slots as u64,
                ))
                .await;
                Ok(self.respond(chunk))
            }
        }
    }
}
