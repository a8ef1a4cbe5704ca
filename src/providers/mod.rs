/*!
 * External transform providers.
 *
 * The pipeline is provider-agnostic: anything that can turn one chunk of
 * text into another behind an async call implements `TransformProvider`.
 * The mock implementation drives the test suite.
 */

pub mod mock;

use async_trait::async_trait;

use crate::errors::ProviderError;

pub use mock::{MockBehavior, MockProvider};

/// An external, structure-unaware text transformation
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Transform one chunk of text.
    ///
    /// The chunk may contain placeholder tokens; a well-behaved provider
    /// copies them through unchanged, and the pipeline recovers any it
    /// drops anyway.
    async fn transform(&self, chunk: &str) -> Result<String, ProviderError>;
}
