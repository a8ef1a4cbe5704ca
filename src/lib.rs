/*!
 * # latrans - Structure-Preserving LaTeX Translation Engine
 *
 * A Rust library for machine translation of LaTeX documents that guarantees
 * structural elements survive an external, structure-unaware transformation
 * such as an LLM call.
 *
 * ## Features
 *
 * - Identify structural spans (commands, environments, math, tables, comments)
 * - Protect structures behind reversible placeholder tokens
 * - Split protected text into size-bounded chunks at safe boundaries
 * - Transform chunks concurrently with bounded parallelism and retries
 * - Validate environment balance, brace balance, and translation quality
 * - Repair structural drift by comparing against the original document
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `scanner`: Structural span detection and nesting analysis
 * - `protection`: Placeholder substitution engine and domain finders:
 *   - `protection::engine`: Protect/restore core with overlap resolution
 *   - `protection::domains`: Math, table, command, author/title finders
 * - `splitter`: Boundary-respecting chunk splitting
 * - `validation`: Structural validators:
 *   - `validation::environment`: Environment begin/end balance and nesting
 *   - `validation::braces`: Comment- and escape-aware brace balance
 *   - `validation::quality`: Translation quality heuristics
 *   - `validation::service`: Validation orchestration and reporting
 * - `repair`: Reference-based structural repairs
 * - `pipeline`: End-to-end document translation with bounded concurrency
 * - `providers`: External transform trait and mock implementations
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod errors;
pub mod pipeline;
pub mod protection;
pub mod providers;
pub mod repair;
pub mod scanner;
pub mod splitter;
pub mod validation;

// Re-export main types for easier usage
pub use errors::{ProviderError, TranslationError};
pub use pipeline::{DocumentTranslator, TranslationOptions, TranslationOutcome};
pub use protection::{PlaceholderTable, ProtectionEngine, TokenFormat};
pub use providers::TransformProvider;
pub use repair::ReferenceRepairer;
pub use scanner::{Span, SpanKind, SpanScanner};
pub use splitter::ChunkSplitter;
pub use validation::{StructuralValidator, ValidationReport};
