/*!
 * Structural and quality validation of transformed documents.
 *
 * Three independent validators (environment balance, brace balance, quality
 * heuristics) feed an orchestrating service that produces a single report
 * of hard errors and soft warnings.
 */

pub mod braces;
pub mod environment;
pub mod quality;
pub mod service;

pub use braces::{BraceSite, BraceValidation};
pub use environment::{EnvMismatch, EnvironmentValidation, NestingError};
pub use quality::{QualityCheck, QualityConfig};
pub use service::{IssueSeverity, StructuralValidator, ValidationIssue, ValidationReport};
