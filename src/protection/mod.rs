/*!
 * Placeholder-based protection of LaTeX structures.
 *
 * The engine converts domain-specific span finders into a reversible
 * substitution: structural regions are spliced out and replaced by opaque
 * numbered tokens, and the placeholder table maps every token back to the
 * exact original text.
 */

pub mod domains;
pub mod engine;

pub use engine::{
    PlaceholderEntry, PlaceholderTable, ProtectionCategory, ProtectionConfig, ProtectionEngine,
    TokenFormat,
};
