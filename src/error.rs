//! Error taxonomy
//!
//! `ConfigError` is the sticky error latched onto a [`crate::Config`] instance.
//! It is intentionally small: parsing never panics and never returns a
//! detailed diagnostic for malformed input (a malformed line is simply
//! dropped), so the only things worth reporting to the host are the
//! sentinel placeholder state and the two resource-exhaustion conditions.

use thiserror::Error;

/// Sticky error state latched onto a [`crate::Config`] instance.
///
/// `Overflow` and `Memory` are cleared by [`crate::Config::repair`]; `Invalid`
/// marks the distinguished placeholder instance and is never cleared.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The instance is the placeholder sentinel; every operation is a no-op.
    #[error("configuration instance is the placeholder sentinel")]
    Invalid,
    /// An internal counter (group count, word count, recursion depth) would
    /// exceed its maximum.
    #[error("an internal counter would exceed its maximum")]
    Overflow,
    /// An allocation budget was exhausted.
    #[error("allocation budget exhausted")]
    Memory,
}
