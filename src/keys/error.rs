//! Key derivation errors.

use std::fmt;

use thiserror::Error;

/// Which scoping identifier was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeFamily {
    Subject,
    Group,
    /// The legacy group family keyed by the acting user.
    ActingUser,
}

impl fmt::Display for ScopeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Subject => "Subject",
            Self::Group => "Group",
            Self::ActingUser => "Acting user",
        })
    }
}

/// An empty scope id was passed to the registry.
///
/// This always points at a bug upstream (usually a missing session), so
/// callers should fail the whole request instead of retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{scope} ID cannot be empty")]
pub struct InvalidScopeError {
    pub scope: ScopeFamily,
}

/// A token did not name any kind of the requested family.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {family} cache kind: {token}")]
pub struct UnknownKindError {
    pub family: &'static str,
    pub token: String,
}
