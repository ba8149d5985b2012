//! Key and tag derivation.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;
use tracing::trace;

use super::{CacheKind, GroupKind, InvalidScopeError, ScopeFamily, SubjectKind};

/// Default prefix for user-owned entries.
pub const SUBJECT_PREFIX: &str = "subject";

/// Default prefix for group-owned entries.
pub const GROUP_PREFIX: &str = "group";

/// Ordered path segments addressing one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorageKey(Vec<String>);

impl StorageKey {
    /// The key's segments in order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The tag covering this key: every segment joined with `:`.
    pub fn to_tag(&self) -> InvalidationTag {
        InvalidationTag(self.0.join(":"))
    }

    pub fn into_segments(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Handle used to evict every value sharing a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InvalidationTag(String);

impl InvalidationTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvalidationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InvalidationTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for InvalidationTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Leading segment for each scoping family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPrefixes {
    pub subject: String,
    pub group: String,
}

impl Default for KeyPrefixes {
    fn default() -> Self {
        Self {
            subject: SUBJECT_PREFIX.to_string(),
            group: GROUP_PREFIX.to_string(),
        }
    }
}

/// Derives storage keys and invalidation tags.
///
/// Keys have the shape `[prefix, scope_id, kind_token, ...extra]` with empty
/// segments dropped; a tag is the same list joined with `:`. Derivation is
/// pure, so the registry can be shared freely across requests.
///
/// ## Example
///
/// ```rust
/// use scopecache::keys::{CacheKeyRegistry, SubjectKind};
///
/// let registry = CacheKeyRegistry::new();
/// let key = registry.subject_key(SubjectKind::Favorites, "user-42", &[]).unwrap();
/// assert_eq!(key.segments(), ["subject", "user-42", "favorites"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CacheKeyRegistry {
    prefixes: KeyPrefixes,
}

impl CacheKeyRegistry {
    /// Registry using the default `subject` / `group` prefixes.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefixes(prefixes: KeyPrefixes) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &KeyPrefixes {
        &self.prefixes
    }

    /// Storage key for data owned by one user.
    pub fn subject_key(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        extra: &[&str],
    ) -> Result<StorageKey, InvalidScopeError> {
        derive(&self.prefixes.subject, ScopeFamily::Subject, kind, subject_id, extra)
    }

    /// Tag for data owned by one user.
    pub fn subject_tag(
        &self,
        kind: SubjectKind,
        subject_id: &str,
        extra: &[&str],
    ) -> Result<InvalidationTag, InvalidScopeError> {
        Ok(self.subject_key(kind, subject_id, extra)?.to_tag())
    }

    /// Storage key for data owned by a group.
    pub fn group_key(
        &self,
        kind: GroupKind,
        group_id: &str,
        extra: &[&str],
    ) -> Result<StorageKey, InvalidScopeError> {
        derive(&self.prefixes.group, ScopeFamily::Group, kind, group_id, extra)
    }

    /// Tag for data owned by a group.
    pub fn group_tag(
        &self,
        kind: GroupKind,
        group_id: &str,
        extra: &[&str],
    ) -> Result<InvalidationTag, InvalidScopeError> {
        Ok(self.group_key(kind, group_id, extra)?.to_tag())
    }

    /// Group-family key scoped by the acting user instead of a group.
    ///
    /// Only lead caching uses this: leads moved to per-user storage when the
    /// product dropped multi-tenant groups, but their keys kept the group
    /// prefix. Do not use it for new kinds.
    pub fn group_key_scoped_to_acting_user(
        &self,
        kind: GroupKind,
        user_id: &str,
        extra: &[&str],
    ) -> Result<StorageKey, InvalidScopeError> {
        derive(&self.prefixes.group, ScopeFamily::ActingUser, kind, user_id, extra)
    }

    /// Tag matching [`Self::group_key_scoped_to_acting_user`].
    pub fn group_tag_scoped_to_acting_user(
        &self,
        kind: GroupKind,
        user_id: &str,
        extra: &[&str],
    ) -> Result<InvalidationTag, InvalidScopeError> {
        Ok(self
            .group_key_scoped_to_acting_user(kind, user_id, extra)?
            .to_tag())
    }
}

fn derive<K: CacheKind>(
    prefix: &str,
    scope: ScopeFamily,
    kind: K,
    scope_id: &str,
    extra: &[&str],
) -> Result<StorageKey, InvalidScopeError> {
    if scope_id.is_empty() {
        return Err(InvalidScopeError { scope });
    }

    let segments: Vec<String> = [prefix, scope_id, kind.token()]
        .into_iter()
        .chain(extra.iter().copied())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    trace!("Derived {} key {:?}", K::FAMILY, segments);
    Ok(StorageKey(segments))
}
