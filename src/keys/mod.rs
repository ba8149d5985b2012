//! Cache key module - Scoped key and tag naming.
//!
//! Every cached value lives under a key scoped to either a user (subject)
//! or a study group, and every key has a matching tag for bulk invalidation.
//!
//! ## Usage
//!
//! ```rust
//! use scopecache::keys::{CacheKeyRegistry, GroupKind};
//!
//! let registry = CacheKeyRegistry::new();
//!
//! // Reading: key + tag for the cache-or-compute call
//! let key = registry.group_key(GroupKind::Contact, "org-7", &["contact-99"])?;
//! let tag = registry.group_tag(GroupKind::Contact, "org-7", &[])?;
//! assert_eq!(key.segments(), ["group", "org-7", "contact", "contact-99"]);
//!
//! // Writing: same tag to evict everything under it
//! assert_eq!(tag.as_str(), "group:org-7:contact");
//! # Ok::<(), scopecache::keys::InvalidScopeError>(())
//! ```

mod error;
mod kind;
mod registry;

pub use error::{InvalidScopeError, ScopeFamily, UnknownKindError};
pub use kind::{CacheKind, GroupKind, SubjectKind};
pub use registry::{
    CacheKeyRegistry, InvalidationTag, KeyPrefixes, StorageKey, GROUP_PREFIX, SUBJECT_PREFIX,
};
