//! Cache module - Tagged caching on top of Moka.
//!
//! This is the cache-or-compute / invalidate-by-tag layer that consumes the
//! keys and tags produced by [`crate::keys`].
//!
//! ## Architecture
//!
//! - `CacheStore` - Central store holding all named caches
//! - `TaggedCache` - Typed cache addressed by `StorageKey`, with a tag index
//! - `CacheConfig` - Capacity and revalidation window per cache
//!
//! ## Usage
//!
//! ```rust
//! # async fn load(store: &scopecache::cache::CacheStore) -> anyhow::Result<()> {
//! use scopecache::keys::{CacheKeyRegistry, SubjectKind};
//!
//! let registry = CacheKeyRegistry::new();
//! let favorites = store.cache::<Vec<String>>("favorites")?;
//!
//! // Read path
//! let key = registry.subject_key(SubjectKind::Favorites, "user-42", &[])?;
//! let tag = registry.subject_tag(SubjectKind::Favorites, "user-42", &[])?;
//! let docs = favorites
//!     .get_or_compute(key, &[tag.clone()], async { Ok::<_, std::io::Error>(vec![]) })
//!     .await
//!     .map_err(|e| anyhow::anyhow!("{e}"))?;
//!
//! // Write path
//! store.revalidate_tag(tag.as_str()).await;
//! # let _ = docs;
//! # Ok(())
//! # }
//! ```

mod config;
mod registry;
mod typed;

pub use config::{CacheConfig, DEV_REVALIDATE, PROD_REVALIDATE};
pub use registry::{CacheError, CacheStore};
pub use typed::TaggedCache;
