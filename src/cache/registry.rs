//! Cache store - Central management for all tagged caches.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use super::{CacheConfig, TaggedCache};

/// Errors raised by the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Cache '{name}' already exists with value type {existing}, requested {requested}")]
    TypeMismatch {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },
}

/// Object-safe view of a `TaggedCache<V>` for any `V`.
trait ErasedCache: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn revalidate_boxed<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, usize>;
}

impl<V> ErasedCache for TaggedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn revalidate_boxed<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, usize> {
        Box::pin(self.revalidate_tag(tag))
    }
}

/// Internal cache entry storing type-erased cache.
struct CacheEntry {
    cache: Arc<dyn ErasedCache>,
    type_name: &'static str,
}

/// Central store for every tagged cache in the process.
///
/// Data loaders create or look up a cache by name for their value type;
/// mutations call [`CacheStore::revalidate_tag`] once and every cache that
/// indexed the tag drops the matching entries.
///
/// ## Example
///
/// ```rust
/// use scopecache::cache::{CacheConfig, CacheStore, TaggedCache};
///
/// let store = CacheStore::new(CacheConfig::default());
/// let favorites: TaggedCache<Vec<String>> = store.cache("favorites").unwrap();
/// assert_eq!(favorites.name(), "favorites");
/// ```
#[derive(Clone)]
pub struct CacheStore {
    caches: Arc<RwLock<HashMap<String, CacheEntry>>>,
    default_config: CacheConfig,
}

impl CacheStore {
    /// Create a new empty store. `default_config` is used by [`Self::cache`].
    pub fn new(default_config: CacheConfig) -> Self {
        info!(
            "Cache store initialized (revalidate {:?}, capacity {})",
            default_config.revalidate, default_config.max_capacity
        );
        Self {
            caches: Arc::new(RwLock::new(HashMap::new())),
            default_config,
        }
    }

    pub fn default_config(&self) -> &CacheConfig {
        &self.default_config
    }

    /// Create a new tagged cache and register it.
    ///
    /// Returns the existing cache if one is already registered under `name`
    /// with the same value type.
    pub fn create<V>(&self, name: &str, config: CacheConfig) -> Result<TaggedCache<V>, CacheError>
    where
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.write();

        if let Some(existing) = caches.get(name) {
            return downcast(name, existing);
        }

        debug!("Creating cache: {}", name);

        let cache = TaggedCache::<V>::new(name, config);
        caches.insert(
            name.to_string(),
            CacheEntry {
                cache: Arc::new(cache.clone()),
                type_name: std::any::type_name::<V>(),
            },
        );

        Ok(cache)
    }

    /// Get an existing cache by name.
    ///
    /// Returns `Ok(None)` if the cache doesn't exist.
    pub fn get<V>(&self, name: &str) -> Result<Option<TaggedCache<V>>, CacheError>
    where
        V: Clone + Send + Sync + 'static,
    {
        let caches = self.caches.read();
        caches.get(name).map(|entry| downcast(name, entry)).transpose()
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    pub fn get_or_create<V>(
        &self,
        name: &str,
        config: CacheConfig,
    ) -> Result<TaggedCache<V>, CacheError>
    where
        V: Clone + Send + Sync + 'static,
    {
        if let Some(cache) = self.get(name)? {
            return Ok(cache);
        }
        self.create(name, config)
    }

    /// Get or create a cache using the store's default config.
    ///
    /// This is the recommended way to access caches in data loaders.
    pub fn cache<V>(&self, name: &str) -> Result<TaggedCache<V>, CacheError>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.get_or_create(name, self.default_config.clone())
    }

    /// Drop every entry indexed under `tag` in every registered cache.
    ///
    /// Returns the total number of keys invalidated.
    pub async fn revalidate_tag(&self, tag: &str) -> usize {
        // Snapshot first: the lock must not be held across awaits.
        let caches: Vec<Arc<dyn ErasedCache>> = self
            .caches
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.cache))
            .collect();

        let mut total = 0;
        for cache in caches {
            total += cache.revalidate_boxed(tag).await;
        }

        debug!("Tag {} revalidated {} key(s)", tag, total);
        total
    }

    /// Check if a cache with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Remove a cache from the store.
    ///
    /// Returns `true` if the cache was removed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.caches.write().remove(name).is_some();
        if removed {
            debug!("Removed cache: {}", name);
        }
        removed
    }

    /// Get the number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.caches.read().is_empty()
    }

    /// Get a list of all registered cache names.
    pub fn cache_names(&self) -> Vec<String> {
        self.caches.read().keys().cloned().collect()
    }
}

fn downcast<V>(name: &str, entry: &CacheEntry) -> Result<TaggedCache<V>, CacheError>
where
    V: Clone + Send + Sync + 'static,
{
    entry
        .cache
        .as_any()
        .downcast_ref::<TaggedCache<V>>()
        .cloned()
        .ok_or_else(|| CacheError::TypeMismatch {
            name: name.to_string(),
            existing: entry.type_name,
            requested: std::any::type_name::<V>(),
        })
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheStore")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{CacheKeyRegistry, GroupKind, SubjectKind};

    #[test]
    fn test_get_or_create_returns_shared_cache() {
        let store = CacheStore::default();
        assert!(store.is_empty());

        let first: TaggedCache<u64> = store.cache("page_visits").unwrap();
        let second: TaggedCache<u64> = store.cache("page_visits").unwrap();

        assert_eq!(first.name(), second.name());
        assert_eq!(store.len(), 1);
        assert!(store.contains("page_visits"));
        assert_eq!(store.cache_names(), vec!["page_visits".to_string()]);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let store = CacheStore::default();
        let _: TaggedCache<u64> = store.cache("members").unwrap();

        let err = store.cache::<String>("members").unwrap_err();
        assert!(matches!(err, CacheError::TypeMismatch { ref name, .. } if name == "members"));
        assert!(store.get::<String>("members").is_err());
    }

    #[test]
    fn test_get_missing_and_remove() {
        let store = CacheStore::default();
        assert!(store.get::<u64>("nope").unwrap().is_none());

        let _: TaggedCache<u64> = store.cache("schedule").unwrap();
        assert!(store.remove("schedule"));
        assert!(!store.remove("schedule"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_revalidate_tag_fans_out_across_caches() {
        let store = CacheStore::default();
        let registry = CacheKeyRegistry::new();

        let members: TaggedCache<Vec<String>> = store.cache("members").unwrap();
        let counts: TaggedCache<u64> = store.cache("member_counts").unwrap();
        let profiles: TaggedCache<String> = store.cache("profiles").unwrap();

        let group_tag = registry.group_tag(GroupKind::Members, "g1", &[]).unwrap();
        let members_key = registry.group_key(GroupKind::Members, "g1", &[]).unwrap();
        let count_key = registry
            .group_key(GroupKind::Members, "g1", &["count"])
            .unwrap();
        let profile_key = registry.subject_key(SubjectKind::Profile, "u1", &[]).unwrap();

        members
            .insert(members_key.clone(), std::slice::from_ref(&group_tag), vec!["u1".into()])
            .await;
        counts
            .insert(count_key.clone(), std::slice::from_ref(&group_tag), 1)
            .await;
        profiles
            .insert(profile_key.clone(), &[profile_key.to_tag()], "Ada".into())
            .await;

        assert_eq!(store.revalidate_tag(group_tag.as_str()).await, 2);
        assert!(members.get(&members_key).await.is_none());
        assert!(counts.get(&count_key).await.is_none());
        assert_eq!(profiles.get(&profile_key).await.as_deref(), Some("Ada"));
    }
}
