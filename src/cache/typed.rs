//! Tagged cache wrapper around Moka.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use moka::future::Cache;
use moka::notification::RemovalCause;
use tracing::debug;

use super::CacheConfig;
use crate::keys::{InvalidationTag, StorageKey};

/// Which keys each tag covers, and the reverse.
#[derive(Debug, Default)]
struct TagIndex {
    by_tag: DashMap<InvalidationTag, HashSet<StorageKey>>,
    by_key: DashMap<StorageKey, HashSet<InvalidationTag>>,
}

impl TagIndex {
    fn register(&self, key: &StorageKey, tags: &[InvalidationTag]) {
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.by_key
            .entry(key.clone())
            .or_default()
            .extend(tags.iter().cloned());
    }

    /// Drop a key from every tag it was registered under.
    fn forget(&self, key: &StorageKey) {
        let Some((_, tags)) = self.by_key.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(mut keys) = self.by_tag.get_mut(&tag) {
                keys.remove(key);
            }
            self.by_tag.remove_if(&tag, |_, keys| keys.is_empty());
        }
    }

    /// Remove a tag and hand back the keys it covered.
    /// Callers must `forget` each returned key.
    fn take(&self, tag: &str) -> Vec<StorageKey> {
        self.by_tag
            .remove(tag)
            .map(|(_, keys)| keys.into_iter().collect())
            .unwrap_or_default()
    }

    fn tag_count(&self) -> usize {
        self.by_tag.len()
    }
}

/// A cache addressed by [`StorageKey`] whose entries can be dropped in bulk
/// by [`InvalidationTag`].
///
/// This cache is:
/// - Thread-safe and clone-friendly (clones share the same entries)
/// - Bounded, with every entry expiring after the configured revalidation window
/// - Single-flight: concurrent misses on one key run the computation once
#[derive(Clone)]
pub struct TaggedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<StorageKey, V>,
    index: Arc<TagIndex>,
    name: Arc<str>,
}

impl<V> TaggedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new tagged cache with the given name and config.
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let index = Arc::new(TagIndex::default());
        let listener_index = Arc::clone(&index);

        let mut builder = Cache::<StorageKey, V>::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.revalidate)
            .eviction_listener(move |key: Arc<StorageKey>, _value: V, cause: RemovalCause| {
                // Explicit removals clean the index themselves.
                if cause.was_evicted() {
                    listener_index.forget(&key);
                }
            });

        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: builder.build(),
            index,
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the cached value for `key`, computing it with `init` on a miss.
    ///
    /// The key is registered under every tag in `tags`. If `init` fails the
    /// error is returned and nothing is cached.
    pub async fn get_or_compute<F, E>(
        &self,
        key: StorageKey,
        tags: &[InvalidationTag],
        init: F,
    ) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let name = &self.name;
        let label = key.to_tag();
        let compute = async {
            debug!("Cache miss in {}: computing {}", name, label);
            init.await
        };

        let value = self.inner.try_get_with(key.clone(), compute).await?;
        self.index.register(&key, tags);
        Ok(value)
    }

    /// Get a value from the cache.
    pub async fn get(&self, key: &StorageKey) -> Option<V> {
        self.inner.get(key).await
    }

    /// Insert a value, replacing any existing one.
    pub async fn insert(&self, key: StorageKey, tags: &[InvalidationTag], value: V) {
        self.inner.insert(key.clone(), value).await;
        self.index.register(&key, tags);
    }

    /// Remove a single key from the cache.
    pub async fn invalidate(&self, key: &StorageKey) {
        self.index.forget(key);
        self.inner.invalidate(key).await;
    }

    /// Remove every entry registered under `tag`.
    ///
    /// Returns how many keys were covered by the tag.
    pub async fn revalidate_tag(&self, tag: &str) -> usize {
        let keys = self.index.take(tag);
        for key in &keys {
            // The entry is gone, so drop it from its other tags as well.
            self.index.forget(key);
            self.inner.invalidate(key).await;
        }
        if !keys.is_empty() {
            debug!("Revalidated {} key(s) in {} for tag {}", keys.len(), self.name, tag);
        }
        keys.len()
    }

    /// Get the number of entries in the cache.
    ///
    /// Note: This may not be perfectly accurate due to concurrent operations.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Number of tags currently indexed.
    pub fn tag_count(&self) -> usize {
        self.index.tag_count()
    }
}

impl<V> std::fmt::Debug for TaggedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedCache")
            .field("name", &self.name)
            .field("entry_count", &self.inner.entry_count())
            .field("tag_count", &self.index.tag_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::keys::{CacheKeyRegistry, GroupKind, SubjectKind};

    fn cache() -> TaggedCache<String> {
        TaggedCache::new("test", CacheConfig::with_capacity(100))
    }

    #[tokio::test]
    async fn test_get_or_compute_runs_once() {
        let cache = cache();
        let registry = CacheKeyRegistry::new();
        let key = registry.subject_key(SubjectKind::Favorites, "u1", &[]).unwrap();
        let tag = key.to_tag();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute(key.clone(), std::slice::from_ref(&tag), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>("favorites".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "favorites");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&key).await.as_deref(), Some("favorites"));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache();
        let key = CacheKeyRegistry::new()
            .subject_key(SubjectKind::Profile, "u1", &[])
            .unwrap();

        let err = cache
            .get_or_compute(key.clone(), &[], async { Err::<String, _>("db down") })
            .await
            .unwrap_err();
        assert_eq!(*err, "db down");
        assert!(cache.get(&key).await.is_none());

        let value = cache
            .get_or_compute(key.clone(), &[], async { Ok::<_, &str>("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_compute_once() {
        let cache = cache();
        let key = CacheKeyRegistry::new()
            .group_key(GroupKind::Members, "g1", &[])
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let key = key.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key, &[], async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, std::io::Error>("members".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "members");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revalidate_tag_clears_related_keys_only() {
        let cache = cache();
        let registry = CacheKeyRegistry::new();

        let all = registry.subject_key(SubjectKind::Favorites, "u1", &[]).unwrap();
        let one = registry
            .subject_key(SubjectKind::Favorites, "u1", &["doc-9"])
            .unwrap();
        let other = registry.subject_key(SubjectKind::Profile, "u1", &[]).unwrap();
        let favorites_tag = registry.subject_tag(SubjectKind::Favorites, "u1", &[]).unwrap();

        cache.insert(all.clone(), std::slice::from_ref(&favorites_tag), "all".into()).await;
        cache
            .insert(one.clone(), &[favorites_tag.clone(), one.to_tag()], "one".into())
            .await;
        cache.insert(other.clone(), &[other.to_tag()], "profile".into()).await;

        assert_eq!(cache.revalidate_tag(favorites_tag.as_str()).await, 2);
        assert!(cache.get(&all).await.is_none());
        assert!(cache.get(&one).await.is_none());
        assert_eq!(cache.get(&other).await.as_deref(), Some("profile"));

        // Second call finds nothing left under the tag.
        assert_eq!(cache.revalidate_tag(favorites_tag.as_str()).await, 0);
        // The per-item tag was cleaned up along with its key.
        assert_eq!(cache.revalidate_tag(one.to_tag().as_str()).await, 0);
        assert_eq!(cache.tag_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_single_key_cleans_index() {
        let cache = cache();
        let key = CacheKeyRegistry::new()
            .group_key(GroupKind::Invitations, "g1", &[])
            .unwrap();
        let tag = key.to_tag();

        cache.insert(key.clone(), std::slice::from_ref(&tag), "x".into()).await;
        assert_eq!(cache.tag_count(), 1);

        cache.invalidate(&key).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.tag_count(), 0);
    }

    fn short_lived() -> TaggedCache<String> {
        TaggedCache::new(
            "short",
            CacheConfig::with_capacity(100).revalidate(Duration::from_millis(50)),
        )
    }

    #[tokio::test]
    async fn test_expired_entries_leave_the_tag_index() {
        let cache = short_lived();
        let key = CacheKeyRegistry::new()
            .subject_key(SubjectKind::Sessions, "u1", &[])
            .unwrap();

        cache.insert(key.clone(), &[key.to_tag()], "session".into()).await;
        assert_eq!(cache.tag_count(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.inner.run_pending_tasks().await;

        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.tag_count(), 0);
    }

    #[tokio::test]
    async fn test_repopulated_key_is_still_revalidated() {
        let cache = short_lived();
        let key = CacheKeyRegistry::new()
            .group_key(GroupKind::Schedule, "g1", &[])
            .unwrap();
        let tag = key.to_tag();

        cache.insert(key.clone(), std::slice::from_ref(&tag), "old".into()).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.inner.run_pending_tasks().await;

        let value = cache
            .get_or_compute(key.clone(), std::slice::from_ref(&tag), async {
                Ok::<_, std::io::Error>("new".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "new");

        assert_eq!(cache.revalidate_tag(tag.as_str()).await, 1);
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.tag_count(), 0);
    }
}
