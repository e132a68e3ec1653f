use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

/// A bounded concurrent cache evicting a random entry when full
#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    // IndexMap makes removing a random element cheap
    map: Arc<RwLock<IndexMap<TKey, TData, S>>>,
    size: usize,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(size: u64) -> Self {
        // `size + 1` avoids a realloc when a new element exactly overflows capacity
        Self { map: Arc::new(RwLock::new(IndexMap::with_capacity_and_hasher(size as usize + 1, S::default()))), size: size as usize }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.map.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &TKey) -> bool {
        self.map.read().contains_key(key)
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if self.size == 0 {
            return;
        }
        let mut write_guard = self.map.write();
        if write_guard.len() == self.size && !write_guard.contains_key(&key) {
            let index = rand::thread_rng().gen_range(0..self.size);
            write_guard.swap_remove_index(index);
        }
        write_guard.insert(key, data);
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_is_bounded() {
        let cache = Cache::<u32, u32>::new(4);
        (0..100).for_each(|i| cache.insert(i, i * 2));
        assert_eq!(cache.len(), 4);
        assert!(cache.contains_key(&99));
        assert_eq!(cache.get(&99), Some(198));

        // Overwriting an existing key evicts nothing
        cache.insert(99, 0);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&99), Some(0));
    }

    #[test]
    fn test_zero_sized_cache_stores_nothing() {
        let cache = Cache::<u32, u32>::new(0);
        cache.insert(1, 1);
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }
}
