use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};
use ustr::{Ustr, UstrMap};

pub trait IndexMapKey {
    fn get(&self) -> usize;
}

/// A Vec that can also be looked up by name. Iteration is always in insertion order.
pub struct UstrIndexMap<T, K: IndexMapKey> {
    storage: Vec<T>,
    keys: Vec<Ustr>,
    map: UstrMap<usize>,
    phantom: PhantomData<K>,
}

impl<T, K> Default for UstrIndexMap<T, K>
where
    K: IndexMapKey,
{
    fn default() -> Self {
        UstrIndexMap::<T, K>::new()
    }
}

impl<T: std::fmt::Debug, K: IndexMapKey> std::fmt::Debug for UstrIndexMap<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter_with_keys()).finish()
    }
}

impl<T, K> UstrIndexMap<T, K>
where
    K: IndexMapKey,
{
    pub fn new() -> UstrIndexMap<T, K> {
        UstrIndexMap {
            storage: Vec::new(),
            keys: Vec::new(),
            map: Default::default(),
            phantom: PhantomData,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.storage.iter()
    }

    pub fn iter_with_keys(&self) -> impl Iterator<Item = (&Ustr, &T)> {
        self.keys.iter().zip(self.storage.iter())
    }

    pub fn get(&self, key: &Ustr) -> Option<&T> {
        self.map.get(key).map(|id| &self.storage[*id])
    }

    pub fn get_mut(&mut self, key: &Ustr) -> Option<&mut T> {
        self.map.get(key).map(|id| &mut self.storage[*id])
    }

    pub fn get_id(&self, key: &Ustr) -> Option<&usize> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &Ustr) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push `value`. If `key` is already present the new value shadows the old one for lookups, but both stay in
    /// the storage.
    pub fn insert(&mut self, key: Ustr, value: T) -> usize {
        let id = self.storage.len();
        self.storage.push(value);
        self.keys.push(key);
        self.map.insert(key, id);
        id
    }

    /// Get the value for `key`, inserting the result of `f` at the end if it does not exist yet
    pub fn get_or_insert_with<F: FnOnce() -> T>(&mut self, key: Ustr, f: F) -> &mut T {
        let id = match self.map.get(&key) {
            Some(id) => *id,
            None => self.insert(key, f()),
        };
        &mut self.storage[id]
    }
}

impl<T, K> Index<K> for UstrIndexMap<T, K>
where
    K: IndexMapKey,
{
    type Output = T;

    fn index(&self, index: K) -> &Self::Output {
        &self.storage[index.get()]
    }
}

impl<T, K> IndexMut<K> for UstrIndexMap<T, K>
where
    K: IndexMapKey,
{
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.storage[index.get()]
    }
}
