//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, ArenaMap};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::{iter, mem};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A sparse mapping from keys of some primary [`ArenaMap`] to extra data.
///
/// Unlike the primary map, entries can be removed. The map grows to fit
/// whatever the highest key inserted is, so it's cheapest when the keys
/// come from a single dense arena.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::*;
/// arena_key! { struct Player; }
///
/// let mut players = ArenaMap::new();
/// let mut health = SecondaryMap::new();
/// let p: Player = players.insert("John");
///
/// health.insert(p, 100);
/// assert_eq!(health[p], 100);
/// assert_eq!(health.remove(p), Some(100));
/// assert!(!health.contains(p));
/// ```
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct SecondaryMap<K: ArenaKey, V> {
    slots: Vec<Option<V>>,
    len: usize,
    #[cfg_attr(feature = "enable-serde", serde(skip))]
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> SecondaryMap<K, V> {
    /// Creates an empty map.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            _unused: PhantomData,
        }
    }

    /// Creates an empty map with room for every key of `primary`.
    pub fn with_primary<T>(primary: &ArenaMap<K, T>) -> Self {
        Self {
            slots: iter::repeat_with(|| None).take(primary.len()).collect(),
            len: 0,
            _unused: PhantomData,
        }
    }

    /// Maps every key of `primary` through `f`.
    pub fn map_all_keys<T, F>(primary: &ArenaMap<K, T>, mut f: F) -> Self
    where
        F: FnMut(&ArenaMap<K, T>, K) -> V,
    {
        Self {
            slots: primary.keys().map(|key| Some(f(primary, key))).collect(),
            len: primary.len(),
            _unused: PhantomData,
        }
    }

    /// Whether `key` currently has a value.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        matches!(self.slots.get(key.index()), Some(Some(_)))
    }

    /// Maps `key -> value`, returning the previous value if there was one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let idx = key.index();

        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }

        let old = self.slots[idx].replace(value);

        if old.is_none() {
            self.len += 1;
        }

        old
    }

    /// Gets the value mapped to `key`.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.index()).and_then(Option::as_ref)
    }

    /// Gets the value mapped to `key` mutably.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key.index()).and_then(Option::as_mut)
    }

    /// Gets the value mapped to `key`, inserting `V::default()` first if
    /// there isn't one yet.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        if !self.contains(key) {
            self.insert(key, V::default());
        }

        self.slots[key.index()]
            .as_mut()
            .expect("value was just inserted")
    }

    /// Removes the value mapped to `key` and returns it.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let old = self.slots.get_mut(key.index()).and_then(mem::take);

        if old.is_some() {
            self.len -= 1;
        }

        old
    }

    /// The number of keys with a value.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no key has a value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every value, keeping the allocation around.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
    }

    /// Every key with a value, in increasing order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Every value, in increasing key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Every key/value pair, in increasing key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (K::new(i), v)))
    }

    /// Every key/value pair with mutable values, in increasing key order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (K::new(i), v)))
    }
}

impl<K: ArenaKey, V> Default for SecondaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V: Debug> Debug for SecondaryMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: ArenaKey, V> Index<K> for SecondaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("no value for key {key:?} in secondary map"),
        }
    }
}

impl<K: ArenaKey, V> IndexMut<K> for SecondaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        match self.slots.get_mut(key.index()) {
            Some(Some(v)) => v,
            _ => panic!("no value for key {key:?} in secondary map"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct E; }

    #[test]
    fn sparse_inserts_grow_the_map() {
        let mut map = SecondaryMap::new();

        map.insert(E::new(7), "late");

        assert_eq!(map.len(), 1);
        assert!(!map.contains(E::new(3)));
        assert_eq!(map.get(E::new(7)), Some(&"late"));
    }

    #[test]
    fn reinserting_replaces_without_changing_len() {
        let mut map = SecondaryMap::new();

        assert_eq!(map.insert(E::new(0), 1), None);
        assert_eq!(map.insert(E::new(0), 2), Some(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_then_iterate() {
        let mut map = SecondaryMap::new();

        for i in 0..4 {
            map.insert(E::new(i), i * 10);
        }

        map.remove(E::new(1));

        let keys: Vec<_> = map.keys().map(|k| k.index()).collect();

        assert_eq!(keys, vec![0, 2, 3]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn get_or_default_inserts_once() {
        let mut map = SecondaryMap::<E, Vec<i32>>::new();

        map.get_or_default(E::new(2)).push(1);
        map.get_or_default(E::new(2)).push(2);

        assert_eq!(map[E::new(2)], vec![1, 2]);
    }

    #[test]
    #[should_panic(expected = "no value for key")]
    fn indexing_missing_key_panics() {
        std::panic::set_hook(Box::new(|_| {}));

        let map = SecondaryMap::<E, i32>::new();

        let _ = map[E::new(0)];
    }
}
