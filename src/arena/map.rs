//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaKey;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// The primary `K -> V` mapping for a key type. Other data keyed by the
/// same key should live in a [`SecondaryMap`](super::SecondaryMap).
///
/// This is a typed `Vec<V>` that can only be indexed with `K`. Values are
/// never removed, which keeps every key handed out valid for the lifetime
/// of the arena.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::ArenaMap;
/// arena_key! { struct Name; }
///
/// let mut names = ArenaMap::new();
/// let n: Name = names.insert("x");
///
/// assert_eq!(names[n], "x");
/// assert_eq!(names.next_key().index(), 1);
/// # use garnet::arena::ArenaKey;
/// ```
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct ArenaMap<K: ArenaKey, V> {
    slots: Vec<V>,
    #[cfg_attr(feature = "enable-serde", serde(skip))]
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> ArenaMap<K, V> {
    /// Creates a new, empty arena.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _unused: PhantomData,
        }
    }

    /// Checks if `key` has been handed out by this arena.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        key.index() < self.slots.len()
    }

    /// Gets the value for `key`, if the key exists.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.slots.get(key.index())
    }

    /// Gets the value for `key` mutably, if the key exists.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.slots.get_mut(key.index())
    }

    /// Adds a value into the arena and returns the key that refers to it.
    #[inline]
    pub fn insert(&mut self, value: V) -> K {
        self.slots.push(value);

        K::new(self.slots.len() - 1)
    }

    /// The key that the next call to [`Self::insert`] will return.
    #[inline]
    pub fn next_key(&self) -> K {
        K::new(self.slots.len())
    }

    /// The number of values that have been inserted.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been inserted yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every key in the arena, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = K> + DoubleEndedIterator + ExactSizeIterator {
        (0..self.slots.len()).map(K::new)
    }

    /// Every value in the arena, in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> + DoubleEndedIterator + ExactSizeIterator {
        self.slots.iter()
    }

    /// Every key/value pair in the arena, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + DoubleEndedIterator + ExactSizeIterator {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, v)| (K::new(i), v))
    }
}

impl<K: ArenaKey, V> Default for ArenaMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> FromIterator<V> for ArenaMap<K, V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
            _unused: PhantomData,
        }
    }
}

impl<K: ArenaKey, V: Debug> Debug for ArenaMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: ArenaKey, V> Index<K> for ArenaMap<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, key: K) -> &V {
        &self.slots[key.index()]
    }
}

impl<K: ArenaKey, V> IndexMut<K> for ArenaMap<K, V> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.slots[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_key;

    arena_key! { struct K; }

    #[test]
    fn insert_hands_out_sequential_keys() {
        let mut map = ArenaMap::new();
        let k1: K = map.insert('a');
        let k2 = map.insert('b');

        assert_eq!(k1.index(), 0);
        assert_eq!(k2.index(), 1);
        assert_eq!(map[k2], 'b');
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn next_key_matches_insert() {
        let mut map = ArenaMap::<K, i32>::new();
        let next = map.next_key();

        assert!(!map.contains(next));
        assert_eq!(map.insert(5), next);
        assert!(map.contains(next));
    }

    #[test]
    fn iteration_is_in_insertion_order() {
        let map: ArenaMap<K, i32> = [3, 1, 2].into_iter().collect();
        let values: Vec<_> = map.iter().map(|(k, v)| (k.index(), *v)).collect();

        assert_eq!(values, vec![(0, 3), (1, 1), (2, 2)]);
    }
}
