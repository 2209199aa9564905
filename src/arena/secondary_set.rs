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
use smallbitvec::{sbvec, SmallBitVec};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A dense set of keys from some primary map, stored as one bit per key.
///
/// This is theoretically equivalent to a [`SecondaryMap<K, ()>`](crate::arena::SecondaryMap)
/// but is much leaner, and set-wise operations like [`Self::union_with`] work
/// directly on the bits.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::*;
/// arena_key! { struct Key; }
/// let mut map = ArenaMap::default();
/// let k1: Key = map.insert(15);
/// let k2 = map.insert(20);
/// let evens = SecondarySet::map_keys(&map, |m, k| m[k] % 2 == 0);
///
/// assert!(!evens.contains(k1));
/// assert!(evens.contains(k2));
/// ```
#[derive(Clone)]
pub struct SecondarySet<K: ArenaKey> {
    bits: SmallBitVec,
    cardinality: usize,
    _unused: PhantomData<fn() -> K>,
}

impl<K: ArenaKey> SecondarySet<K> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            bits: SmallBitVec::new(),
            cardinality: 0,
            _unused: PhantomData,
        }
    }

    /// Creates an empty set with room for every key of `primary`.
    pub fn with_primary<T>(primary: &ArenaMap<K, T>) -> Self {
        Self {
            bits: sbvec![false; primary.len()],
            cardinality: 0,
            _unused: PhantomData,
        }
    }

    /// Builds the set `{ k | f(k) }` over the keys of `primary`.
    pub fn map_keys<T, F>(primary: &ArenaMap<K, T>, mut f: F) -> Self
    where
        F: FnMut(&ArenaMap<K, T>, K) -> bool,
    {
        let mut bits = SmallBitVec::with_capacity(primary.len());
        let mut cardinality = 0;

        for key in primary.keys() {
            let present = f(primary, key);

            cardinality += present as usize;
            bits.push(present);
        }

        Self {
            bits,
            cardinality,
            _unused: PhantomData,
        }
    }

    /// The number of keys in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.cardinality
    }

    /// Whether the set has no keys at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Whether `key` is in the set.
    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.bits.get(key.index()).unwrap_or(false)
    }

    /// Inserts `key`, returning whether it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        let idx = key.index();

        if idx >= self.bits.len() {
            self.bits.resize(idx + 1, false);
        }

        let old = self.bits[idx];

        self.cardinality += !old as usize;
        self.bits.set(idx, true);

        old
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: K) -> bool {
        let idx = key.index();

        match self.bits.get(idx) {
            Some(true) => {
                self.bits.set(idx, false);
                self.cardinality -= 1;

                true
            }
            _ => false,
        }
    }

    /// Removes every key without freeing the buffer.
    pub fn clear(&mut self) {
        for i in 0..self.bits.len() {
            self.bits.set(i, false);
        }

        self.cardinality = 0;
    }

    /// Adds every key of `other` into `self`. Returns whether `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let mut changed = false;

        for key in other.keys() {
            changed |= !self.insert(key);
        }

        changed
    }

    /// Every key in the set, in increasing order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(i, _)| K::new(i))
    }
}

impl<K: ArenaKey> Default for SecondarySet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey> FromIterator<K> for SecondarySet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();

        for key in iter {
            set.insert(key);
        }

        set
    }
}

impl<K: ArenaKey> Debug for SecondarySet<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

// two sets with different trailing zero bits are still the same set, so
// equality and hashing have to look at the keys rather than the raw bits
impl<K: ArenaKey> PartialEq for SecondarySet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cardinality == other.cardinality && self.keys().eq(other.keys())
    }
}

impl<K: ArenaKey> Eq for SecondarySet<K> {}

impl<K: ArenaKey> Hash for SecondarySet<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for key in self.keys() {
            state.write_usize(key.index());
        }
    }
}

#[cfg(feature = "enable-serde")]
impl<K: ArenaKey> Serialize for SecondarySet<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys: Vec<usize> = self.keys().map(|k| k.index()).collect();

        keys.serialize(serializer)
    }
}

#[cfg(feature = "enable-serde")]
impl<'de, K: ArenaKey> Deserialize<'de> for SecondarySet<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<usize>::deserialize(deserializer)?;

        Ok(keys.into_iter().map(K::new).collect())
    }
}
