//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, SecondaryMap};

/// A disjoint-set forest over arena keys.
///
/// Keys that were never touched are their own singleton set. The
/// representative of a set is always its smallest key, which keeps every
/// decision built on top of this deterministic.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::ArenaKey;
/// # use garnet::utility::UnionFind;
/// arena_key! { struct Temp; }
///
/// let mut sets = UnionFind::new();
/// let (a, b, c) = (Temp::new(0), Temp::new(1), Temp::new(2));
///
/// sets.union(c, b);
/// sets.union(b, a);
///
/// assert_eq!(sets.find(c), a);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnionFind<K: ArenaKey> {
    parents: SecondaryMap<K, K>,
}

impl<K: ArenaKey> UnionFind<K> {
    pub fn new() -> Self {
        Self {
            parents: SecondaryMap::new(),
        }
    }

    /// Finds the representative of `key`'s set, compressing the path.
    pub fn find(&mut self, key: K) -> K {
        let root = self.find_immutable(key);
        let mut current = key;

        while current != root {
            let next = self.parents[current];

            self.parents.insert(current, root);
            current = next;
        }

        root
    }

    /// Finds the representative without compressing anything.
    pub fn find_immutable(&self, key: K) -> K {
        let mut current = key;

        while let Some(&parent) = self.parents.get(current) {
            if parent == current {
                break;
            }

            current = parent;
        }

        current
    }

    /// Merges the sets of `a` and `b`, returning the new representative.
    pub fn union(&mut self, a: K, b: K) -> K {
        let (ra, rb) = (self.find(a), self.find(b));
        let (root, child) = if ra <= rb { (ra, rb) } else { (rb, ra) };

        if root != child {
            self.parents.insert(child, root);
        }

        root
    }

    /// Whether `a` and `b` are in the same set.
    pub fn same(&mut self, a: K, b: K) -> bool {
        self.find(a) == self.find(b)
    }

    /// Whether any union has been performed.
    pub fn is_trivial(&self) -> bool {
        self.parents.is_empty()
    }
}
