//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaMap;
use crate::arena_key;
use crate::utility::SaHashMap;
use std::ops::Index;
use std::rc::Rc;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

arena_key! {
    /// A reference to a string inside of a given [`StringPool`]. These are
    /// far more compact than [`String`]s, and compare in O(1) since equal
    /// contents always intern to the same key.
    ///
    /// ```
    /// # use garnet::utility::*;
    /// let mut pool = StringPool::new();
    /// let s = pool.insert("Hello!");
    ///
    /// assert_eq!(&pool[s], "Hello!");
    /// assert_eq!(pool.insert("Hello!"), s);
    /// ```
    pub struct Str;
}

/// Owns a set of strings, deduplicated by content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPool {
    strings: ArenaMap<Str, Rc<str>>,
    refs: SaHashMap<Rc<str>, Str>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `string`, returning the existing key when the same contents
    /// have been inserted before.
    pub fn insert(&mut self, string: &str) -> Str {
        if let Some(s) = self.refs.get(string) {
            return *s;
        }

        let shared: Rc<str> = Rc::from(string);
        let key = self.strings.insert(Rc::clone(&shared));

        self.refs.insert(shared, key);

        key
    }

    /// Finds the key for `string` without inserting it.
    pub fn find(&self, string: &str) -> Option<Str> {
        self.refs.get(string).copied()
    }

    pub fn get(&self, key: Str) -> Option<&str> {
        self.strings.get(key).map(|rc| rc.as_ref())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Every interned string, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Str, &str)> {
        self.strings.iter().map(|(k, rc)| (k, rc.as_ref()))
    }
}

impl Index<Str> for StringPool {
    type Output = str;

    fn index(&self, key: Str) -> &str {
        self.strings[key].as_ref()
    }
}

// keys are only meaningful relative to insertion order, so the pool goes
// over the wire as a plain sequence and is rebuilt in the same order
#[cfg(feature = "enable-serde")]
impl Serialize for StringPool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.strings.values().map(|rc| rc.as_ref()))
    }
}

#[cfg(feature = "enable-serde")]
impl<'de> Deserialize<'de> for StringPool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        let mut pool = StringPool::new();

        for s in strings.iter() {
            pool.insert(s);
        }

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_by_content() {
        let mut pool = StringPool::new();
        let a = pool.insert("hello");
        let b = pool.insert("world");
        let c = pool.insert("hello");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.find("world"), Some(b));
        assert_eq!(pool.find("nope"), None);
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut pool = StringPool::new();

        pool.insert("b");
        pool.insert("a");
        pool.insert("b");

        let all: Vec<_> = pool.iter().map(|(_, s)| s).collect();

        assert_eq!(all, vec!["b", "a"]);
    }

    #[test]
    #[cfg(feature = "enable-serde")]
    fn serializes_in_order() {
        use serde_test::{assert_tokens, Token};

        let mut pool = StringPool::new();

        pool.insert("x");
        pool.insert("y");

        assert_tokens(
            &pool,
            &[
                Token::Seq { len: Some(2) },
                Token::Str("x"),
                Token::Str("y"),
                Token::SeqEnd,
            ],
        );
    }
}
