//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt::{Debug, Formatter, Result};
use std::mem;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// Helper trait for a type that can be packed into a [`PackedOption`].
///
/// These types need to have some null-ish value that they can reserve,
/// that value is what distinguishes `None` from `Some`. Every key made by
/// [`arena_key`](crate::arena_key) reserves its storage type's `MAX`.
///
/// ```
/// # use garnet::utility::*;
/// struct NonZero(i32);
///
/// impl Packable for NonZero {
///     fn reserved() -> Self {
///         NonZero(0)
///     }
///
///     fn is_reserved(&self) -> bool {
///         self.0 == 0
///     }
/// }
///
/// let opt = PackedOption::some(NonZero(15));
///
/// assert!(opt.is_some());
/// ```
pub trait Packable {
    /// The value that stands in for `None`.
    fn reserved() -> Self;

    /// Whether `self` is the value from [`Self::reserved`].
    fn is_reserved(&self) -> bool;
}

/// An [`Option`]-like type for arena keys that takes up exactly as much space
/// as the key would on its own.
///
/// Used for the `prev`/`next` links of the instruction layout, where almost
/// every node has both links and a real `Option` would double the size.
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct PackedOption<T: Packable>(T);

impl<T: Packable> PackedOption<T> {
    /// Creates a `None` instance.
    #[inline]
    pub fn none() -> Self {
        Self(T::reserved())
    }

    /// Creates a `Some` instance. Panics if `value` is the reserved value.
    #[inline]
    pub fn some(value: T) -> Self {
        assert!(!value.is_reserved(), "cannot pack the reserved value");

        Self(value)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0.is_reserved()
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Expands into a normal `Option` that can be matched on.
    #[inline]
    pub fn expand(self) -> Option<T> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Takes the value out, leaving a `None` in its place.
    #[inline]
    pub fn take(&mut self) -> Option<T> {
        mem::replace(self, Self::none()).expand()
    }

    /// Puts `value` in, returning whatever was there before.
    #[inline]
    pub fn replace(&mut self, value: T) -> Option<T> {
        mem::replace(self, Self::some(value)).expand()
    }
}

impl<T: Packable> Default for PackedOption<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Packable> From<Option<T>> for PackedOption<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            None => Self::none(),
            Some(t) => Self::some(t),
        }
    }
}

impl<T: Packable> From<T> for PackedOption<T> {
    fn from(value: T) -> Self {
        Self::some(value)
    }
}

impl<T> Debug for PackedOption<T>
where
    T: Packable + Debug + Copy,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.expand().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaKey, ArenaMap};
    use crate::arena_key;
    use static_assertions::assert_eq_size;

    arena_key! { struct Key; }

    assert_eq_size!(PackedOption<Key>, Key);

    #[test]
    fn observer_methods() {
        let mut map = ArenaMap::new();
        let key: Key = map.insert("Hello!");

        let none = PackedOption::<Key>::default();
        let mut some = PackedOption::some(key);

        assert!(none.is_none());
        assert!(some.is_some());
        assert_eq!(some.expand(), Some(key));

        some = none;

        assert!(some.is_none());
    }

    #[test]
    fn take_leaves_none() {
        let mut opt = PackedOption::from(Key::new(4));

        assert_eq!(opt.take(), Some(Key::new(4)));
        assert_eq!(opt.take(), None);
    }

    #[test]
    #[should_panic(expected = "cannot pack the reserved value")]
    fn packing_reserved_panics() {
        std::panic::set_hook(Box::new(|_| {}));

        let _ = PackedOption::some(<Key as Packable>::reserved());
    }
}
