//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt::Debug;

/// Models a type that can be used as a key into the arena types.
///
/// Keys are thin wrappers around an integer index. Prefer the
/// [`arena_key`](crate::arena_key) macro over implementing this by hand.
pub trait ArenaKey: Copy + Eq + Ord + Debug {
    /// Creates a key from a raw arena index. Panics if `index` cannot be
    /// represented by the key's storage type.
    fn new(index: usize) -> Self;

    /// Gets the raw arena index back out of the key.
    fn index(self) -> usize;
}

/// Creates one or more type-safe keys for an [`ArenaMap`](crate::arena::ArenaMap).
///
/// The storage type defaults to `u32`, but can be given explicitly.
///
/// ```
/// # use garnet::arena_key;
/// # use garnet::arena::ArenaMap;
/// arena_key! {
///     /// Doc comments are forwarded.
///     pub struct Node;
///
///     struct TinyNode(u8);
/// }
///
/// let mut nodes = ArenaMap::new();
/// let n: Node = nodes.insert("root");
///
/// assert_eq!(nodes[n], "root");
/// ```
#[macro_export(local_inner_macros)]
macro_rules! arena_key {
    ( $(#[$outer:meta])* $vis:vis struct $name:ident($ty:ty); $($rest:tt)* ) => {
        $(#[$outer])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name($ty);

        impl $crate::arena::ArenaKey for $name {
            #[inline]
            fn new(index: usize) -> Self {
                use std::convert::TryInto;

                Self(index.try_into().expect("index is not representable with key type"))
            }

            #[inline]
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $crate::utility::Packable for $name {
            #[inline]
            fn reserved() -> Self {
                Self(<$ty>::MAX)
            }

            #[inline]
            fn is_reserved(&self) -> bool {
                self.0 == <$ty>::MAX
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::write!(f, "{}({})", std::stringify!($name), self.0)
            }
        }

        arena_key!($($rest)*);
    };

    ( $(#[$outer:meta])* $vis:vis struct $name:ident; $($rest:tt)* ) => {
        arena_key! { $(#[$outer])* $vis struct $name(u32); $($rest)* }
    };

    () => {}
}
