//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! A simple typed arena module.
//!
//! The primary [`ArenaMap`] never removes values, so every key it hands out
//! stays valid. Extra per-key data lives in a [`SecondaryMap`] or, for plain
//! membership, a [`SecondarySet`]. Every graph-like structure in the compiler
//! (instructions, blocks, locations, webs) is built on top of these.
//!
//! ```
//! # use garnet::arena_key;
//! # use garnet::arena::*;
//! arena_key! {
//!     pub struct Node;
//! }
//!
//! enum Expr {
//!     Immediate(u64),
//!     Add(Node, Node),
//!     Mul(Node, Node)
//! }
//!
//! let mut arena = ArenaMap::new();
//!
//! // (16 + 3) * 3
//! let e1: Node = arena.insert(Expr::Immediate(16));
//! let e2 = arena.insert(Expr::Immediate(3));
//! let e3 = arena.insert(Expr::Add(e1, e2));
//! let e4 = arena.insert(Expr::Mul(e2, e3));
//!
//! assert_eq!(arena.len(), 4);
//! ```

mod key;
mod map;
mod secondary;
mod secondary_set;

pub use key::ArenaKey;
pub use map::ArenaMap;
pub use secondary::SecondaryMap;
pub use secondary_set::SecondarySet;
