//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena_key;

arena_key! {
    /// Refers to one instruction record inside of a [`MethodBody`](crate::ir::MethodBody).
    ///
    /// Both the statement-level records that live in the layout (saves, uses,
    /// control flow) and the value records hanging off of them (loads,
    /// arithmetic, calls) are referred to with an `Inst`.
    pub struct Inst;

    /// A straight-line run of statements inside of a method body.
    pub struct Block;

    /// A memory location that instructions read from or write to. See
    /// [`LocationData`](crate::ir::LocationData) for what a location can be.
    pub struct Loc;

    /// A jump target. Each label is placed at the start of exactly one block.
    pub struct Label;
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(Inst, u32);
    assert_eq_size!(Loc, u32);
    assert_eq_size!(crate::utility::PackedOption<Block>, u32);
}
