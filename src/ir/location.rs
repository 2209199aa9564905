//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::utility::Str;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// What a [`Loc`](crate::ir::Loc) actually refers to.
///
/// Every location ends up in exactly one kind of storage at emission time:
/// globals get a data-section label, constants become immediates, strings
/// get a read-only label, and locals/temps get either a register from
/// allocation or a stack slot.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum LocationData {
    /// A field declared at program scope.
    Global { name: Str },
    /// A method-local variable or parameter, or a lowering intermediate.
    Local { name: Str },
    /// A virtual register introduced by value numbering.
    Temp,
    /// An integer immediate. Booleans are `0`/`1`.
    Constant(i64),
    /// A string literal. Equal contents are always the same location.
    Str(Str),
}

impl LocationData {
    /// Whether register allocation is allowed to put this location in a
    /// register. Only method-private storage qualifies.
    pub fn is_allocatable(&self) -> bool {
        matches!(self, LocationData::Local { .. } | LocationData::Temp)
    }

    /// Whether writes to this location can be observed outside of the method.
    pub fn is_global(&self) -> bool {
        matches!(self, LocationData::Global { .. })
    }

    /// Whether the location can be written at all.
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            LocationData::Global { .. } | LocationData::Local { .. } | LocationData::Temp
        )
    }
}
