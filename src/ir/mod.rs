//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The linear IR that lowering produces and every later stage consumes.
//!
//! A [`Module`] owns the string pool, the global fields and one
//! [`MethodBody`] per method. Each body owns its instruction records
//! ([`InstData`]), its memory locations ([`LocationData`]) and a [`Layout`]
//! that orders the statements into blocks. Everything refers to everything
//! else with typed arena keys, so passes rewire keys instead of pointers.

mod body;
mod builder;
mod entities;
mod instruction;
mod layout;
mod location;
mod module;
mod writer;

pub use body::*;
pub use builder::*;
pub use entities::*;
pub use instruction::*;
pub use layout::*;
pub use location::*;
pub use module::*;
pub use writer::*;
