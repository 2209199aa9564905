//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Defines the optimizations that rewrite method bodies.
//!
//! Each one is usable as a plain function over a
//! [`MethodBody`](crate::ir::MethodBody) and as a
//! [`MethodTransformPass`] for the pass manager.

mod copyprop;
mod cse;
mod dce;

pub use copyprop::*;
pub use cse::*;
pub use dce::*;

use crate::pass::MethodTransformPass;

/// Gets the pass with a given name, for tools that let users pick which
/// passes to run. Returns `None` for names that aren't known.
pub fn pass_by_name(name: &str) -> Option<Box<dyn MethodTransformPass>> {
    let pass: Box<dyn MethodTransformPass> = match name {
        "copy-prop" => Box::new(CopyPropagationPass),
        "cse" => Box::new(CommonSubexpressionEliminationPass),
        "dce" => Box::new(DeadCodeEliminationPass),
        _ => return None,
    };

    Some(pass)
}

