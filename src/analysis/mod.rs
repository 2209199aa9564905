//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Contains the analyses the optimizer and the register allocator are built on.
//!
//! Every analysis here is computed from a [`MethodBody`](crate::ir::MethodBody)
//! and never modifies it. Passes that rewrite the IR compute what they need
//! from here first and then do their own walk over the body.

mod dataflow;
mod flowgraph;
mod liveness;

pub use dataflow::*;
pub use flowgraph::*;
pub use liveness::*;

#[cfg(test)]
pub(crate) use dataflow::tests::assert_fixpoint;
