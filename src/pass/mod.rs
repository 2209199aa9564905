//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! How the optimization pipeline is put together and run.
//!
//! Every optimization is a [`MethodTransformPass`]: it rewrites one method
//! body in place and reports whether anything changed. Analyses are cheap
//! enough to recompute, so passes compute what they need themselves instead
//! of going through a cache.

mod manager;

pub use manager::*;

use crate::ir::MethodBody;

/// A transformation over a single method body.
pub trait MethodTransformPass {
    /// A short name used in logs and when picking passes by name.
    fn name(&self) -> &'static str;

    /// Performs the transformation, returning whether the body changed.
    ///
    /// Running a pass twice in a row on the same body has to be safe, even
    /// if the second run finds more to do.
    fn run(&mut self, body: &mut MethodBody) -> bool;
}
