//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022 Evan Cox <evanacox00@gmail.com>. All rights reserved.      //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! APIs for the compiler back-end and code-generation facilities
//!
//! [`regalloc`] is target-independent apart from needing to know which
//! registers exist. Anything in a module with an architecture in its name
//! (e.g. `garnet::codegen::x86_64::*`) is CPU-specific.

pub mod regalloc;
pub mod x86_64;
