//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! x86-64 Backend
//!
//! Turns allocated method bodies into NASM assembly for System V x86-64.
//! Values are evaluated into registers one statement at a time, using
//! register bindings where allocation made them and the two scratch
//! registers otherwise. Anything without a register lives in the method's
//! [`Frame`], the data section or the read-only string section, the last
//! two being accumulated across methods in a [`Session`].

mod asm;
mod emit;
mod frame;
mod regs;
mod scratch;
mod session;

pub use asm::*;
pub use emit::*;
pub use frame::*;
pub use regs::*;
pub use scratch::*;
pub use session::*;
