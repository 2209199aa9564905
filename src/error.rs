//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Errors that can come out of the back half of the pipeline.
//!
//! None of these are user errors. The tree handed to lowering is assumed to
//! be checked already, so anything here means an earlier stage broke one of
//! the invariants emission relies on. Compilation stops at the first one and
//! nothing is emitted.

use thiserror::Error;

/// An internal invariant failure found while compiling a method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A single instruction needed more than the reserved scratch registers.
    #[error("ran out of scratch registers while emitting '{method}'")]
    ScratchExhausted { method: String },

    /// A method-private location was accessed with neither a register
    /// binding nor a stack slot.
    #[error("location {loc} in '{method}' has no register and no stack slot")]
    MissingAllocation { method: String, loc: String },

    /// A record was somewhere it can't be, e.g. a value record linked into
    /// the layout on its own, or a write into a constant.
    #[error("malformed instruction in '{method}': {reason}")]
    MalformedInstruction { method: String, reason: String },

    /// A location that should have storage in the data sections doesn't.
    #[error("no storage for {loc} referenced by '{method}'")]
    UnresolvedLocation { method: String, loc: String },
}

/// Shorthand for results carrying a [`CompileError`].
pub type CompileResult<T> = Result<T, CompileError>;
