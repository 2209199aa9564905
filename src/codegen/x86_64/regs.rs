//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A general-purpose x86-64 register.
///
/// Allocation results are recorded on call records and in the method's
/// register bindings, so the IR carries these directly.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "lowercase"))]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Reg {
    /// Every register, in encoding-ish order.
    pub const ALL: [Reg; 16] = [
        Reg::Rax,
        Reg::Rbx,
        Reg::Rcx,
        Reg::Rdx,
        Reg::Rsi,
        Reg::Rdi,
        Reg::Rbp,
        Reg::Rsp,
        Reg::R8,
        Reg::R9,
        Reg::R10,
        Reg::R11,
        Reg::R12,
        Reg::R13,
        Reg::R14,
        Reg::R15,
    ];

    /// Registers a callee may clobber without restoring them under System V.
    pub fn is_caller_saved(self) -> bool {
        matches!(
            self,
            Reg::Rax
                | Reg::Rcx
                | Reg::Rdx
                | Reg::Rsi
                | Reg::Rdi
                | Reg::R8
                | Reg::R9
                | Reg::R10
                | Reg::R11
        )
    }

    /// Registers a callee has to preserve under System V.
    pub fn is_callee_saved(self) -> bool {
        !self.is_caller_saved()
    }

    /// The lowercase assembler name, e.g. `r12`.
    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rbx => "rbx",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
            Reg::Rbp => "rbp",
            Reg::Rsp => "rsp",
            Reg::R8 => "r8",
            Reg::R9 => "r9",
            Reg::R10 => "r10",
            Reg::R11 => "r11",
            Reg::R12 => "r12",
            Reg::R13 => "r13",
            Reg::R14 => "r14",
            Reg::R15 => "r15",
        }
    }

    /// Parses an assembler name back into a register.
    pub fn from_name(name: &str) -> Option<Reg> {
        Reg::ALL
            .into_iter()
            .find(|reg| reg.name().eq_ignore_ascii_case(name))
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registers used for the first six integer arguments, in order.
pub const ARG_REGS: [Reg; 6] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

/// The two scratch registers reserved for instruction-local temporaries.
pub const SCRATCH_REGS: [Reg; 2] = [Reg::R10, Reg::R11];

/// The registers that register allocation colors with unless told otherwise.
pub const DEFAULT_PALETTE: [Reg; 4] = [Reg::R12, Reg::R13, Reg::R14, Reg::R15];

/// Whether `reg` may be handed out by register allocation.
///
/// Everything that emission uses implicitly is excluded: the stack and frame
/// pointers, the scratch pool, and `rax`/`rdx` (return value and division).
/// The other argument registers are fine, incoming arguments are spilled in
/// the prologue and call sites save whatever is live across them.
pub fn is_allocatable(reg: Reg) -> bool {
    !matches!(reg, Reg::Rax | Reg::Rdx | Reg::Rbp | Reg::Rsp) && !SCRATCH_REGS.contains(&reg)
}
