//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::codegen::x86_64::Reg;
use crate::ir::{Inst, Label, Loc};
use crate::utility::Str;
use smallvec::SmallVec;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A two-operand arithmetic, comparison or logical operator.
///
/// Comparisons produce `0` or `1`. Short-circuiting `&&`/`||` are control
/// flow, not operators, so they never show up here.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Whether `a op b == b op a` for every `a` and `b`.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Mul
                | BinaryOp::Eq
                | BinaryOp::Ne
        )
    }

    /// Whether the operator produces a boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
        }
    }
}

/// A one-operand operator.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum UnaryOp {
    /// Two's complement negation.
    Neg,
    /// Logical not, `0 -> 1` and anything else `-> 0`.
    Not,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
        }
    }
}

/// One instruction record.
///
/// Records come in two layers. Statements (`Save`, `Use`, statement calls and
/// control flow) are linked into the method's [`Layout`](crate::ir::Layout).
/// Values (`Load`, `Param`, `Binary`, `Unary`, `Call`) are owned by exactly one
/// statement through its operand fields and never appear in the layout on their
/// own, except for a `Call` whose result is discarded.
///
/// The operands of `Binary` and `Unary` are always `Load`s, so every value
/// tree is at most two levels deep.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum InstData {
    /// Reads the current value of `src`.
    Load { src: Loc },
    /// Reads incoming argument number `index` of the current method.
    Param { index: u32 },
    /// `lhs op rhs`.
    Binary { op: BinaryOp, lhs: Inst, rhs: Inst },
    /// `op operand`.
    Unary { op: UnaryOp, operand: Inst },
    /// Calls `target` with `args`, producing whatever the callee returns.
    ///
    /// `saved` is filled in by register allocation: the caller-saved
    /// registers that hold values live across this call.
    Call {
        target: Str,
        args: SmallVec<[Loc; 4]>,
        external: bool,
        saved: SmallVec<[Reg; 4]>,
    },
    /// Writes `value` into `dest`.
    Save { value: Inst, dest: Loc },
    /// A read of `loc` that produces nothing. It keeps `loc` live up to this
    /// point and is otherwise a no-op.
    ///
    /// Lowering never emits one, since every read it makes is a `Load` or a
    /// call argument. It is for code that builds methods directly and needs
    /// a location observed without computing anything from it.
    Use { loc: Loc },
    /// Marks the start of a jump target.
    Label(Label),
    /// Unconditionally transfers control to `target`.
    Jump { target: Label },
    /// Transfers control to `target` when `cond` is zero, otherwise falls through.
    Branch { cond: Inst, target: Label },
    /// Returns from the method, optionally with a value.
    Return { value: Option<Inst> },
    /// Terminates the process with `code`.
    Exit { code: i32 },
}

impl InstData {
    /// Whether the record produces a value that some other record consumes.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            InstData::Load { .. }
                | InstData::Param { .. }
                | InstData::Binary { .. }
                | InstData::Unary { .. }
                | InstData::Call { .. }
        )
    }

    /// Whether control never falls through to the next statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstData::Jump { .. } | InstData::Return { .. } | InstData::Exit { .. }
        )
    }

    /// Whether the record ends a block, either by leaving it or by maybe leaving it.
    pub fn ends_block(&self) -> bool {
        self.is_terminator() || matches!(self, InstData::Branch { .. })
    }

    /// The label this record may transfer control to.
    pub fn branch_target(&self) -> Option<Label> {
        match self {
            InstData::Jump { target } | InstData::Branch { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// The value records this record directly owns.
    pub fn operands(&self) -> SmallVec<[Inst; 2]> {
        let mut out = SmallVec::new();

        match self {
            InstData::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            InstData::Unary { operand, .. } => out.push(*operand),
            InstData::Save { value, .. } => out.push(*value),
            InstData::Branch { cond, .. } => out.push(*cond),
            InstData::Return { value: Some(value) } => out.push(*value),
            _ => {}
        }

        out
    }

    /// The location this record writes, if any.
    pub fn def(&self) -> Option<Loc> {
        match self {
            InstData::Save { dest, .. } => Some(*dest),
            _ => None,
        }
    }
}
