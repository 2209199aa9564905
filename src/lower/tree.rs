//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The checked syntax tree handed over by the front end.
//!
//! Names are already resolved to declarations and every expression is
//! well-typed, so nothing here is validated again. Under `enable-serde` the
//! tree deserializes from the externally-tagged form serde uses by default,
//! e.g. `{"binary": {"op": "add", "lhs": {"var": "x"}, "rhs": {"int": 1}}}`.

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// A whole program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Program {
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub fields: Vec<String>,
    pub methods: Vec<MethodDecl>,
}

/// One method declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct MethodDecl {
    pub name: String,
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub params: Vec<String>,
    /// Whether the method is declared to return a value. Falling off the end
    /// of such a method is a runtime error.
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub returns_value: bool,
    pub body: Body,
}

/// A braced block: local declarations first, then statements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Body {
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub locals: Vec<String>,
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub stmts: Vec<Stmt>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum Stmt {
    Assign {
        target: String,
        op: AssignOp,
        value: Expr,
    },
    Call(Call),
    If {
        cond: Expr,
        then: Body,
        #[cfg_attr(feature = "enable-serde", serde(default))]
        otherwise: Option<Body>,
    },
    While {
        cond: Expr,
        body: Body,
    },
    /// `for var = start, end { body }`: runs while `var < end`, where `end`
    /// is evaluated once, and increments `var` after every iteration.
    For {
        var: String,
        start: Expr,
        end: Expr,
        body: Body,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Block(Body),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum BinOp {
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
    /// Short-circuiting `&&`.
    And,
    /// Short-circuiting `||`.
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Var(String),
    Call(Call),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
}

impl Expr {
    /// Whether evaluating the expression may call anything.
    pub fn has_call(&self) -> bool {
        match self {
            Expr::Call(_) => true,
            Expr::Binary { lhs, rhs, .. } => lhs.has_call() || rhs.has_call(),
            Expr::Unary { operand, .. } => operand.has_call(),
            _ => false,
        }
    }
}

/// A call of a method in the program, or of an external routine (a callout).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Call {
    pub name: String,
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub args: Vec<Arg>,
    #[cfg_attr(feature = "enable-serde", serde(default))]
    pub callout: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "enable-serde", serde(rename_all = "snake_case"))]
pub enum Arg {
    Expr(Expr),
    /// String literals are only allowed as callout arguments.
    Str(String),
}
