//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Lowers the checked syntax tree into the linear IR.
//!
//! Every intermediate result of an expression is saved into a fresh
//! method-local location, so the operands of every arithmetic record are
//! plain loads. Short-circuit operators and all statements become labels,
//! jumps and branches.

pub mod tree;

use crate::ir::{BinaryOp, Inst, Label, Loc, MethodBody, MethodBuilder, Module, UnaryOp};
use crate::utility::{SaHashMap, StringPool};
use log::debug;
use smallvec::SmallVec;
use tree::{Arg, AssignOp, BinOp, Body, Call, Expr, MethodDecl, Program, Stmt, UnOp};

/// The exit code used when control reaches the end of a method that was
/// declared to return a value.
pub const MISSING_RETURN_EXIT_CODE: i32 = -2;

/// Lowers a whole program into a [`Module`].
pub fn lower_program(program: &Program) -> Module {
    let mut module = Module::new();

    for field in program.fields.iter() {
        let name = module.intern(field);

        module.add_global(name);
    }

    for method in program.methods.iter() {
        let body = lower_method(module.strings_mut(), method);

        module.add_method(body);
    }

    module
}

/// Lowers a single method, interning every name it uses into `strings`.
pub fn lower_method(strings: &mut StringPool, decl: &MethodDecl) -> MethodBody {
    let mut lowering = MethodLowering {
        builder: MethodBuilder::new(strings.insert(&decl.name)),
        strings,
        scopes: vec![SaHashMap::default()],
        loops: Vec::new(),
        next_synthetic: 0,
    };

    for param in decl.params.iter() {
        let name = lowering.strings.insert(param);
        let loc = lowering.builder.param(name);

        lowering.scopes[0].insert(param.clone(), loc);
    }

    lowering.body(&decl.body);

    if !lowering.builder.is_terminated() {
        if decl.returns_value {
            lowering.builder.exit(MISSING_RETURN_EXIT_CODE);
        } else {
            lowering.builder.ret(None);
        }
    }

    let body = lowering.builder.finish();

    debug!(
        "lowered method '{}' into {} blocks",
        decl.name,
        body.layout().len_blocks()
    );

    body
}

struct MethodLowering<'s> {
    strings: &'s mut StringPool,
    builder: MethodBuilder,
    scopes: Vec<SaHashMap<String, Loc>>,
    // (continue, break) targets of the enclosing loops
    loops: Vec<(Label, Label)>,
    next_synthetic: u32,
}

impl MethodLowering<'_> {
    fn resolve(&mut self, name: &str) -> Loc {
        for scope in self.scopes.iter().rev() {
            if let Some(&loc) = scope.get(name) {
                return loc;
            }
        }

        // the tree is checked, so anything not declared locally is a field
        let name = self.strings.insert(name);

        self.builder.global(name)
    }

    fn synthetic(&mut self) -> Loc {
        let name = self.strings.insert(&format!(".t{}", self.next_synthetic));

        self.next_synthetic += 1;
        self.builder.local(name)
    }

    fn body(&mut self, body: &Body) {
        let mut scope = SaHashMap::default();
        let zero = self.builder.constant(0);

        for local in body.locals.iter() {
            let name = self.strings.insert(local);
            let loc = self.builder.local(name);

            self.builder.copy(zero, loc);
            scope.insert(local.clone(), loc);
        }

        self.scopes.push(scope);

        for stmt in body.stmts.iter() {
            self.stmt(stmt);
        }

        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { target, op, value } => {
                let dest = self.resolve(target);

                match op {
                    AssignOp::Assign => self.expr_into(value, dest),
                    AssignOp::AddAssign | AssignOp::SubAssign => {
                        let op = if *op == AssignOp::AddAssign {
                            BinaryOp::Add
                        } else {
                            BinaryOp::Sub
                        };

                        let rhs = self.expr(value);
                        let sum = self.builder.binary(op, dest, rhs);

                        self.builder.save(sum, dest);
                    }
                }
            }
            Stmt::Call(call) => {
                let call = self.call(call);

                self.builder.call_stmt(call);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond);
                let else_label = self.builder.new_label();

                self.builder.branch_if_zero(cond, else_label);
                self.body(then);

                match otherwise {
                    Some(otherwise) => {
                        let end = self.builder.new_label();

                        self.builder.jump(end);
                        self.builder.label(else_label);
                        self.body(otherwise);
                        self.builder.label(end);
                    }
                    None => {
                        self.builder.label(else_label);
                    }
                }
            }
            Stmt::While { cond, body } => {
                let top = self.builder.new_label();
                let end = self.builder.new_label();

                self.builder.label(top);

                let cond = self.expr(cond);

                self.builder.branch_if_zero(cond, end);
                self.loop_body(body, top, end);
                self.builder.jump(top);
                self.builder.label(end);
            }
            Stmt::For {
                var,
                start,
                end,
                body,
            } => {
                let var = self.resolve(var);
                let bound = self.synthetic();

                self.expr_into(start, var);
                self.expr_into(end, bound);

                let top = self.builder.new_label();
                let next = self.builder.new_label();
                let done = self.builder.new_label();

                self.builder.label(top);

                let cond = self.synthetic();
                let less = self.builder.binary(BinaryOp::Lt, var, bound);

                self.builder.save(less, cond);
                self.builder.branch_if_zero(cond, done);
                self.loop_body(body, next, done);
                self.builder.label(next);

                let one = self.builder.constant(1);
                let inc = self.builder.binary(BinaryOp::Add, var, one);

                self.builder.save(inc, var);
                self.builder.jump(top);
                self.builder.label(done);
            }
            Stmt::Return(value) => {
                let value = value.as_ref().map(|e| self.expr(e));

                self.builder.ret(value);
            }
            Stmt::Break => {
                if let Some(&(_, target)) = self.loops.last() {
                    self.builder.jump(target);
                }
            }
            Stmt::Continue => {
                if let Some(&(target, _)) = self.loops.last() {
                    self.builder.jump(target);
                }
            }
            Stmt::Block(body) => self.body(body),
        }
    }

    fn loop_body(&mut self, body: &Body, cont: Label, brk: Label) {
        self.loops.push((cont, brk));
        self.body(body);
        self.loops.pop();
    }

    /// Evaluates `expr` directly into `dest`, skipping the intermediate
    /// location when the value can be computed in one record.
    fn expr_into(&mut self, expr: &Expr, dest: Loc) {
        match expr {
            Expr::Binary { op, lhs, rhs } if !matches!(op, BinOp::And | BinOp::Or) => {
                let (lhs, rhs) = self.operands(lhs, rhs);
                let value = self.builder.binary(arith(*op), lhs, rhs);

                self.builder.save(value, dest);
            }
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand);
                let value = self.builder.unary(unary(*op), operand);

                self.builder.save(value, dest);
            }
            Expr::Call(call) => {
                let call = self.call(call);

                self.builder.save(call, dest);
            }
            _ => {
                let src = self.expr(expr);

                self.builder.copy(src, dest);
            }
        }
    }

    /// Evaluates `expr`, returning a location that holds its value.
    fn expr(&mut self, expr: &Expr) -> Loc {
        match expr {
            Expr::Int(value) => self.builder.constant(*value),
            Expr::Bool(value) => self.builder.constant(*value as i64),
            Expr::Var(name) => self.resolve(name),
            Expr::Binary {
                op: op @ (BinOp::And | BinOp::Or),
                lhs,
                rhs,
            } => self.short_circuit(*op, lhs, rhs),
            _ => {
                let dest = self.synthetic();

                self.expr_into(expr, dest);

                dest
            }
        }
    }

    fn operands(&mut self, lhs: &Expr, rhs: &Expr) -> (Loc, Loc) {
        let mut lhs = self.expr(lhs);

        // a call on the right could write a variable read on the left, the
        // left has to be read before the call happens
        if rhs.has_call() {
            let copy = self.synthetic();

            self.builder.copy(lhs, copy);
            lhs = copy;
        }

        (lhs, self.expr(rhs))
    }

    fn short_circuit(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Loc {
        let dest = self.synthetic();
        let end = self.builder.new_label();

        self.expr_into(lhs, dest);

        if op == BinOp::And {
            self.builder.branch_if_zero(dest, end);
        } else {
            let inverted = self.synthetic();
            let not = self.builder.unary(UnaryOp::Not, dest);

            self.builder.save(not, inverted);
            self.builder.branch_if_zero(inverted, end);
        }

        self.expr_into(rhs, dest);
        self.builder.label(end);

        dest
    }

    fn call(&mut self, call: &Call) -> Inst {
        let has_later_call: SmallVec<[bool; 8]> = (0..call.args.len())
            .map(|i| {
                call.args[i + 1..]
                    .iter()
                    .any(|arg| matches!(arg, Arg::Expr(e) if e.has_call()))
            })
            .collect();

        let mut args = SmallVec::<[Loc; 8]>::new();

        for (arg, later_call) in call.args.iter().zip(has_later_call) {
            let loc = match arg {
                Arg::Str(s) => {
                    let s = self.strings.insert(s);

                    self.builder.string(s)
                }
                Arg::Expr(e @ Expr::Var(_)) if later_call => {
                    let copy = self.synthetic();

                    self.expr_into(e, copy);

                    copy
                }
                Arg::Expr(e) => self.expr(e),
            };

            args.push(loc);
        }

        let target = self.strings.insert(&call.name);

        self.builder.call(target, &args, call.callout)
    }
}

fn arith(op: BinOp) -> BinaryOp {
    match op {
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div => BinaryOp::Div,
        BinOp::Mod => BinaryOp::Mod,
        BinOp::Eq => BinaryOp::Eq,
        BinOp::Ne => BinaryOp::Ne,
        BinOp::Lt => BinaryOp::Lt,
        BinOp::Le => BinaryOp::Le,
        BinOp::Gt => BinaryOp::Gt,
        BinOp::Ge => BinaryOp::Ge,
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators are lowered as control flow"),
    }
}

fn unary(op: UnOp) -> UnaryOp {
    match op {
        UnOp::Neg => UnaryOp::Neg,
        UnOp::Not => UnaryOp::Not,
    }
}
