//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

#![deny(
    missing_abi,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]

//! # Garnet
//!
//! The back half of a compiler for a small Decaf-like language: a checked
//! syntax tree is lowered into a linear IR, optimized with dataflow-driven
//! passes, register allocated by graph coloring and emitted as x86-64 NASM.
//!
//! ```none
//! lower::tree::Program
//!     -> lower            (ir::Module)
//!     -> transforms       (copy propagation, CSE, DCE)
//!     -> codegen::regalloc
//!     -> codegen::x86_64  (AsmProgram)
//! ```

pub mod analysis;
pub mod arena;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lower;
pub mod pass;
pub mod transforms;
pub mod utility;

#[cfg(feature = "dev-tools")]
pub mod cli;

use crate::codegen::regalloc::RegisterAllocationPass;
use crate::codegen::x86_64::{emit_module, AsmProgram, Reg, DEFAULT_PALETTE};
use crate::error::CompileResult;
use crate::ir::Module;
use crate::lower::tree::Program;
use crate::pass::MethodPassManager;
use crate::transforms::pass_by_name;
use log::info;

/// Which optimizations run before register allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptOptions {
    pub copy_propagation: bool,
    pub cse: bool,
    pub dce: bool,
}

impl Default for OptOptions {
    fn default() -> Self {
        Self {
            copy_propagation: true,
            cse: true,
            dce: true,
        }
    }
}

impl OptOptions {
    /// Every optimization turned off.
    pub fn none() -> Self {
        Self {
            copy_propagation: false,
            cse: false,
            dce: false,
        }
    }

    /// The names of the passes to run, in order. Copy propagation runs on
    /// both sides of CSE since reuse turns expressions into copies.
    pub fn pipeline(&self) -> Vec<&'static str> {
        let mut names = Vec::new();

        if self.copy_propagation {
            names.push("copy-prop");
        }

        if self.cse {
            names.push("cse");

            if self.copy_propagation {
                names.push("copy-prop");
            }
        }

        if self.dce {
            names.push("dce");
        }

        names
    }
}

/// Everything that controls how a program is compiled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    pub optimize: OptOptions,
    /// When off, every local lives on the stack.
    pub register_allocation: bool,
    /// The registers that allocation may hand out.
    pub palette: Vec<Reg>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: OptOptions::default(),
            register_allocation: true,
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

/// Builds the pass pipeline that `options` asks for, register allocation
/// included.
pub fn build_pipeline(options: &CompileOptions) -> MethodPassManager {
    let mut pm = MethodPassManager::new();

    for name in options.optimize.pipeline() {
        if let Some(pass) = pass_by_name(name) {
            pm.add_boxed_pass(pass);
        }
    }

    if options.register_allocation {
        pm.add_pass(RegisterAllocationPass::new(&options.palette));
    }

    pm
}

/// Runs the optimization and allocation pipeline over an already-lowered
/// module.
pub fn run_pipeline(module: &mut Module, options: &CompileOptions) {
    let mut pm = build_pipeline(options);

    info!(
        "running [{}] over {} methods",
        pm.pass_names().collect::<Vec<_>>().join(", "),
        module.methods().len()
    );

    pm.run_on_module(module);
}

/// Compiles a checked program all the way to assembly.
///
/// Either the whole program is emitted or nothing is: the first internal
/// error aborts compilation.
pub fn compile(program: &Program, options: &CompileOptions) -> CompileResult<AsmProgram> {
    let mut module = lower::lower_program(program);

    run_pipeline(&mut module, options);

    emit_module(&module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::tree::{Arg, AssignOp, BinOp, Body, Call, Expr, MethodDecl, Stmt};

    fn assign(target: &str, value: Expr) -> Stmt {
        Stmt::Assign {
            target: target.into(),
            op: AssignOp::Assign,
            value,
        }
    }

    fn add(lhs: &str, rhs: &str) -> Expr {
        Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Var(lhs.into())),
            rhs: Box::new(Expr::Var(rhs.into())),
        }
    }

    fn sample() -> Program {
        let print = Call {
            name: "printf".into(),
            args: vec![Arg::Str("%d\n".into()), Arg::Expr(Expr::Var("g".into()))],
            callout: true,
        };

        Program {
            fields: vec!["g".into()],
            methods: vec![MethodDecl {
                name: "main".into(),
                params: Vec::new(),
                returns_value: false,
                body: Body {
                    locals: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    stmts: vec![
                        assign("a", Expr::Int(3)),
                        assign("b", Expr::Int(4)),
                        assign("c", add("a", "b")),
                        assign("d", add("a", "b")),
                        assign("g", add("c", "d")),
                        Stmt::Call(print),
                        Stmt::Return(None),
                    ],
                },
            }],
        }
    }

    fn adds(program: &AsmProgram) -> usize {
        program
            .function("main")
            .map(|main| {
                main.body
                    .iter()
                    .map(ToString::to_string)
                    .filter(|line| line.trim().starts_with("add ") && !line.contains("rsp"))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test]
    fn optimization_removes_the_repeated_add() {
        let plain = CompileOptions {
            optimize: OptOptions::none(),
            register_allocation: false,
            ..CompileOptions::default()
        };

        let unoptimized = compile(&sample(), &plain).unwrap();
        let optimized = compile(&sample(), &CompileOptions::default()).unwrap();

        assert!(adds(&unoptimized) >= 3);
        assert!(adds(&optimized) < adds(&unoptimized));

        let text = optimized.to_string();

        assert!(text.contains("extern printf"));
        assert!(text.contains("global main"));
        assert!(text.contains("field0:"));
    }

    #[test]
    fn pipeline_follows_options() {
        assert_eq!(
            OptOptions::default().pipeline(),
            vec!["copy-prop", "cse", "copy-prop", "dce"]
        );
        assert!(OptOptions::none().pipeline().is_empty());

        let only_cse = OptOptions {
            cse: true,
            ..OptOptions::none()
        };

        assert_eq!(only_cse.pipeline(), vec!["cse"]);
    }

    #[test]
    fn pipeline_ends_with_allocation() {
        let pm = build_pipeline(&CompileOptions::default());
        let names: Vec<_> = pm.pass_names().collect();

        assert_eq!(names.last(), Some(&"regalloc"));

        let pm = build_pipeline(&CompileOptions {
            optimize: OptOptions::none(),
            register_allocation: false,
            ..CompileOptions::default()
        });

        assert!(pm.is_empty());
    }
}
