//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Contains utility code specifically for the CLI tools located in
//! the `tools/` subdirectory.
//!
//! The option parsers live here rather than in the tool so that anything
//! driving the compiler from the command line agrees on flag names.

use crate::codegen::x86_64::{is_allocatable, Reg};
use crate::{CompileOptions, OptOptions};
use bpaf::{construct, OptionParser, Parser};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Basic options that every CLI tool in the suite takes in.
pub struct BaseOptions {
    /// The file to output results to
    pub output: Option<PathBuf>,
    /// Whether or not to run the logging in verbose mode.
    pub verbose: bool,
    /// The list of inputs given to the tool
    pub inputs: Vec<PathBuf>,
}

/// Returns a [`OptionParser`] preconfigured with the standard options and
/// additional tool-specific options.
pub fn tool_with<T>(
    description: &'static str,
    usage: &'static str,
    additional: impl Parser<T> + 'static,
) -> OptionParser<(T, BaseOptions)> {
    let res = construct!(additional, default());

    res.to_options()
        .descr(description)
        .version(VERSION)
        .usage(usage)
}

/// Gets the baseline default options that every tool needs.
pub fn default() -> impl Parser<BaseOptions> {
    let inputs = inputs();
    let output = output();
    let verbose = verbose();

    construct!(BaseOptions {
        output,
        verbose,
        inputs,
    })
}

/// Gets the output file specified on the CLI, if one exists.
pub fn output() -> impl Parser<Option<PathBuf>> {
    bpaf::long("output")
        .short('o')
        .help("the file to output to")
        .argument::<PathBuf>("FILE")
        .optional()
}

/// Gets the input file specified on the CLI.
pub fn inputs() -> impl Parser<Vec<PathBuf>> {
    bpaf::positional::<PathBuf>("FILES")
        .help("files to read as input to the tool")
        .many()
}

/// Checks for the presence of `-v` or `--verbose`
pub fn verbose() -> impl Parser<bool> {
    bpaf::long("verbose")
        .short('v')
        .help("enable verbose output")
        .flag(true, false)
}

fn disabled(name: &'static str, help: &'static str) -> impl Parser<bool> {
    bpaf::long(name).help(help).flag(false, true)
}

/// Which optimizations to run, all on unless turned off.
pub fn opt_options() -> impl Parser<OptOptions> {
    let copy_propagation = disabled("no-copy-prop", "don't propagate copies");
    let cse = disabled("no-cse", "don't eliminate common subexpressions");
    let dce = disabled("no-dce", "don't eliminate dead code");

    construct!(OptOptions {
        copy_propagation,
        cse,
        dce,
    })
}

/// Parses a comma-separated register list like `r12,r13,rbx`.
pub fn parse_palette(list: &str) -> Result<Vec<Reg>, String> {
    let mut palette = Vec::new();

    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let reg = Reg::from_name(name).ok_or_else(|| format!("unknown register '{name}'"))?;

        if !is_allocatable(reg) {
            return Err(format!("register '{name}' is reserved"));
        }

        palette.push(reg);
    }

    if palette.is_empty() {
        return Err("palette must name at least one register".to_owned());
    }

    Ok(palette)
}

/// The registers to allocate with, e.g. `--palette r12,r13`.
pub fn palette() -> impl Parser<Option<Vec<Reg>>> {
    bpaf::long("palette")
        .help("comma-separated registers that allocation may use")
        .argument::<String>("REGS")
        .parse(|list| parse_palette(&list))
        .optional()
}

/// Everything that controls compilation.
pub fn compile_options() -> impl Parser<CompileOptions> {
    let optimize = opt_options();
    let register_allocation = disabled("no-regalloc", "keep every local on the stack");
    let palette = palette();

    construct!(optimize, register_allocation, palette).map(
        |(optimize, register_allocation, palette)| CompileOptions {
            optimize,
            register_allocation,
            palette: palette.unwrap_or_else(|| CompileOptions::default().palette),
        },
    )
}
