//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use ansi_term::Color::{Red, White};
use bpaf::Parser;
use garnet::cli;
use garnet::cli::BaseOptions;
use garnet::codegen::x86_64::emit_module;
use garnet::lower::lower_program;
use garnet::lower::tree::Program;
use garnet::CompileOptions;
use log::LevelFilter;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn emit_ir() -> impl Parser<bool> {
    bpaf::long("emit-ir")
        .help("print the optimized IR instead of assembly")
        .flag(true, false)
}

fn main() -> ExitCode {
    #[cfg(windows)]
    ansi_term::enable_ansi_support().expect("unable to enable ANSI");

    let options = cli::compile_options();
    let emit_ir = emit_ir();
    let ((options, emit_ir), base) = cli::tool_with(
        "checked Decaf tree (JSON) -> x86-64 NASM compiler",
        "garnetc [options] <input.json>",
        bpaf::construct!(options, emit_ir),
    )
    .run();

    init_logging(&base);

    if base.inputs.len() != 1 {
        report("expected exactly one input file");

        return ExitCode::FAILURE;
    }

    match compile_file(&base.inputs[0], &options, emit_ir) {
        Ok(output) => match &base.output {
            Some(path) => match fs::write(path, output) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    report(&format!("unable to write '{}': {e}", path.display()));

                    ExitCode::FAILURE
                }
            },
            None => {
                print!("{output}");

                ExitCode::SUCCESS
            }
        },
        Err(message) => {
            report(&message);

            ExitCode::FAILURE
        }
    }
}

fn init_logging(base: &BaseOptions) {
    let mut builder = env_logger::Builder::from_default_env();

    if base.verbose {
        builder.filter_level(LevelFilter::Debug);
    }

    builder.init();
}

fn report(message: &str) {
    let error = Red.bold().paint("error:");

    eprintln!("{error} {}", White.bold().paint(message));
}

fn compile_file(path: &Path, options: &CompileOptions, emit_ir: bool) -> Result<String, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("unable to read '{}': {e}", path.display()))?;
    let program: Program = serde_json::from_str(&source)
        .map_err(|e| format!("'{}' is not a valid program: {e}", path.display()))?;

    let mut module = lower_program(&program);

    garnet::run_pipeline(&mut module, options);

    if emit_ir {
        return Ok(module.to_string());
    }

    emit_module(&module)
        .map(|program| program.to_string())
        .map_err(|e| e.to_string())
}
