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
use std::fmt;
use std::fmt::{Display, Formatter};

/// The condition of a `jcc`/`setcc`.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Cond {
    E,
    NE,
    L,
    LE,
    G,
    GE,
}

impl Cond {
    pub fn suffix(self) -> &'static str {
        match self {
            Cond::E => "e",
            Cond::NE => "ne",
            Cond::L => "l",
            Cond::LE => "le",
            Cond::G => "g",
            Cond::GE => "ge",
        }
    }
}

/// A two-operand ALU instruction.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum AluOp {
    Add,
    Sub,
    Imul,
    Cmp,
    Xor,
    Test,
}

impl AluOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Imul => "imul",
            AluOp::Cmp => "cmp",
            AluOp::Xor => "xor",
            AluOp::Test => "test",
        }
    }
}

/// Where an instruction operand lives.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    /// `qword [rbp + offset]`. Locals are at negative offsets, stack
    /// arguments at positive ones.
    Frame(i32),
    /// `qword [rel label]`, i.e. a global.
    Data(String),
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(value) => write!(f, "{value}"),
            Operand::Frame(offset) if *offset < 0 => write!(f, "qword [rbp - {}]", -offset),
            Operand::Frame(offset) => write!(f, "qword [rbp + {offset}]"),
            Operand::Data(label) => write!(f, "qword [rel {label}]"),
        }
    }
}

/// One line of the text section.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum AsmInst {
    /// A local jump target, `.L<n>:`.
    Label(String),
    Mov(Operand, Operand),
    /// Loads the address of a read-only label.
    Lea(Reg, String),
    Alu(AluOp, Operand, Operand),
    Neg(Reg),
    Cqo,
    Idiv(Reg),
    /// `setcc` into the low byte of the register, then zero extends it.
    Set(Cond, Reg),
    Push(Operand),
    Pop(Reg),
    Jmp(String),
    Jcc(Cond, String),
    Call(String),
    Ret,
    Comment(String),
}

/// The low byte of `reg`, for `setcc`.
fn byte_name(reg: Reg) -> &'static str {
    match reg {
        Reg::Rax => "al",
        Reg::Rbx => "bl",
        Reg::Rcx => "cl",
        Reg::Rdx => "dl",
        Reg::Rsi => "sil",
        Reg::Rdi => "dil",
        Reg::Rbp => "bpl",
        Reg::Rsp => "spl",
        Reg::R8 => "r8b",
        Reg::R9 => "r9b",
        Reg::R10 => "r10b",
        Reg::R11 => "r11b",
        Reg::R12 => "r12b",
        Reg::R13 => "r13b",
        Reg::R14 => "r14b",
        Reg::R15 => "r15b",
    }
}

impl Display for AsmInst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Label(name) => write!(f, "{name}:"),
            AsmInst::Mov(dest, src) => write!(f, "    mov {dest}, {src}"),
            AsmInst::Lea(dest, label) => write!(f, "    lea {dest}, [rel {label}]"),
            AsmInst::Alu(op, lhs, rhs) => write!(f, "    {} {lhs}, {rhs}", op.mnemonic()),
            AsmInst::Neg(reg) => write!(f, "    neg {reg}"),
            AsmInst::Cqo => write!(f, "    cqo"),
            AsmInst::Idiv(reg) => write!(f, "    idiv {reg}"),
            AsmInst::Set(cond, reg) => write!(
                f,
                "    set{} {}\n    movzx {reg}, {}",
                cond.suffix(),
                byte_name(*reg),
                byte_name(*reg)
            ),
            AsmInst::Push(op) => write!(f, "    push {op}"),
            AsmInst::Pop(reg) => write!(f, "    pop {reg}"),
            AsmInst::Jmp(label) => write!(f, "    jmp {label}"),
            AsmInst::Jcc(cond, label) => write!(f, "    j{} {label}", cond.suffix()),
            AsmInst::Call(target) => write!(f, "    call {target}"),
            AsmInst::Ret => write!(f, "    ret"),
            AsmInst::Comment(text) => write!(f, "    ; {text}"),
        }
    }
}

/// The code for one method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsmFunction {
    pub name: String,
    pub body: Vec<AsmInst>,
}

/// A string literal in the read-only section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsmString {
    pub label: String,
    pub text: String,
}

/// A complete assembly program, ready to be printed as NASM.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsmProgram {
    /// Every external symbol called, sorted and without duplicates.
    pub externs: Vec<String>,
    /// Labels of the 8-byte global slots, in declaration order.
    pub data: Vec<String>,
    pub rodata: Vec<AsmString>,
    pub text: Vec<AsmFunction>,
}

impl AsmProgram {
    /// Finds a method's code by name.
    pub fn function(&self, name: &str) -> Option<&AsmFunction> {
        self.text.iter().find(|func| func.name == name)
    }
}

/// Escapes `text` for a NASM backquoted string.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }

    out
}

impl Display for AsmProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for name in self.externs.iter() {
            writeln!(f, "extern {name}")?;
        }

        writeln!(f)?;
        writeln!(f, "section .data")?;

        for label in self.data.iter() {
            writeln!(f, "{label}:")?;
            writeln!(f, "    dq 0")?;
        }

        writeln!(f)?;
        writeln!(f, "section .rodata")?;

        for s in self.rodata.iter() {
            writeln!(f, "{}:", s.label)?;
            writeln!(f, "    db `{}`,0", escape(&s.text))?;
        }

        writeln!(f)?;
        writeln!(f, "section .text")?;

        for func in self.text.iter() {
            writeln!(f)?;
            writeln!(f, "    global {}", func.name)?;
            writeln!(f, "{}:", func.name)?;

            for inst in func.body.iter() {
                writeln!(f, "{inst}")?;
            }
        }

        Ok(())
    }
}
