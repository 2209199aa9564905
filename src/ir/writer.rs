//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaKey;
use crate::ir::{Inst, InstData, Loc, LocationData, MethodBody};
use crate::utility::StringPool;
use std::fmt;
use std::fmt::{Display, Formatter, Write};

/// Renders a method body in a compact textual form for debugging and tests.
///
/// ```none
/// method f(x):
///   block0:
///     x = param 0
///     y = add x, $1
///     ret y
/// ```
///
/// Globals print as `@name`, temps as `%tN`, constants as `$N` and string
/// literals as `str"..."`. Register bindings print after the statement.
pub struct MethodWriter<'a> {
    body: &'a MethodBody,
    strings: &'a StringPool,
}

impl<'a> MethodWriter<'a> {
    pub fn new(body: &'a MethodBody, strings: &'a StringPool) -> Self {
        Self { body, strings }
    }

    fn loc(&self, f: &mut impl Write, loc: Loc) -> fmt::Result {
        match self.body.loc(loc) {
            LocationData::Global { name } => write!(f, "@{}", &self.strings[name]),
            LocationData::Local { name } => write!(f, "{}", &self.strings[name]),
            LocationData::Temp => write!(f, "%t{}", loc.index()),
            LocationData::Constant(value) => write!(f, "${value}"),
            LocationData::Str(s) => write!(f, "str{:?}", &self.strings[s]),
        }
    }

    fn value(&self, f: &mut impl Write, inst: Inst) -> fmt::Result {
        match self.body.data(inst) {
            InstData::Load { src } => self.loc(f, *src),
            InstData::Param { index } => write!(f, "param {index}"),
            InstData::Binary { op, lhs, rhs } => {
                write!(f, "{} ", op.mnemonic())?;
                self.value(f, *lhs)?;
                write!(f, ", ")?;
                self.value(f, *rhs)
            }
            InstData::Unary { op, operand } => {
                write!(f, "{} ", op.mnemonic())?;
                self.value(f, *operand)
            }
            InstData::Call {
                target,
                args,
                external,
                saved,
            } => {
                let kind = if *external { "callout" } else { "call" };

                write!(f, "{kind} {}(", &self.strings[*target])?;

                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }

                    self.loc(f, *arg)?;
                }

                write!(f, ")")?;

                if !saved.is_empty() {
                    let names: Vec<_> = saved.iter().map(|r| r.name()).collect();

                    write!(f, " saving [{}]", names.join(", "))?;
                }

                Ok(())
            }
            other => write!(f, "<not a value: {other:?}>"),
        }
    }

    fn stmt(&self, f: &mut impl Write, inst: Inst) -> fmt::Result {
        match self.body.data(inst) {
            InstData::Save { value, dest } => {
                self.loc(f, *dest)?;
                write!(f, " = ")?;
                self.value(f, *value)
            }
            InstData::Use { loc } => {
                write!(f, "use ")?;
                self.loc(f, *loc)
            }
            InstData::Call { .. } => self.value(f, inst),
            InstData::Label(label) => write!(f, "L{}:", label.index()),
            InstData::Jump { target } => write!(f, "jmp L{}", target.index()),
            InstData::Branch { cond, target } => {
                write!(f, "bz ")?;
                self.value(f, *cond)?;
                write!(f, ", L{}", target.index())
            }
            InstData::Return { value: Some(value) } => {
                write!(f, "ret ")?;
                self.value(f, *value)
            }
            InstData::Return { value: None } => write!(f, "ret"),
            InstData::Exit { code } => write!(f, "exit {code}"),
            other => write!(f, "<not a statement: {other:?}>"),
        }
    }

    fn bindings(&self, f: &mut impl Write, stmt: Inst) -> fmt::Result {
        let regs = self.body.registers();
        let mut accesses = self.body.reads(stmt);

        if let Some(dest) = self.body.data(stmt).def() {
            accesses.push((stmt, dest));
        }

        let mut first = true;

        for (inst, loc) in accesses {
            if let Some(reg) = regs.get(inst, loc) {
                write!(f, "{}", if first { "    ; " } else { ", " })?;
                self.loc(f, loc)?;
                write!(f, " -> {reg}")?;

                first = false;
            }
        }

        Ok(())
    }
}

impl Display for MethodWriter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "method {}(", &self.strings[self.body.name()])?;

        for (i, param) in self.body.params().iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }

            self.loc(f, *param)?;
        }

        writeln!(f, "):")?;

        let layout = self.body.layout();

        for block in layout.blocks() {
            writeln!(f, "  block{}:", block.index())?;

            for inst in layout.insts_in_block(block) {
                write!(f, "    ")?;
                self.stmt(f, inst)?;
                self.bindings(f, inst)?;
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, MethodBuilder};

    #[test]
    fn renders_statements() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let x = b.param(strings.insert("x"));
        let g = b.global(strings.insert("g"));
        let one = b.constant(1);
        let sum = b.binary(BinaryOp::Add, x, one);

        b.save(sum, g);
        b.ret(Some(g));

        let body = b.finish();
        let text = MethodWriter::new(&body, &strings).to_string();

        assert_eq!(
            text,
            "method f(x):\n  block0:\n    x = param 0\n    @g = add x, $1\n    ret @g\n"
        );
    }
}
