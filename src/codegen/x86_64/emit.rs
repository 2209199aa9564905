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
use crate::codegen::x86_64::*;
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOp, Inst, InstData, Label, Loc, LocationData, MethodBody, Module, UnaryOp};
use crate::utility::StringPool;
use log::debug;

/// The process-exit routine that `Exit` records call.
pub const EXIT_ROUTINE: &str = "exit";

/// Emits every method of `module` into one program.
///
/// Every global of the module gets its data slot before any method is
/// emitted, so methods can refer to globals declared after them.
pub fn emit_module(module: &Module) -> CompileResult<AsmProgram> {
    let mut session = Session::new();
    let strings = module.strings();

    for &global in module.globals() {
        session.declare_global(&strings[global]);
    }

    let mut text = Vec::with_capacity(module.methods().len());

    for body in module.methods() {
        text.push(emit_method(body, strings, &mut session)?);
    }

    Ok(session.finish(text))
}

/// Emits a single method, adding whatever data it needs to `session`.
///
/// Locations resolve per access: a register binding wins, then the
/// location's stack slot, data label, immediate or string label.
pub fn emit_method(
    body: &MethodBody,
    strings: &StringPool,
    session: &mut Session,
) -> CompileResult<AsmFunction> {
    let name = strings[body.name()].to_owned();
    let mut emitter = MethodEmitter {
        body,
        strings,
        session,
        frame: Frame::compute(body),
        scratch: ScratchPool::new(),
        callee_saved: body.registers().callee_saved().collect(),
        out: Vec::new(),
        name,
    };

    debug!(
        "emit: '{}' has {} stack slots, saves {:?}",
        emitter.name,
        emitter.frame.len(),
        emitter.callee_saved
    );

    emitter.prologue();

    for block in body.layout().blocks() {
        for stmt in body.layout().insts_in_block(block) {
            emitter.statement(stmt)?;
            emitter.scratch.reset();
        }
    }

    // falling off the end is a void return
    let falls_off = body
        .layout()
        .blocks()
        .last()
        .and_then(|block| body.layout().block_last_inst(block))
        .map_or(true, |inst| !body.data(inst).is_terminator());

    if falls_off {
        emitter.out.push(xor_self(Reg::Rax));
        emitter.epilogue();
    }

    Ok(AsmFunction {
        name: emitter.name,
        body: emitter.out,
    })
}

fn xor_self(reg: Reg) -> AsmInst {
    AsmInst::Alu(AluOp::Xor, Operand::Reg(reg), Operand::Reg(reg))
}

fn label_name(label: Label) -> String {
    format!(".L{}", label.index())
}

struct MethodEmitter<'a> {
    body: &'a MethodBody,
    strings: &'a StringPool,
    session: &'a mut Session,
    frame: Frame,
    scratch: ScratchPool,
    callee_saved: Vec<Reg>,
    out: Vec<AsmInst>,
    name: String,
}

impl<'a> MethodEmitter<'a> {
    fn prologue(&mut self) {
        let size = self.frame.allocation_size(self.callee_saved.len());

        self.out.push(AsmInst::Push(Operand::Reg(Reg::Rbp)));
        self.out
            .push(AsmInst::Mov(Operand::Reg(Reg::Rbp), Operand::Reg(Reg::Rsp)));

        if size > 0 {
            self.out.push(AsmInst::Alu(
                AluOp::Sub,
                Operand::Reg(Reg::Rsp),
                Operand::Imm(size as i64),
            ));
        }

        for (offset, reg) in self.frame.register_params().zip(ARG_REGS) {
            self.out
                .push(AsmInst::Mov(Operand::Frame(offset), Operand::Reg(reg)));
        }

        for &reg in self.callee_saved.iter() {
            self.out.push(AsmInst::Push(Operand::Reg(reg)));
        }
    }

    fn epilogue(&mut self) {
        for &reg in self.callee_saved.iter().rev() {
            self.out.push(AsmInst::Pop(reg));
        }

        self.out
            .push(AsmInst::Mov(Operand::Reg(Reg::Rsp), Operand::Reg(Reg::Rbp)));
        self.out.push(AsmInst::Pop(Reg::Rbp));
        self.out.push(AsmInst::Ret);
    }

    fn malformed(&self, reason: impl Into<String>) -> CompileError {
        CompileError::MalformedInstruction {
            method: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn scratch(&mut self) -> CompileResult<Reg> {
        self.scratch
            .take()
            .ok_or_else(|| CompileError::ScratchExhausted {
                method: self.name.clone(),
            })
    }

    fn statement(&mut self, stmt: Inst) -> CompileResult<()> {
        let body = self.body;

        match body.data(stmt) {
            InstData::Save { value, dest } => {
                let value = self.value(*value)?;

                self.store(stmt, *dest, value)
            }
            InstData::Call { .. } => self.call(stmt, false).map(|_| ()),
            InstData::Use { .. } => Ok(()),
            InstData::Label(label) => {
                self.out.push(AsmInst::Label(label_name(*label)));

                Ok(())
            }
            InstData::Jump { target } => {
                self.out.push(AsmInst::Jmp(label_name(*target)));

                Ok(())
            }
            InstData::Branch { cond, target } => {
                let cond = self.value(*cond)?;

                self.scratch.release(cond);
                self.out
                    .push(AsmInst::Alu(AluOp::Cmp, Operand::Reg(cond), Operand::Imm(0)));
                self.out.push(AsmInst::Jcc(Cond::E, label_name(*target)));

                Ok(())
            }
            InstData::Return { value } => {
                match value {
                    Some(value) => {
                        let reg = self.value(*value)?;

                        self.scratch.release(reg);
                        self.out
                            .push(AsmInst::Mov(Operand::Reg(Reg::Rax), Operand::Reg(reg)));
                    }
                    None => self.out.push(xor_self(Reg::Rax)),
                }

                self.epilogue();

                Ok(())
            }
            InstData::Exit { code } => {
                self.session.add_extern(EXIT_ROUTINE);
                self.out.push(xor_self(Reg::Rax));
                self.out.push(AsmInst::Mov(
                    Operand::Reg(Reg::Rdi),
                    Operand::Imm(i64::from(*code)),
                ));
                self.out.push(AsmInst::Call(EXIT_ROUTINE.to_owned()));

                Ok(())
            }
            data => Err(self.malformed(format!("value record {data:?} used as a statement"))),
        }
    }

    /// Evaluates a value tree into a register. The register belongs to the
    /// scratch pool unless the value was a read of a colored location.
    fn value(&mut self, inst: Inst) -> CompileResult<Reg> {
        let body = self.body;

        match body.data(inst) {
            InstData::Load { src } => self.read(inst, *src),
            InstData::Param { index } => {
                let offset = self
                    .frame
                    .param(*index)
                    .ok_or_else(|| self.malformed(format!("read of undeclared parameter {index}")))?;
                let out = self.scratch()?;

                self.out
                    .push(AsmInst::Mov(Operand::Reg(out), Operand::Frame(offset)));

                Ok(out)
            }
            InstData::Binary { op, lhs, rhs } => {
                let lhs = self.value(*lhs)?;
                let rhs = self.value(*rhs)?;

                self.scratch.release(lhs);
                self.scratch.release(rhs);
                self.binary(*op, lhs, rhs)
            }
            InstData::Unary { op, operand } => {
                let operand = self.value(*operand)?;

                self.scratch.release(operand);

                let out = self.scratch()?;

                match op {
                    UnaryOp::Neg => {
                        if out != operand {
                            self.out
                                .push(AsmInst::Mov(Operand::Reg(out), Operand::Reg(operand)));
                        }

                        self.out.push(AsmInst::Neg(out));
                    }
                    UnaryOp::Not => {
                        self.out
                            .push(AsmInst::Alu(AluOp::Cmp, Operand::Reg(operand), Operand::Imm(0)));
                        self.out.push(AsmInst::Set(Cond::E, out));
                    }
                }

                Ok(out)
            }
            InstData::Call { .. } => self
                .call(inst, true)?
                .ok_or_else(|| self.malformed("call produced no result")),
            data => Err(self.malformed(format!("{data:?} doesn't produce a value"))),
        }
    }

    // inputs are already released, so `out` may be one of them
    fn binary(&mut self, op: BinaryOp, lhs: Reg, rhs: Reg) -> CompileResult<Reg> {
        let cond = match op {
            BinaryOp::Eq => Some(Cond::E),
            BinaryOp::Ne => Some(Cond::NE),
            BinaryOp::Lt => Some(Cond::L),
            BinaryOp::Le => Some(Cond::LE),
            BinaryOp::Gt => Some(Cond::G),
            BinaryOp::Ge => Some(Cond::GE),
            _ => None,
        };

        if let Some(cond) = cond {
            self.out
                .push(AsmInst::Alu(AluOp::Cmp, Operand::Reg(lhs), Operand::Reg(rhs)));

            let out = self.scratch()?;

            self.out.push(AsmInst::Set(cond, out));

            return Ok(out);
        }

        if matches!(op, BinaryOp::Div | BinaryOp::Mod) {
            self.out
                .push(AsmInst::Mov(Operand::Reg(Reg::Rax), Operand::Reg(lhs)));
            self.out.push(AsmInst::Cqo);
            self.out.push(AsmInst::Idiv(rhs));

            let out = self.scratch()?;
            let result = if op == BinaryOp::Div { Reg::Rax } else { Reg::Rdx };

            self.out
                .push(AsmInst::Mov(Operand::Reg(out), Operand::Reg(result)));

            return Ok(out);
        }

        let alu = match op {
            BinaryOp::Add => AluOp::Add,
            BinaryOp::Sub => AluOp::Sub,
            _ => AluOp::Imul,
        };

        let out = self.scratch()?;

        if out == rhs && out != lhs {
            // `mov out, lhs` would clobber rhs
            if alu == AluOp::Sub {
                self.out.push(AsmInst::Neg(out));
                self.out
                    .push(AsmInst::Alu(AluOp::Add, Operand::Reg(out), Operand::Reg(lhs)));
            } else {
                self.out
                    .push(AsmInst::Alu(alu, Operand::Reg(out), Operand::Reg(lhs)));
            }

            return Ok(out);
        }

        if out != lhs {
            self.out
                .push(AsmInst::Mov(Operand::Reg(out), Operand::Reg(lhs)));
        }

        self.out
            .push(AsmInst::Alu(alu, Operand::Reg(out), Operand::Reg(rhs)));

        Ok(out)
    }

    /// Gets the value of `loc` as read by `inst` into a register.
    fn read(&mut self, inst: Inst, loc: Loc) -> CompileResult<Reg> {
        if let Some(reg) = self.body.registers().get(inst, loc) {
            return Ok(reg);
        }

        let data = self.body.loc(loc);

        if let LocationData::Str(s) = data {
            let label = self.session.intern_string(&self.strings[s]).to_owned();
            let out = self.scratch()?;

            self.out.push(AsmInst::Lea(out, label));

            return Ok(out);
        }

        let src = self.storage(inst, loc)?;
        let out = self.scratch()?;

        self.out.push(AsmInst::Mov(Operand::Reg(out), src));

        Ok(out)
    }

    /// Writes `value` into `dest` for the save `stmt`, then releases it.
    fn store(&mut self, stmt: Inst, dest: Loc, value: Reg) -> CompileResult<()> {
        if !self.body.loc(dest).is_writable() {
            return Err(self.malformed(format!("save into read-only {:?}", self.body.loc(dest))));
        }

        let dest = self.storage(stmt, dest)?;

        self.scratch.release(value);

        if dest != Operand::Reg(value) {
            self.out.push(AsmInst::Mov(dest, Operand::Reg(value)));
        }

        Ok(())
    }

    /// Where the access of `loc` by `inst` lives, for everything except
    /// strings (which are addresses, not storage).
    fn storage(&self, inst: Inst, loc: Loc) -> CompileResult<Operand> {
        if let Some(reg) = self.body.registers().get(inst, loc) {
            return Ok(Operand::Reg(reg));
        }

        match self.body.loc(loc) {
            LocationData::Local { .. } | LocationData::Temp => self
                .frame
                .slot(loc)
                .map(Operand::Frame)
                .ok_or_else(|| CompileError::MissingAllocation {
                    method: self.name.clone(),
                    loc: format!("{loc:?}"),
                }),
            LocationData::Global { name } => {
                let name = &self.strings[name];

                self.session
                    .global(name)
                    .map(|label| Operand::Data(label.to_owned()))
                    .ok_or_else(|| CompileError::UnresolvedLocation {
                        method: self.name.clone(),
                        loc: format!("global '{name}'"),
                    })
            }
            LocationData::Constant(value) => Ok(Operand::Imm(value)),
            LocationData::Str(_) => Err(self.malformed("string literal used as storage")),
        }
    }

    /// Emits a call, following System V: the first six arguments in
    /// registers, the rest pushed right to left.
    ///
    /// Registers in the call's `saved` list are pushed before the arguments
    /// are set up and popped once the callee returns. Arguments are pushed
    /// and then popped into place so that no argument register is
    /// overwritten before it has been read.
    fn call(&mut self, inst: Inst, wants_result: bool) -> CompileResult<Option<Reg>> {
        let body = self.body;
        let InstData::Call {
            target,
            args,
            external,
            saved,
        } = body.data(inst)
        else {
            return Err(self.malformed("expected a call"));
        };

        let target = self.strings[*target].to_owned();
        let in_registers = args.len().min(ARG_REGS.len());
        let on_stack = args.len() - in_registers;
        let padded = (saved.len() + on_stack) % 2 == 1;

        for &reg in saved.iter() {
            self.out.push(AsmInst::Push(Operand::Reg(reg)));
        }

        if padded {
            self.out
                .push(AsmInst::Alu(AluOp::Sub, Operand::Reg(Reg::Rsp), Operand::Imm(8)));
        }

        for &arg in args[in_registers..].iter().rev() {
            let reg = self.read(inst, arg)?;

            self.scratch.release(reg);
            self.out.push(AsmInst::Push(Operand::Reg(reg)));
        }

        for &arg in args[..in_registers].iter() {
            let reg = self.read(inst, arg)?;

            self.scratch.release(reg);
            self.out.push(AsmInst::Push(Operand::Reg(reg)));
        }

        for &reg in ARG_REGS[..in_registers].iter().rev() {
            self.out.push(AsmInst::Pop(reg));
        }

        if *external {
            self.session.add_extern(&target);
            self.out.push(xor_self(Reg::Rax));
        }

        self.out.push(AsmInst::Call(target));

        let cleanup = (on_stack + usize::from(padded)) as i64 * 8;

        if cleanup > 0 {
            self.out.push(AsmInst::Alu(
                AluOp::Add,
                Operand::Reg(Reg::Rsp),
                Operand::Imm(cleanup),
            ));
        }

        for &reg in saved.iter().rev() {
            self.out.push(AsmInst::Pop(reg));
        }

        if !wants_result {
            return Ok(None);
        }

        let out = self.scratch()?;

        self.out
            .push(AsmInst::Mov(Operand::Reg(out), Operand::Reg(Reg::Rax)));

        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::regalloc::allocate_registers;
    use crate::ir::MethodBuilder;

    fn lines(func: &AsmFunction) -> Vec<String> {
        func.body
            .iter()
            .flat_map(|inst| {
                inst.to_string()
                    .lines()
                    .map(|line| line.trim().to_owned())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn every_kind_of_storage_resolves() {
        let mut module = Module::new();
        let g = module.intern("g");
        let hello = module.intern("hello %d\n");
        let printf = module.intern("printf");
        let mut b = MethodBuilder::new(module.intern("main"));
        let x = b.local(module.intern("x"));
        let gl = b.global(g);
        let s = b.string(hello);
        let five = b.constant(5);

        b.copy(five, x);
        b.copy(x, gl);

        let call = b.call(printf, &[s, gl], true);

        b.call_stmt(call);
        b.ret(None);

        module.add_global(g);
        module.add_method(b.finish());

        let program = emit_module(&module).unwrap();
        let main = lines(program.function("main").unwrap());

        assert!(main.contains(&"mov r10, 5".to_owned()));
        assert!(main.contains(&"mov qword [rbp - 8], r10".to_owned()));
        assert!(main.contains(&"mov qword [rel field0], r10".to_owned()));
        assert!(main.contains(&"lea r10, [rel s_hellod0]".to_owned()));
        assert!(main.contains(&"call printf".to_owned()));
        assert_eq!(program.externs, vec!["printf"]);
        assert_eq!(program.data, vec!["field0"]);
    }

    #[test]
    fn undeclared_globals_are_an_error() {
        let mut module = Module::new();
        let g = module.intern("nowhere");
        let mut b = MethodBuilder::new(module.intern("main"));
        let gl = b.global(g);
        let one = b.constant(1);

        b.copy(one, gl);
        b.ret(None);
        module.add_method(b.finish());

        assert!(matches!(
            emit_module(&module),
            Err(CompileError::UnresolvedLocation { .. })
        ));
    }

    #[test]
    fn externs_are_declared_once_and_strings_get_unique_labels() {
        let mut module = Module::new();
        let printf = module.intern("printf");
        let a = module.intern("hello world");
        let c = module.intern("hello, world");
        let mut b = MethodBuilder::new(module.intern("main"));
        let sa = b.string(a);
        let sc = b.string(c);

        for s in [sa, sc, sa] {
            let call = b.call(printf, &[s], true);

            b.call_stmt(call);
        }

        b.exit(1);
        module.add_method(b.finish());

        let program = emit_module(&module).unwrap();
        let labels: Vec<_> = program.rodata.iter().map(|s| s.label.as_str()).collect();

        assert_eq!(program.externs, vec!["exit", "printf"]);
        assert_eq!(labels, vec!["s_hellowor0", "s_hellowor1"]);
    }

    #[test]
    fn exit_clears_rax_and_passes_the_code() {
        let mut module = Module::new();
        let mut b = MethodBuilder::new(module.intern("main"));

        b.exit(-2);
        module.add_method(b.finish());

        let program = emit_module(&module).unwrap();
        let main = lines(program.function("main").unwrap());
        let at = main.iter().position(|l| l == "call exit").unwrap();

        assert_eq!(main[at - 2], "xor rax, rax");
        assert_eq!(main[at - 1], "mov rdi, -2");
    }

    #[test]
    fn subtraction_into_the_rhs_register_negates_first() {
        let mut module = Module::new();
        let mut b = MethodBuilder::new(module.intern("f"));
        let a = b.local(module.intern("a"));
        let c = b.local(module.intern("c"));
        let x = b.local(module.intern("x"));
        let five = b.constant(5);
        let seven = b.constant(7);
        let def_a = b.copy(five, a);

        b.copy(seven, c);

        let diff = b.binary(BinaryOp::Sub, a, c);

        b.save(diff, x);
        b.ret(Some(x));

        let mut body = b.finish();
        let InstData::Binary { lhs, .. } = *body.data(diff) else {
            unreachable!()
        };

        body.registers_mut().bind(def_a, a, Reg::R12);
        body.registers_mut().bind(lhs, a, Reg::R12);
        module.add_method(body);

        let program = emit_module(&module).unwrap();
        let f = lines(program.function("f").unwrap());
        let at = f.iter().position(|l| l == "neg r10").unwrap();

        assert_eq!(f[at - 1], "mov r10, qword [rbp - 8]");
        assert_eq!(f[at + 1], "add r10, r12");
        assert!(f.contains(&"push r12".to_owned()));
        assert!(f.contains(&"pop r12".to_owned()));
    }

    #[test]
    fn saved_registers_wrap_the_call() {
        let mut module = Module::new();
        let mut b = MethodBuilder::new(module.intern("f"));
        let p = b.param(module.intern("p"));
        let r = b.local(module.intern("r"));
        let call = b.call(module.intern("g"), &[p], false);

        b.save(call, r);

        let sum = b.binary(BinaryOp::Add, p, r);

        b.save(sum, r);
        b.ret(Some(r));

        let mut body = b.finish();

        allocate_registers(&mut body, &[Reg::Rsi, Reg::Rcx]);
        module.add_method(body);

        let program = emit_module(&module).unwrap();
        let f = lines(program.function("f").unwrap());
        let call_at = f.iter().position(|l| l == "call g").unwrap();

        // one saved register: pushed, then padded back to alignment
        assert!(f[..call_at].iter().any(|l| l == "sub rsp, 8"));
        assert_eq!(f[call_at + 1], "add rsp, 8");
        assert!(f[call_at + 2].starts_with("pop r"));
        assert_eq!(f[call_at - 1], "pop rdi");
        assert_eq!(f[1], "mov rbp, rsp");
        assert_eq!(f[3], "mov qword [rbp - 8], rdi");
    }

    #[test]
    fn stack_arguments_are_pushed_right_to_left() {
        let mut module = Module::new();
        let mut b = MethodBuilder::new(module.intern("main"));
        let args: Vec<Loc> = (1..=7).map(|i| b.constant(i)).collect();
        let call = b.call(module.intern("seven"), &args, false);

        b.call_stmt(call);
        b.ret(None);
        module.add_method(b.finish());

        let program = emit_module(&module).unwrap();
        let main = lines(program.function("main").unwrap());
        let call_at = main.iter().position(|l| l == "call seven").unwrap();

        assert_eq!(main[2], "sub rsp, 8");
        assert_eq!(main[3], "mov r10, 7");
        assert_eq!(main[4], "push r10");
        assert_eq!(main[call_at - 1], "pop rdi");
        assert_eq!(main[call_at - 6], "pop r9");
        assert_eq!(main[call_at + 1], "add rsp, 16");
    }
}
