//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Graph-coloring register allocation over def-use webs.
//!
//! Allocation works on one method at a time:
//!
//! 1. [`Liveness`] gives the reads every definition reaches.
//! 2. [`Webs`] groups definitions that share a read into one value.
//! 3. [`InterferenceGraph`] records which webs are live at the same time,
//!    and which webs are live across each call.
//! 4. [`color`] assigns palette registers by simplify/select.
//!
//! Colored webs get every one of their accesses bound in the method's
//! [`RegisterBindings`](crate::ir::RegisterBindings). Anything uncolored
//! just lives in its stack slot, so there is no spill code to insert.
//! Calls additionally get told which caller-saved registers to preserve.

mod coloring;
mod interference;
mod webs;

pub use coloring::*;
pub use interference::*;
pub use webs::*;

use crate::analysis::{ControlFlowGraph, Liveness};
use crate::codegen::x86_64::{is_allocatable, Reg};
use crate::ir::{InstData, MethodBody};
use crate::pass::MethodTransformPass;
use log::{debug, warn};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// What a single run of allocation did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationSummary {
    /// Every web of the method, def-less ones included.
    pub webs: usize,
    /// Webs that ended up in a register.
    pub colored: usize,
    /// Webs that wanted a register but stayed on the stack.
    pub spilled: usize,
}

/// Allocates registers for `body` out of `palette`, replacing whatever
/// bindings the body had before.
///
/// Registers that emission relies on are dropped from the palette with a
/// warning, as are duplicates.
pub fn allocate_registers(body: &mut MethodBody, palette: &[Reg]) -> AllocationSummary {
    let palette = usable_palette(palette);

    body.registers_mut().clear();

    let cfg = ControlFlowGraph::compute(body);
    let liveness = Liveness::compute(body, &cfg);
    let webs = Webs::compute(body, &liveness);
    let graph = InterferenceGraph::compute(body, &liveness, &webs);
    let coloring = color(&graph, &webs, &palette);

    for (web, reg) in coloring.colors() {
        let data = &webs[web];
        let loc = data.loc();

        for inst in data.defs().chain(data.uses()) {
            body.registers_mut().bind(inst, loc, reg);
        }
    }

    for (call, live) in graph.live_across_calls() {
        let regs: BTreeSet<Reg> = live
            .iter()
            .filter_map(|&web| coloring.color(web))
            .filter(|reg| reg.is_caller_saved())
            .collect();

        if let InstData::Call { saved, .. } = body.data_mut(call) {
            *saved = regs.into_iter().collect::<SmallVec<_>>();
        }
    }

    let summary = AllocationSummary {
        webs: webs.len(),
        colored: coloring.colors().count(),
        spilled: coloring.spilled().count(),
    };

    debug!(
        "regalloc: {} webs, {} colored, {} spilled",
        summary.webs, summary.colored, summary.spilled
    );

    summary
}

fn usable_palette(palette: &[Reg]) -> Vec<Reg> {
    let mut out = Vec::with_capacity(palette.len());

    for &reg in palette {
        if !is_allocatable(reg) {
            warn!("register '{reg}' is reserved and can't be allocated, ignoring it");
        } else if out.contains(&reg) {
            debug!("register '{reg}' is in the palette twice");
        } else {
            out.push(reg);
        }
    }

    out
}

/// Runs [`allocate_registers`] as a pass. Always reports a change, since
/// the bindings are rebuilt from scratch.
pub struct RegisterAllocationPass {
    palette: Vec<Reg>,
}

impl RegisterAllocationPass {
    pub fn new(palette: &[Reg]) -> Self {
        Self {
            palette: palette.to_vec(),
        }
    }
}

impl MethodTransformPass for RegisterAllocationPass {
    fn name(&self) -> &'static str {
        "regalloc"
    }

    fn run(&mut self, body: &mut MethodBody) -> bool {
        allocate_registers(body, &self.palette);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::x86_64::DEFAULT_PALETTE;
    use crate::ir::{BinaryOp, Inst, MethodBuilder};
    use crate::utility::StringPool;

    fn accesses_of(body: &MethodBody, reg: Reg) -> Vec<Inst> {
        body.registers()
            .iter()
            .filter(|&(_, _, r)| r == reg)
            .map(|(inst, _, _)| inst)
            .collect()
    }

    #[test]
    fn every_access_of_a_colored_web_is_bound() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let x = b.local(strings.insert("x"));
        let one = b.constant(1);
        let def = b.copy(one, x);
        let sum = b.binary(BinaryOp::Add, x, x);
        let sum_save = b.save(sum, x);

        b.ret(Some(x));

        let mut body = b.finish();
        let summary = allocate_registers(&mut body, &DEFAULT_PALETTE);

        assert_eq!(summary.spilled, 0);
        assert_eq!(summary.colored, 2);

        let reg = body.registers().get(def, x).unwrap();
        let InstData::Binary { lhs, rhs, .. } = *body.data(body.data(sum_save).operands()[0]) else {
            panic!("expected the sum to stay a binary");
        };

        // the definition plus both operand loads, then the second value of x
        // and the read in the return
        assert_eq!(body.registers().get(lhs, x), Some(reg));
        assert_eq!(body.registers().get(rhs, x), Some(reg));
        assert_eq!(body.registers().len(), 5);
        assert!(accesses_of(&body, reg).len() >= 3);
        assert_eq!(body.registers().callee_saved().count(), 1);
    }

    #[test]
    fn reserved_registers_are_dropped_from_the_palette() {
        assert_eq!(
            usable_palette(&[Reg::Rax, Reg::R12, Reg::R10, Reg::R12, Reg::Rbx]),
            vec![Reg::R12, Reg::Rbx]
        );
    }

    #[test]
    fn caller_saved_colors_live_across_calls_are_recorded() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let r = b.local(strings.insert("r"));
        let call = b.call(strings.insert("g"), &[a], false);

        b.save(call, r);

        let sum = b.binary(BinaryOp::Add, a, r);

        b.save(sum, r);
        b.ret(Some(r));

        let mut body = b.finish();

        allocate_registers(&mut body, &[Reg::Rsi, Reg::Rcx]);

        let InstData::Call { saved, .. } = body.data(call) else {
            panic!("call record was replaced");
        };

        assert_eq!(saved.len(), 1);
        assert!(saved[0].is_caller_saved());
        assert!(body.registers().callee_saved().next().is_none());
    }

    #[test]
    fn callee_saved_palette_needs_no_call_saves() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let r = b.local(strings.insert("r"));
        let call = b.call(strings.insert("g"), &[a], false);

        b.save(call, r);

        let sum = b.binary(BinaryOp::Add, a, r);

        b.save(sum, r);
        b.ret(Some(r));

        let mut body = b.finish();
        let mut pass = RegisterAllocationPass::new(&DEFAULT_PALETTE);

        assert!(pass.run(&mut body));

        let InstData::Call { saved, .. } = body.data(call) else {
            panic!("call record was replaced");
        };

        assert!(saved.is_empty());
        assert!(body.registers().callee_saved().count() >= 1);
    }

    #[test]
    fn allocating_twice_gives_the_same_bindings() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let x = b.local(strings.insert("x"));
        let y = b.local(strings.insert("y"));
        let two = b.constant(2);

        b.copy(two, x);

        let sum = b.binary(BinaryOp::Mul, x, x);

        b.save(sum, y);
        b.ret(Some(y));

        let mut body = b.finish();

        allocate_registers(&mut body, &DEFAULT_PALETTE);

        let first = body.registers().clone();

        allocate_registers(&mut body, &DEFAULT_PALETTE);

        assert_eq!(&first, body.registers());
    }
}
