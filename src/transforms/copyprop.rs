//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{solve, ControlFlowGraph, DataflowAnalysis, Direction};
use crate::ir::{Block, Inst, InstData, Loc, LocationData, MethodBody};
use crate::pass::MethodTransformPass;
use log::debug;
use std::collections::BTreeMap;

/// Copies still valid at a program point: `dest -> src` means `dest` was
/// last written with the value of `src`, and neither has changed since.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Copies {
    copies: BTreeMap<Loc, Loc>,
}

impl Copies {
    /// What a read of `loc` can read instead.
    pub fn replacement(&self, loc: Loc) -> Option<Loc> {
        self.copies.get(&loc).copied()
    }

    fn kill(&mut self, loc: Loc) {
        self.copies.retain(|&dest, &mut src| dest != loc && src != loc);
    }

    fn kill_globals(&mut self, body: &MethodBody) {
        self.copies.retain(|_, &mut src| !body.loc(src).is_global());
    }
}

struct CopyPropagation;

impl CopyPropagation {
    /// Moves `state` over one statement, optionally collecting the loads that
    /// can be redirected.
    fn step(body: &MethodBody, stmt: Inst, state: &mut Copies, rewrites: Option<&mut Vec<(Inst, Loc)>>) {
        if let Some(rewrites) = rewrites {
            for (inst, loc) in body.reads(stmt) {
                if !matches!(body.data(inst), InstData::Load { .. }) {
                    continue;
                }

                if let Some(src) = state.replacement(loc) {
                    rewrites.push((inst, src));
                }
            }
        }

        if body.contains_call(stmt) {
            state.kill_globals(body);
        }

        let InstData::Save { value, dest } = *body.data(stmt) else {
            return;
        };

        // reads are redirected before the definition, so `x = y` followed by
        // `y = x` must not record `y -> y`
        let src = match body.data(value) {
            InstData::Load { src } => Some(state.replacement(*src).unwrap_or(*src)),
            _ => None,
        };

        state.kill(dest);

        if let Some(src) = src {
            let is_str = matches!(body.loc(src), LocationData::Str(_));

            if src != dest && !is_str && body.loc(dest).is_allocatable() {
                state.copies.insert(dest, src);
            }
        }
    }
}

impl DataflowAnalysis for CopyPropagation {
    type State = Copies;

    const DIRECTION: Direction = Direction::Forward;

    fn initial(&mut self, _: &MethodBody) -> Copies {
        Copies::default()
    }

    fn bottom(&mut self, _: &MethodBody) -> Copies {
        Copies::default()
    }

    fn join(&mut self, into: &mut Copies, other: &Copies) {
        into.copies
            .retain(|dest, src| other.copies.get(dest) == Some(src));
    }

    fn transfer(&mut self, body: &MethodBody, block: Block, input: &Copies) -> Copies {
        let mut state = input.clone();

        for stmt in body.layout().insts_in_block(block) {
            Self::step(body, stmt, &mut state, None);
        }

        state
    }
}

/// Redirects loads of locations that hold a copy of something else to the
/// original. Returns how many loads were redirected.
///
/// The copies themselves are left in place, dead-code elimination removes
/// the ones nothing reads anymore.
pub fn propagate_copies(body: &mut MethodBody) -> usize {
    let cfg = ControlFlowGraph::compute(body);
    let solution = solve(body, &cfg, &mut CopyPropagation);
    let mut rewrites = Vec::new();

    for block in body.layout().blocks() {
        let mut state = solution.input(block).clone();

        for stmt in body.layout().insts_in_block(block) {
            CopyPropagation::step(body, stmt, &mut state, Some(&mut rewrites));
        }
    }

    for &(load, src) in rewrites.iter() {
        if let InstData::Load { src: old } = body.data_mut(load) {
            debug!("copyprop: {load:?} reads {src:?} instead of {old:?}");

            *old = src;
        }
    }

    rewrites.len()
}

/// Copy propagation as a pass.
pub struct CopyPropagationPass;

impl MethodTransformPass for CopyPropagationPass {
    fn name(&self) -> &'static str {
        "copy-prop"
    }

    fn run(&mut self, body: &mut MethodBody) -> bool {
        propagate_copies(body) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assert_fixpoint;
    use crate::ir::{BinaryOp, MethodBuilder};
    use crate::lower::lower_program;
    use crate::lower::tests::loops_with_calls;
    use crate::utility::StringPool;

    fn loads_of(body: &MethodBody, loc: Loc) -> usize {
        body.layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .flat_map(|stmt| body.reads(stmt))
            .filter(|&(_, l)| l == loc)
            .count()
    }

    #[test]
    fn chained_copies_read_the_original() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let x = b.local(strings.insert("x"));
        let y = b.local(strings.insert("y"));
        let z = b.local(strings.insert("z"));

        b.copy(a, x);
        b.copy(x, y);
        let sum = b.binary(BinaryOp::Add, y, x);
        b.save(sum, z);
        b.ret(Some(z));

        let mut body = b.finish();

        assert_eq!(propagate_copies(&mut body), 3);
        assert_eq!(loads_of(&body, x), 0);
        assert_eq!(loads_of(&body, y), 0);
        assert_eq!(loads_of(&body, a), 4);
    }

    #[test]
    fn redefinition_of_source_stops_propagation() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let x = b.local(strings.insert("x"));
        let one = b.constant(1);

        b.copy(a, x);
        b.copy(one, a);
        b.ret(Some(x));

        let mut body = b.finish();

        assert_eq!(propagate_copies(&mut body), 0);
        assert_eq!(loads_of(&body, x), 1);
    }

    #[test]
    fn copies_must_agree_at_merges() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let p = b.param(strings.insert("p"));
        let x = b.local(strings.insert("x"));
        let one = b.constant(1);
        let two = b.constant(2);
        let otherwise = b.new_label();
        let join = b.new_label();

        b.branch_if_zero(p, otherwise);
        b.copy(one, x);
        b.jump(join);
        b.label(otherwise);
        b.copy(two, x);
        b.label(join);
        b.ret(Some(x));

        let mut body = b.finish();

        assert_eq!(propagate_copies(&mut body), 0);
    }

    #[test]
    fn calls_invalidate_copies_of_globals() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let g = b.global(strings.insert("g"));
        let x = b.local(strings.insert("x"));

        b.copy(g, x);
        let call = b.call(strings.insert("h"), &[], false);
        b.call_stmt(call);
        b.ret(Some(x));

        let mut body = b.finish();

        assert_eq!(propagate_copies(&mut body), 0);
    }

    #[test]
    fn solution_is_a_fixpoint_on_loops_with_calls() {
        let module = lower_program(&loops_with_calls());

        for body in module.methods() {
            let cfg = ControlFlowGraph::compute(body);

            assert_fixpoint(body, &cfg, &mut CopyPropagation);
        }
    }
}
