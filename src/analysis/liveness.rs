//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{solve, ControlFlowGraph, DataflowAnalysis, Direction, Solution};
use crate::arena::SecondaryMap;
use crate::ir::{Block, Inst, Loc, MethodBody};
use std::collections::{BTreeMap, BTreeSet};

/// For every live location, the reads that the value currently in it may
/// still reach.
///
/// Only locations that register allocation may color (locals and temps)
/// are tracked. Globals are observable outside the method and are always
/// treated as live by the passes that care.
pub type LiveState = BTreeMap<Loc, BTreeSet<Inst>>;

/// Moves `state` backwards over one statement: the definition is processed
/// first, then the statement's reads.
///
/// Returns the reads reached by the statement's definition, if it defines
/// a tracked location.
pub fn step_backward(body: &MethodBody, stmt: Inst, state: &mut LiveState) -> Option<BTreeSet<Inst>> {
    let reached = match body.data(stmt).def() {
        Some(dest) if body.loc(dest).is_allocatable() => Some(state.remove(&dest).unwrap_or_default()),
        _ => None,
    };

    for (inst, loc) in body.reads(stmt) {
        if body.loc(loc).is_allocatable() {
            state.entry(loc).or_default().insert(inst);
        }
    }

    reached
}

struct LiveReads;

impl DataflowAnalysis for LiveReads {
    type State = LiveState;

    const DIRECTION: Direction = Direction::Backward;

    fn initial(&mut self, _: &MethodBody) -> LiveState {
        LiveState::new()
    }

    fn bottom(&mut self, _: &MethodBody) -> LiveState {
        LiveState::new()
    }

    fn join(&mut self, into: &mut LiveState, other: &LiveState) {
        for (loc, reads) in other {
            into.entry(*loc).or_default().extend(reads.iter().copied());
        }
    }

    fn transfer(&mut self, body: &MethodBody, block: Block, input: &LiveState) -> LiveState {
        let mut state = input.clone();

        for stmt in body.layout().insts_in_block(block).rev() {
            step_backward(body, stmt, &mut state);
        }

        state
    }
}

/// Which reads every definition of a local or temp can reach.
#[derive(Clone, Debug)]
pub struct Liveness {
    solution: Solution<LiveState>,
    reached: SecondaryMap<Inst, BTreeSet<Inst>>,
}

impl Liveness {
    /// Solves liveness for `body`.
    pub fn compute(body: &MethodBody, cfg: &ControlFlowGraph) -> Self {
        let solution = solve(body, cfg, &mut LiveReads);
        let mut reached = SecondaryMap::new();

        for block in body.layout().blocks() {
            let mut state = solution.input(block).clone();

            for stmt in body.layout().insts_in_block(block).rev() {
                if let Some(reads) = step_backward(body, stmt, &mut state) {
                    reached.insert(stmt, reads);
                }
            }
        }

        Self { solution, reached }
    }

    /// The live state at the start of `block`.
    pub fn live_in(&self, block: Block) -> &LiveState {
        self.solution.output(block)
    }

    /// The live state at the end of `block`.
    pub fn live_out(&self, block: Block) -> &LiveState {
        self.solution.input(block)
    }

    /// The reads that the value written by `def` may reach. Empty for
    /// anything that doesn't define a tracked location.
    pub fn reached(&self, def: Inst) -> impl Iterator<Item = Inst> + '_ {
        self.reached.get(def).into_iter().flatten().copied()
    }

    /// Whether `def` writes a tracked location that nothing reads afterwards.
    pub fn is_dead(&self, def: Inst) -> bool {
        self.reached.get(def).map_or(false, BTreeSet::is_empty)
    }

    /// Every tracked definition with its reached reads.
    pub fn definitions(&self) -> impl Iterator<Item = (Inst, &BTreeSet<Inst>)> + '_ {
        self.reached.iter()
    }
}
