//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::ControlFlowGraph;
use crate::arena::{SecondaryMap, SecondarySet};
use crate::ir::{Block, MethodBody};
use log::trace;
use std::collections::VecDeque;
use std::fmt::Debug;

/// Which way facts flow through the control-flow graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// A block's input is the join of its predecessors' outputs.
    Forward,
    /// A block's input is the join of its successors' outputs.
    Backward,
}

/// A dataflow problem over the blocks of a method.
///
/// The state forms a lattice: `join` has to be commutative, associative and
/// idempotent, and `transfer` has to be monotone with respect to it, or
/// [`solve`] may not terminate.
///
/// `transfer` only computes. Passes that rewrite the IR do so in a separate
/// walk once [`solve`] has converged, using the final input of each block.
pub trait DataflowAnalysis {
    type State: Clone + Eq + Debug;

    /// Which way the analysis runs.
    const DIRECTION: Direction;

    /// The state flowing into the boundary of the method: the entry block
    /// for forward analyses, blocks without successors for backward ones.
    fn initial(&mut self, body: &MethodBody) -> Self::State;

    /// The state of a block that no fact reaches at all.
    fn bottom(&mut self, body: &MethodBody) -> Self::State;

    /// Merges `other` into `into`.
    fn join(&mut self, into: &mut Self::State, other: &Self::State);

    /// Computes the output of `block` given its input.
    fn transfer(&mut self, body: &MethodBody, block: Block, input: &Self::State) -> Self::State;
}

/// The converged states of every block.
///
/// For a backward analysis, "input" is still the state flowing into the
/// transfer function, i.e. the state at the *end* of the block.
#[derive(Clone, Debug)]
pub struct Solution<S> {
    inputs: SecondaryMap<Block, S>,
    outputs: SecondaryMap<Block, S>,
    iterations: usize,
}

impl<S> Solution<S> {
    /// The state flowing into `block`'s transfer function.
    pub fn input(&self, block: Block) -> &S {
        &self.inputs[block]
    }

    /// The state `block`'s transfer function produced.
    pub fn output(&self, block: Block) -> &S {
        &self.outputs[block]
    }

    /// How many times a transfer function was evaluated in total.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Runs `analysis` over `body` until no block's output changes.
///
/// Blocks start in reverse post-order (forward) or post-order (backward) on
/// a worklist. A neighbour that hasn't been evaluated yet contributes nothing
/// to a join, which is what lets loops start from an optimistic assumption.
/// Whenever a block's output changes, every block that reads it is queued
/// again.
pub fn solve<A: DataflowAnalysis>(
    body: &MethodBody,
    cfg: &ControlFlowGraph,
    analysis: &mut A,
) -> Solution<A::State> {
    let order: Vec<Block> = match A::DIRECTION {
        Direction::Forward => cfg.reverse_postorder().collect(),
        Direction::Backward => cfg.postorder().to_vec(),
    };

    let mut solution = Solution {
        inputs: SecondaryMap::new(),
        outputs: SecondaryMap::new(),
        iterations: 0,
    };

    let mut queued: SecondarySet<Block> = order.iter().copied().collect();
    let mut worklist: VecDeque<Block> = order.into_iter().collect();

    while let Some(block) = worklist.pop_front() {
        queued.remove(block);

        let input = join_inputs(body, cfg, analysis, &solution, block);
        let output = analysis.transfer(body, block, &input);

        solution.iterations += 1;
        solution.inputs.insert(block, input);

        if solution.outputs.get(block) == Some(&output) {
            continue;
        }

        trace!("dataflow: {block:?} changed to {output:?}");

        solution.outputs.insert(block, output);

        let dependents: Vec<Block> = match A::DIRECTION {
            Direction::Forward => cfg.successors(block).collect(),
            Direction::Backward => cfg.predecessors(block).collect(),
        };

        for dependent in dependents {
            if !queued.insert(dependent) {
                worklist.push_back(dependent);
            }
        }
    }

    solution
}

/// Recomputes the input of `block` from the outputs currently stored in
/// `solution`.
///
/// On a converged solution this reproduces [`Solution::input`], but it runs
/// `join` again, which lets an analysis act on the final merges only.
pub fn join_inputs<A: DataflowAnalysis>(
    body: &MethodBody,
    cfg: &ControlFlowGraph,
    analysis: &mut A,
    solution: &Solution<A::State>,
    block: Block,
) -> A::State {
    let (is_boundary, neighbours): (bool, Vec<Block>) = match A::DIRECTION {
        Direction::Forward => (cfg.entry() == Some(block), cfg.predecessors(block).collect()),
        Direction::Backward => {
            let succs: Vec<Block> = cfg.successors(block).collect();

            (succs.is_empty(), succs)
        }
    };

    let mut state = if is_boundary {
        Some(analysis.initial(body))
    } else {
        None
    };

    for neighbour in neighbours {
        let Some(output) = solution.outputs.get(neighbour) else {
            continue;
        };

        match state.as_mut() {
            Some(state) => analysis.join(state, output),
            None => state = Some(output.clone()),
        }
    }

    state.unwrap_or_else(|| analysis.bottom(body))
}
