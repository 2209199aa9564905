//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{step_backward, LiveState, Liveness};
use crate::codegen::regalloc::{Web, Webs};
use crate::ir::{Inst, InstData, MethodBody};
use std::collections::{BTreeMap, BTreeSet};

/// Which webs can't share a register, plus which webs have to survive each
/// call.
#[derive(Clone, Debug, Default)]
pub struct InterferenceGraph {
    edges: BTreeMap<Web, BTreeSet<Web>>,
    across_calls: BTreeMap<Inst, BTreeSet<Web>>,
}

impl InterferenceGraph {
    /// Builds the graph by walking every block backwards from its live-out
    /// state. At each definition, the defined web interferes with every web
    /// live right after it.
    pub fn compute(body: &MethodBody, liveness: &Liveness, webs: &Webs) -> Self {
        let mut graph = Self::default();

        for (web, _) in webs.iter() {
            graph.edges.insert(web, BTreeSet::new());
        }

        for block in body.layout().blocks() {
            let mut state = liveness.live_out(block).clone();

            for stmt in body.layout().insts_in_block(block).rev() {
                let defined = webs.web_of_def(stmt);
                let live = live_webs(&state, webs);

                if let Some(web) = defined {
                    for &other in live.iter() {
                        graph.add_edge(web, other);
                    }
                }

                if let Some(call) = call_in(body, stmt) {
                    let survivors = live.into_iter().filter(|&w| Some(w) != defined).collect();

                    graph.across_calls.insert(call, survivors);
                }

                step_backward(body, stmt, &mut state);
            }
        }

        graph
    }

    /// Records that `a` and `b` can't share a register. Self-edges are
    /// ignored.
    pub fn add_edge(&mut self, a: Web, b: Web) {
        if a == b {
            return;
        }

        self.edges.entry(a).or_default().insert(b);
        self.edges.entry(b).or_default().insert(a);
    }

    pub fn interferes(&self, a: Web, b: Web) -> bool {
        self.edges.get(&a).map_or(false, |n| n.contains(&b))
    }

    pub fn neighbors(&self, web: Web) -> impl Iterator<Item = Web> + '_ {
        self.edges.get(&web).into_iter().flatten().copied()
    }

    pub fn degree(&self, web: Web) -> usize {
        self.edges.get(&web).map_or(0, BTreeSet::len)
    }

    /// Every web in the graph, in key order.
    pub fn nodes(&self) -> impl Iterator<Item = Web> + '_ {
        self.edges.keys().copied()
    }

    /// The webs holding values that are needed after `call` returns, keyed
    /// by the call record.
    pub fn live_across_calls(&self) -> impl Iterator<Item = (Inst, &BTreeSet<Web>)> + '_ {
        self.across_calls.iter().map(|(&call, webs)| (call, webs))
    }
}

fn live_webs(state: &LiveState, webs: &Webs) -> BTreeSet<Web> {
    state
        .iter()
        .flat_map(|(&loc, reads)| reads.iter().filter_map(move |&read| webs.web_of_use(read, loc)))
        .collect()
}

fn call_in(body: &MethodBody, stmt: Inst) -> Option<Inst> {
    body.value_tree(stmt)
        .into_iter()
        .find(|&inst| matches!(body.data(inst), InstData::Call { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ControlFlowGraph;
    use crate::ir::{BinaryOp, MethodBuilder};
    use crate::utility::StringPool;

    #[test]
    fn overlapping_values_interfere() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let x = b.local(strings.insert("x"));
        let y = b.local(strings.insert("y"));
        let one = b.constant(1);

        let dx = b.copy(a, x);
        let sum = b.binary(BinaryOp::Add, a, one);
        let dy = b.save(sum, y);
        let last = b.binary(BinaryOp::Add, x, y);
        let da = b.save(last, a);
        b.ret(Some(a));

        let body = b.finish();
        let cfg = ControlFlowGraph::compute(&body);
        let liveness = Liveness::compute(&body, &cfg);
        let webs = Webs::compute(&body, &liveness);
        let graph = InterferenceGraph::compute(&body, &liveness, &webs);

        let wx = webs.web_of_def(dx).unwrap();
        let wy = webs.web_of_def(dy).unwrap();
        let wa = webs.web_of_def(da).unwrap();
        let wp = webs.web_of_def(body.layout().block_first_inst(cfg.entry().unwrap()).unwrap()).unwrap();

        // x is live while y is defined, and the parameter is still live when
        // x is defined
        assert!(graph.interferes(wx, wy));
        assert!(graph.interferes(wp, wx));

        // the final value of `a` only starts once x and y are dead
        assert!(!graph.interferes(wa, wx));
        assert!(!graph.interferes(wa, wy));
        assert!(!graph.interferes(wp, wy));
    }

    #[test]
    fn call_records_values_live_across_it() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let r = b.local(strings.insert("r"));
        let call = b.call(strings.insert("g"), &[a], false);
        let dr = b.save(call, r);
        let sum = b.binary(BinaryOp::Add, a, r);
        b.save(sum, r);
        b.ret(Some(r));

        let body = b.finish();
        let cfg = ControlFlowGraph::compute(&body);
        let liveness = Liveness::compute(&body, &cfg);
        let webs = Webs::compute(&body, &liveness);
        let graph = InterferenceGraph::compute(&body, &liveness, &webs);
        let (recorded, across) = graph.live_across_calls().next().unwrap();
        let wr = webs.web_of_def(dr).unwrap();

        assert_eq!(recorded, call);
        assert_eq!(across.len(), 1);
        assert!(!across.contains(&wr));
        assert_eq!(webs[*across.iter().next().unwrap()].loc(), a);
    }
}
