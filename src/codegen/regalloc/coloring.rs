//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::codegen::regalloc::{InterferenceGraph, Web, Webs};
use crate::codegen::x86_64::Reg;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// The result of coloring an interference graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coloring {
    colors: BTreeMap<Web, Reg>,
    spilled: BTreeSet<Web>,
}

impl Coloring {
    /// The register `web` was colored with, if any.
    pub fn color(&self, web: Web) -> Option<Reg> {
        self.colors.get(&web).copied()
    }

    /// Webs that should have gotten a register but didn't.
    pub fn spilled(&self) -> impl Iterator<Item = Web> + '_ {
        self.spilled.iter().copied()
    }

    pub fn colors(&self) -> impl Iterator<Item = (Web, Reg)> + '_ {
        self.colors.iter().map(|(&web, &reg)| (web, reg))
    }
}

/// Colors `graph` with the registers in `palette` by simplify/select.
///
/// Simplification repeatedly removes the lowest-keyed web with fewer than
/// `palette.len()` remaining neighbors. When no such web exists, the web with
/// the highest degree per access is removed instead, since spilling it
/// costs the fewest loads and stores for the most relief. Selection then
/// pops webs in reverse and gives each the first palette register none of
/// its colored neighbors has.
///
/// Def-less webs never get a color.
pub fn color(graph: &InterferenceGraph, webs: &Webs, palette: &[Reg]) -> Coloring {
    let k = palette.len();
    let mut remaining: BTreeSet<Web> = graph.nodes().filter(|&w| !webs[w].is_defless()).collect();
    let mut degrees: BTreeMap<Web, usize> = remaining
        .iter()
        .map(|&w| (w, graph.neighbors(w).filter(|n| remaining.contains(n)).count()))
        .collect();

    let mut stack = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .copied()
            .find(|w| degrees[w] < k)
            .unwrap_or_else(|| spill_candidate(&remaining, &degrees, webs));

        remaining.remove(&next);

        for neighbor in graph.neighbors(next) {
            if let Some(degree) = degrees.get_mut(&neighbor) {
                *degree = degree.saturating_sub(1);
            }
        }

        stack.push(next);
    }

    let mut coloring = Coloring::default();

    while let Some(web) = stack.pop() {
        let taken: BTreeSet<Reg> = graph
            .neighbors(web)
            .filter_map(|n| coloring.colors.get(&n).copied())
            .collect();

        match palette.iter().copied().find(|reg| !taken.contains(reg)) {
            Some(reg) => {
                coloring.colors.insert(web, reg);
            }
            None => {
                debug!("regalloc: spilling {web:?} ({:?})", webs[web].loc());

                coloring.spilled.insert(web);
            }
        }
    }

    coloring
}

// highest degree / (defs + uses), lowest key on ties. compared by cross
// multiplication to stay in integers
fn spill_candidate(remaining: &BTreeSet<Web>, degrees: &BTreeMap<Web, usize>, webs: &Webs) -> Web {
    let mut best: Option<(Web, usize, usize)> = None;

    for &web in remaining {
        let degree = degrees[&web];
        let cost = webs[web].accesses().max(1);

        best = match best {
            Some((_, best_degree, best_cost)) if degree * best_cost <= best_degree * cost => best,
            _ => Some((web, degree, cost)),
        };
    }

    match best {
        Some((web, _, _)) => web,
        None => unreachable!("spill candidate requested with no webs left"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ControlFlowGraph, Liveness};
    use crate::ir::{BinaryOp, Loc, MethodBody, MethodBuilder};
    use crate::utility::StringPool;

    // n values all live at once, then summed
    fn clique(n: usize) -> MethodBody {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let vars: Vec<Loc> = (0..n).map(|i| b.local(strings.insert(&format!("v{i}")))).collect();
        let acc = b.local(strings.insert("acc"));

        for (i, &var) in vars.iter().enumerate() {
            let c = b.constant(i as i64);

            b.copy(c, var);
        }

        let zero = b.constant(0);

        b.copy(zero, acc);

        for &var in vars.iter() {
            let sum = b.binary(BinaryOp::Add, acc, var);

            b.save(sum, acc);
        }

        b.ret(Some(acc));
        b.finish()
    }

    fn colored(body: &MethodBody, palette: &[Reg]) -> (Webs, InterferenceGraph, Coloring) {
        let cfg = ControlFlowGraph::compute(body);
        let liveness = Liveness::compute(body, &cfg);
        let webs = Webs::compute(body, &liveness);
        let graph = InterferenceGraph::compute(body, &liveness, &webs);
        let coloring = color(&graph, &webs, palette);

        (webs, graph, coloring)
    }

    fn assert_valid(graph: &InterferenceGraph, coloring: &Coloring) {
        for a in graph.nodes() {
            for b in graph.neighbors(a) {
                if let (Some(ca), Some(cb)) = (coloring.color(a), coloring.color(b)) {
                    assert_ne!(ca, cb, "{a:?} and {b:?} interfere but share {ca}");
                }
            }
        }
    }

    #[test]
    fn interfering_webs_never_share_a_color() {
        let body = clique(6);
        let palette = [Reg::R12, Reg::R13, Reg::R14, Reg::R15];
        let (_, graph, coloring) = colored(&body, &palette);

        assert_valid(&graph, &coloring);
        assert!(coloring.spilled().count() > 0);
    }

    #[test]
    fn low_degree_webs_are_never_spilled() {
        let body = clique(6);
        let palette = [Reg::R12, Reg::R13, Reg::R14, Reg::R15];
        let (_, graph, coloring) = colored(&body, &palette);

        for web in coloring.spilled() {
            assert!(graph.degree(web) >= palette.len());
        }
    }

    #[test]
    fn everything_fits_with_enough_registers() {
        let body = clique(3);
        let palette = [Reg::R12, Reg::R13, Reg::R14, Reg::R15];
        let (webs, graph, coloring) = colored(&body, &palette);

        assert_valid(&graph, &coloring);
        assert_eq!(coloring.spilled().count(), 0);
        assert_eq!(coloring.colors().count(), webs.len());
    }

    #[test]
    fn empty_palette_colors_nothing() {
        let body = clique(2);
        let (webs, _, coloring) = colored(&body, &[]);

        assert_eq!(coloring.colors().count(), 0);
        assert_eq!(coloring.spilled().count(), webs.len());
    }

    #[test]
    fn hand_built_triangle_needs_three_colors() {
        let body = clique(3);
        let (webs, _, _) = colored(&body, &[]);
        let nodes: Vec<Web> = webs.iter().map(|(w, _)| w).take(3).collect();
        let mut graph = InterferenceGraph::default();

        graph.add_edge(nodes[0], nodes[1]);
        graph.add_edge(nodes[1], nodes[2]);
        graph.add_edge(nodes[0], nodes[2]);

        let two = color(&graph, &webs, &[Reg::R12, Reg::R13]);
        let three = color(&graph, &webs, &[Reg::R12, Reg::R13, Reg::R14]);

        assert_eq!(two.spilled().count(), 1);
        assert_eq!(three.spilled().count(), 0);
        assert_valid(&graph, &three);
    }
}
