//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{SecondaryMap, SecondarySet};
use crate::ir::{Block, InstData, MethodBody};
use smallvec::SmallVec;

#[derive(Clone, Debug, Default)]
struct CFGNode {
    predecessors: SmallVec<[Block; 2]>,
    successors: SmallVec<[Block; 2]>,
}

/// Models successor/predecessor information about the control-flow graph of
/// a given method, along with the block orders the dataflow solver walks.
///
/// Edges come from the last statement of each block: a jump has one
/// successor, a branch has its target and the next block, returns and exits
/// have none, and anything else falls through to the next block.
#[derive(Clone, Debug)]
pub struct ControlFlowGraph {
    nodes: SecondaryMap<Block, CFGNode>,
    entry: Option<Block>,
    postorder: Vec<Block>,
}

impl ControlFlowGraph {
    /// Computes the flowgraph of `body`. Only the shape of the body matters,
    /// so the result stays valid while passes rewrite non-control statements.
    pub fn compute(body: &MethodBody) -> Self {
        let layout = body.layout();
        let mut nodes = SecondaryMap::new();

        for block in layout.blocks() {
            nodes.insert(block, CFGNode::default());
        }

        for block in layout.blocks() {
            let next = layout.block_next(block);
            let last = layout.block_last_inst(block).map(|inst| body.data(inst));

            let successors: SmallVec<[Block; 2]> = match last {
                Some(InstData::Jump { target }) => body.label_block(*target).into_iter().collect(),
                Some(InstData::Branch { target, .. }) => body
                    .label_block(*target)
                    .into_iter()
                    .chain(next)
                    .collect(),
                Some(InstData::Return { .. }) | Some(InstData::Exit { .. }) => SmallVec::new(),
                _ => next.into_iter().collect(),
            };

            for succ in successors {
                let node: &mut CFGNode = &mut nodes[block];

                if node.successors.contains(&succ) {
                    continue;
                }

                node.successors.push(succ);
                nodes[succ].predecessors.push(block);
            }
        }

        let entry = layout.entry_block();
        let postorder = compute_postorder(&nodes, entry, layout.blocks());

        Self {
            nodes,
            entry,
            postorder,
        }
    }

    /// The entry block, if the method has any blocks.
    pub fn entry(&self) -> Option<Block> {
        self.entry
    }

    /// Returns an iterator over the predecessors for a given block.
    pub fn predecessors(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.nodes[block].predecessors.iter().copied()
    }

    /// Returns an iterator over the successors for a given block.
    pub fn successors(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.nodes[block].successors.iter().copied()
    }

    /// Every block, each after all of its successors except along back edges.
    ///
    /// Blocks unreachable from the entry come first, so that they come last
    /// in reverse post-order.
    pub fn postorder(&self) -> &[Block] {
        &self.postorder
    }

    /// Every block, each before all of its successors except along back edges.
    pub fn reverse_postorder(&self) -> impl Iterator<Item = Block> + '_ {
        self.postorder.iter().rev().copied()
    }
}

fn compute_postorder(
    nodes: &SecondaryMap<Block, CFGNode>,
    entry: Option<Block>,
    all: impl Iterator<Item = Block>,
) -> Vec<Block> {
    let mut seen = SecondarySet::new();
    let mut out = Vec::with_capacity(nodes.len());
    let mut roots: Vec<Block> = all.collect();

    // the entry goes last so that it ends up first in reverse post-order,
    // roots are popped from the back
    roots.retain(|b| Some(*b) != entry);
    roots.reverse();
    roots.extend(entry);

    while let Some(root) = roots.pop() {
        if seen.insert(root) {
            continue;
        }

        // iterative dfs, each frame is (block, index of next successor)
        let mut stack = vec![(root, 0usize)];

        while let Some((block, idx)) = stack.last_mut() {
            let succs = &nodes[*block].successors;

            match succs.get(*idx) {
                Some(&succ) => {
                    *idx += 1;

                    if !seen.insert(succ) {
                        stack.push((succ, 0));
                    }
                }
                None => {
                    out.push(*block);
                    stack.pop();
                }
            }
        }
    }

    // unreachable blocks were visited after the entry's tree, but they have
    // to come after it in reverse post-order too, so they go first here
    let reachable = out.iter().position(|b| Some(*b) == entry).map_or(0, |i| i + 1);

    out.rotate_left(reachable);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, MethodBuilder};
    use crate::utility::StringPool;

    // entry -> header <-> body, header -> exit
    fn looped() -> (MethodBody, Vec<Block>) {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let n = b.param(strings.insert("n"));
        let top = b.new_label();
        let done = b.new_label();
        let zero = b.constant(0);
        let c = b.local(strings.insert("c"));

        b.label(top);
        let gt = b.binary(BinaryOp::Gt, n, zero);
        b.save(gt, c);
        b.branch_if_zero(c, done);
        b.copy(zero, n);
        b.jump(top);
        b.label(done);
        b.ret(None);

        let body = b.finish();
        let blocks = body.layout().blocks().collect();

        (body, blocks)
    }

    #[test]
    fn edges_follow_terminators() {
        let (body, bb) = looped();
        let cfg = ControlFlowGraph::compute(&body);

        assert_eq!(cfg.successors(bb[0]).collect::<Vec<_>>(), vec![bb[1]]);
        assert_eq!(cfg.successors(bb[1]).collect::<Vec<_>>(), vec![bb[3], bb[2]]);
        assert_eq!(cfg.successors(bb[2]).collect::<Vec<_>>(), vec![bb[1]]);
        assert_eq!(cfg.successors(bb[3]).count(), 0);

        let mut preds: Vec<_> = cfg.predecessors(bb[1]).collect();

        preds.sort();

        assert_eq!(preds, vec![bb[0], bb[2]]);
    }

    #[test]
    fn reverse_postorder_starts_at_entry() {
        let (body, bb) = looped();
        let cfg = ControlFlowGraph::compute(&body);
        let rpo: Vec<_> = cfg.reverse_postorder().collect();

        assert_eq!(rpo, vec![bb[0], bb[1], bb[2], bb[3]]);
        assert_eq!(cfg.postorder(), &[bb[3], bb[2], bb[1], bb[0]]);
    }

    #[test]
    fn unreachable_blocks_are_still_ordered() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));

        b.ret(None);
        b.ret(None);

        let body = b.finish();
        let blocks: Vec<_> = body.layout().blocks().collect();
        let cfg = ControlFlowGraph::compute(&body);
        let rpo: Vec<_> = cfg.reverse_postorder().collect();

        assert_eq!(rpo, blocks);
        assert_eq!(cfg.predecessors(blocks[1]).count(), 0);
    }
}
