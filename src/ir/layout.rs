//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::SecondaryMap;
use crate::ir::{Block, Inst};
use crate::utility::PackedOption;
use std::fmt;
use std::fmt::{Debug, Formatter};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
struct InstNode {
    prev: PackedOption<Inst>,
    next: PackedOption<Inst>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
struct BlockNode {
    prev: PackedOption<Block>,
    next: PackedOption<Block>,
    first: PackedOption<Inst>,
    last: PackedOption<Inst>,
}

/// Allows the blocks in a layout to be iterated over in program order.
///
/// The first block is always the entry block. Falling off the end of a block
/// continues at the next block in this order.
#[derive(Copy, Clone, Debug)]
pub struct BlockIter<'layout> {
    next: Option<Block>,
    layout: &'layout Layout,
}

impl<'l> Iterator for BlockIter<'l> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|block| {
            self.next = self.layout.blocks[block].next.expand();

            block
        })
    }
}

/// Allows all of the statements in a given block to be iterated over, in
/// either direction.
#[derive(Copy, Clone, Debug)]
pub struct InstIter<'layout> {
    front: Option<Inst>,
    back: Option<Inst>,
    layout: &'layout Layout,
}

impl<'l> Iterator for InstIter<'l> {
    type Item = Inst;

    fn next(&mut self) -> Option<Self::Item> {
        let inst = self.front?;

        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = self.layout.nodes[inst].next.expand();
        }

        Some(inst)
    }
}

impl<'l> DoubleEndedIterator for InstIter<'l> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let inst = self.back?;

        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.layout.nodes[inst].prev.expand();
        }

        Some(inst)
    }
}

/// Models the statement order of an entire method and every block in it.
///
/// Each block is a doubly-linked list of statements keyed by [`Inst`], so
/// passes can splice and delete in place without invalidating any other
/// key. The list of blocks is itself linked for the same reason.
#[derive(Default, Clone)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct Layout {
    // forms a doubly-linked list of blocks, with `None` at the head/tail
    blocks: SecondaryMap<Block, BlockNode>,
    // forms a doubly-linked list of statements, with `None` at the head/tail
    nodes: SecondaryMap<Inst, InstNode>,
    // maps statements -> the blocks that contain them
    inst_blocks: SecondaryMap<Inst, Block>,
    head: PackedOption<Block>,
    tail: PackedOption<Block>,
}

impl Layout {
    /// Creates a new, empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement to the end of the specified block.
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        debug_assert!(
            !self.nodes.contains(inst),
            "cannot insert same inst multiple times"
        );

        let block_node = &mut self.blocks[block];
        let prev = block_node.last.replace(inst);

        match prev {
            Some(prev) => self.nodes[prev].next = PackedOption::some(inst),
            None => block_node.first = PackedOption::some(inst),
        }

        self.insert_node(inst, block, prev.into(), PackedOption::none());
    }

    /// Inserts `inst` into the same block as `before`, directly before `before`.
    pub fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        debug_assert!(
            !self.nodes.contains(inst),
            "cannot insert same inst multiple times"
        );

        let after = self.nodes[before].prev.replace(inst);

        match after {
            Some(after) => self.nodes[after].next = PackedOption::some(inst),
            None => self.block_node_mut(before).first = PackedOption::some(inst),
        }

        self.insert_node(
            inst,
            self.inst_blocks[before],
            after.into(),
            PackedOption::some(before),
        );
    }

    /// Inserts `inst` into the same block as `after`, directly after `after`.
    pub fn insert_inst_after(&mut self, inst: Inst, after: Inst) {
        debug_assert!(
            !self.nodes.contains(inst),
            "cannot insert same inst multiple times"
        );

        let before = self.nodes[after].next.replace(inst);

        match before {
            Some(before) => self.nodes[before].prev = PackedOption::some(inst),
            None => self.block_node_mut(after).last = PackedOption::some(inst),
        }

        self.insert_node(
            inst,
            self.inst_blocks[after],
            PackedOption::some(after),
            before.into(),
        );
    }

    /// Puts `new` exactly where `old` is and takes `old` out of the layout.
    pub fn replace_inst(&mut self, old: Inst, new: Inst) {
        self.insert_inst_after(new, old);
        self.remove_inst(old);
    }

    /// Removes a statement from the layout. Removing a statement that isn't
    /// in the layout is a bug, and panics.
    pub fn remove_inst(&mut self, inst: Inst) {
        let node = self.nodes[inst];

        match node.prev.expand() {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.block_node_mut(inst).first = node.next,
        }

        match node.next.expand() {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.block_node_mut(inst).last = node.prev,
        }

        // as-if the statement was never inserted to begin with
        self.nodes.remove(inst);
        self.inst_blocks.remove(inst);
    }

    /// Appends a block to the layout, putting it at the end of the list of blocks.
    pub fn append_block(&mut self, block: Block) {
        debug_assert!(
            !self.blocks.contains(block),
            "cannot insert block that is already inserted"
        );

        let prev = self.tail.replace(block);

        match prev {
            Some(bb) => self.blocks[bb].next = PackedOption::some(block),
            None => self.head = PackedOption::some(block),
        }

        self.blocks.insert(
            block,
            BlockNode {
                prev: prev.into(),
                next: PackedOption::none(),
                first: PackedOption::none(),
                last: PackedOption::none(),
            },
        );
    }

    /// Returns the number of blocks in the layout.
    pub fn len_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of statements in the layout.
    pub fn len_insts(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if a statement is currently inside the layout.
    pub fn is_inst_inserted(&self, inst: Inst) -> bool {
        self.nodes.contains(inst)
    }

    /// Gets an iterator over the blocks of the layout.
    pub fn blocks(&self) -> BlockIter<'_> {
        BlockIter {
            next: self.head.expand(),
            layout: self,
        }
    }

    /// Gets an iterator over every statement in a given block.
    pub fn insts_in_block(&self, block: Block) -> InstIter<'_> {
        let node = &self.blocks[block];

        InstIter {
            front: node.first.expand(),
            back: node.last.expand(),
            layout: self,
        }
    }

    /// Gets the entry block for the layout, if it exists.
    pub fn entry_block(&self) -> Option<Block> {
        self.head.expand()
    }

    /// Gets the block that comes after `block`.
    pub fn block_next(&self, block: Block) -> Option<Block> {
        self.blocks[block].next.expand()
    }

    /// Gets the first statement in `block`.
    pub fn block_first_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].first.expand()
    }

    /// Gets the last statement in `block`.
    pub fn block_last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].last.expand()
    }

    /// Gets the statement that comes after `inst`.
    pub fn inst_next(&self, inst: Inst) -> Option<Inst> {
        self.nodes[inst].next.expand()
    }

    /// Gets the statement that comes before `inst`.
    pub fn inst_prev(&self, inst: Inst) -> Option<Inst> {
        self.nodes[inst].prev.expand()
    }

    /// Gets the block that a statement is in.
    pub fn inst_block(&self, inst: Inst) -> Block {
        self.inst_blocks[inst]
    }

    fn insert_node(
        &mut self,
        inst: Inst,
        block: Block,
        prev: PackedOption<Inst>,
        next: PackedOption<Inst>,
    ) {
        self.nodes.insert(inst, InstNode { prev, next });
        self.inst_blocks.insert(inst, block);
    }

    fn block_node_mut(&mut self, inst: Inst) -> &mut BlockNode {
        &mut self.blocks[self.inst_blocks[inst]]
    }
}

impl Debug for Layout {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.blocks()
                    .map(|block| (block, self.insts_in_block(block).collect::<Vec<_>>())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaKey;

    fn inst(n: usize) -> Inst {
        Inst::new(n)
    }

    fn contents(layout: &Layout, block: Block) -> Vec<usize> {
        layout.insts_in_block(block).map(|i| i.index()).collect()
    }

    #[test]
    fn append_and_iterate_both_ways() {
        let mut layout = Layout::new();
        let bb = Block::new(0);

        layout.append_block(bb);

        for i in 0..4 {
            layout.append_inst(inst(i), bb);
        }

        let backwards: Vec<_> = layout.insts_in_block(bb).rev().map(|i| i.index()).collect();

        assert_eq!(contents(&layout, bb), vec![0, 1, 2, 3]);
        assert_eq!(backwards, vec![3, 2, 1, 0]);
    }

    #[test]
    fn insert_before_and_after_keep_links_consistent() {
        let mut layout = Layout::new();
        let bb = Block::new(0);

        layout.append_block(bb);
        layout.append_inst(inst(0), bb);
        layout.append_inst(inst(1), bb);
        layout.insert_inst_before(inst(2), inst(0));
        layout.insert_inst_after(inst(3), inst(1));
        layout.insert_inst_after(inst(4), inst(0));

        assert_eq!(contents(&layout, bb), vec![2, 0, 4, 1, 3]);
        assert_eq!(layout.block_first_inst(bb), Some(inst(2)));
        assert_eq!(layout.block_last_inst(bb), Some(inst(3)));
        assert_eq!(layout.inst_prev(inst(4)), Some(inst(0)));
        assert_eq!(layout.inst_next(inst(4)), Some(inst(1)));
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut layout = Layout::new();
        let bb = Block::new(0);

        layout.append_block(bb);

        for i in 0..5 {
            layout.append_inst(inst(i), bb);
        }

        layout.remove_inst(inst(0));
        layout.remove_inst(inst(2));
        layout.remove_inst(inst(4));

        assert_eq!(contents(&layout, bb), vec![1, 3]);
        assert_eq!(layout.block_first_inst(bb), Some(inst(1)));
        assert_eq!(layout.block_last_inst(bb), Some(inst(3)));
        assert!(!layout.is_inst_inserted(inst(2)));
        assert_eq!(layout.len_insts(), 2);

        layout.remove_inst(inst(1));
        layout.remove_inst(inst(3));

        assert_eq!(contents(&layout, bb), Vec::<usize>::new());
        assert_eq!(layout.block_first_inst(bb), None);
    }

    #[test]
    fn replace_keeps_position() {
        let mut layout = Layout::new();
        let bb = Block::new(0);

        layout.append_block(bb);
        layout.append_inst(inst(0), bb);
        layout.append_inst(inst(1), bb);
        layout.replace_inst(inst(0), inst(7));

        assert_eq!(contents(&layout, bb), vec![7, 1]);
        assert_eq!(layout.inst_block(inst(7)), bb);
    }

    #[test]
    fn blocks_are_in_append_order() {
        let mut layout = Layout::new();

        for i in [2, 0, 1] {
            layout.append_block(Block::new(i));
        }

        let order: Vec<_> = layout.blocks().map(|b| b.index()).collect();

        assert_eq!(order, vec![2, 0, 1]);
        assert_eq!(layout.entry_block(), Some(Block::new(2)));
        assert_eq!(layout.block_next(Block::new(1)), None);
    }
}
