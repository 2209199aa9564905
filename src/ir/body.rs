//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaMap;
use crate::codegen::x86_64::Reg;
use crate::ir::{Block, Inst, InstData, Label, Layout, Loc, LocationData};
use crate::utility::{PackedOption, SaHashMap, Str};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

/// Extra information about a single block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub struct BlockData {
    label: PackedOption<Label>,
}

impl BlockData {
    /// The label placed at the start of the block, if it has one.
    pub fn label(&self) -> Option<Label> {
        self.label.expand()
    }
}

/// The results of register allocation for one method.
///
/// Every access of a colored location is bound individually, keyed by the
/// record that performs it: a `Load`, `Use` or `Call` for reads, the `Save`
/// for writes. Anything without a binding falls back to its stack slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterBindings {
    bindings: BTreeMap<(Inst, Loc), Reg>,
    callee_saved: BTreeSet<Reg>,
}

impl RegisterBindings {
    /// Binds the access of `loc` performed by `inst` to `reg`.
    pub fn bind(&mut self, inst: Inst, loc: Loc, reg: Reg) {
        self.bindings.insert((inst, loc), reg);

        if reg.is_callee_saved() {
            self.callee_saved.insert(reg);
        }
    }

    /// The register that the access of `loc` by `inst` was bound to.
    pub fn get(&self, inst: Inst, loc: Loc) -> Option<Reg> {
        self.bindings.get(&(inst, loc)).copied()
    }

    /// Callee-saved registers the method writes, in a stable order.
    pub fn callee_saved(&self) -> impl DoubleEndedIterator<Item = Reg> + '_ {
        self.callee_saved.iter().copied()
    }

    /// Forgets every binding, e.g. before allocating again.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.callee_saved.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Inst, Loc, Reg)> + '_ {
        self.bindings.iter().map(|(&(i, l), &r)| (i, l, r))
    }
}

/// The body of one method: every instruction record, every location the
/// records refer to, and the layout that orders the statements.
///
/// Records are never removed from the arena. Deleting a statement unlinks it
/// from the layout, which also makes every value record it owned unreachable.
#[derive(Clone, Debug)]
pub struct MethodBody {
    name: Str,
    params: Vec<Loc>,
    insts: ArenaMap<Inst, InstData>,
    locs: ArenaMap<Loc, LocationData>,
    // globals, constants and strings are interned so that equal storage is
    // always the same `Loc`. locals and temps are always fresh
    interned: SaHashMap<LocationData, Loc>,
    labels: ArenaMap<Label, PackedOption<Block>>,
    blocks: ArenaMap<Block, BlockData>,
    layout: Layout,
    registers: RegisterBindings,
}

impl MethodBody {
    /// Creates an empty body for the method `name`.
    pub fn new(name: Str) -> Self {
        Self {
            name,
            params: Vec::new(),
            insts: ArenaMap::new(),
            locs: ArenaMap::new(),
            interned: SaHashMap::default(),
            labels: ArenaMap::new(),
            blocks: ArenaMap::new(),
            layout: Layout::new(),
            registers: RegisterBindings::default(),
        }
    }

    /// The method's name.
    pub fn name(&self) -> Str {
        self.name
    }

    /// The locals that incoming arguments are stored into, in order.
    pub fn params(&self) -> &[Loc] {
        &self.params
    }

    pub(in crate::ir) fn push_param(&mut self, loc: Loc) {
        self.params.push(loc);
    }

    /// Gets the record for `inst`.
    pub fn data(&self, inst: Inst) -> &InstData {
        &self.insts[inst]
    }

    /// Gets the record for `inst` mutably.
    pub fn data_mut(&mut self, inst: Inst) -> &mut InstData {
        &mut self.insts[inst]
    }

    /// Creates a record without putting it anywhere. Values are attached to
    /// a statement through its operand fields, statements go in the layout.
    pub fn create_inst(&mut self, data: InstData) -> Inst {
        self.insts.insert(data)
    }

    /// The number of records ever created, reachable or not.
    pub fn inst_capacity(&self) -> usize {
        self.insts.len()
    }

    /// Gets what `loc` refers to.
    pub fn loc(&self, loc: Loc) -> LocationData {
        self.locs[loc]
    }

    /// Every location of the method, in creation order.
    pub fn locations(&self) -> impl Iterator<Item = (Loc, LocationData)> + '_ {
        self.locs.iter().map(|(k, v)| (k, *v))
    }

    /// The number of locations ever created.
    pub fn loc_capacity(&self) -> usize {
        self.locs.len()
    }

    /// Gets the location for the global field `name`.
    pub fn global(&mut self, name: Str) -> Loc {
        self.interned_loc(LocationData::Global { name })
    }

    /// Gets the location for the immediate `value`.
    pub fn constant(&mut self, value: i64) -> Loc {
        self.interned_loc(LocationData::Constant(value))
    }

    /// Gets the location for the string literal `s`.
    pub fn string(&mut self, s: Str) -> Loc {
        self.interned_loc(LocationData::Str(s))
    }

    /// Creates a fresh local named `name`. Two locals with the same name
    /// (e.g. shadowing) are still distinct locations.
    pub fn new_local(&mut self, name: Str) -> Loc {
        self.locs.insert(LocationData::Local { name })
    }

    /// Creates a fresh temporary.
    pub fn new_temp(&mut self) -> Loc {
        self.locs.insert(LocationData::Temp)
    }

    /// Creates a label that hasn't been placed yet.
    pub fn new_label(&mut self) -> Label {
        self.labels.insert(PackedOption::none())
    }

    /// The block that `label` was placed at.
    pub fn label_block(&self, label: Label) -> Option<Block> {
        self.labels[label].expand()
    }

    pub(in crate::ir) fn new_block(&mut self, label: Option<Label>) -> Block {
        let block = self.blocks.insert(BlockData {
            label: label.into(),
        });

        if let Some(label) = label {
            self.labels[label] = PackedOption::some(block);
        }

        self.layout.append_block(block);

        block
    }

    pub(in crate::ir) fn place_label(&mut self, label: Label, block: Block) {
        self.blocks[block].label = PackedOption::some(label);
        self.labels[label] = PackedOption::some(block);
    }

    /// Extra information about `block`.
    pub fn block_data(&self, block: Block) -> &BlockData {
        &self.blocks[block]
    }

    /// The number of blocks ever created.
    pub fn block_capacity(&self) -> usize {
        self.blocks.len()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }

    /// The register allocation results for this method.
    pub fn registers(&self) -> &RegisterBindings {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterBindings {
        &mut self.registers
    }

    /// Every record owned by `inst`, including `inst` itself, operands first.
    pub fn value_tree(&self, inst: Inst) -> SmallVec<[Inst; 4]> {
        let mut out = SmallVec::new();

        self.collect_tree(inst, &mut out);

        out
    }

    fn collect_tree(&self, inst: Inst, out: &mut SmallVec<[Inst; 4]>) {
        for operand in self.insts[inst].operands() {
            self.collect_tree(operand, out);
        }

        out.push(inst);
    }

    /// Every location read by a statement, paired with the record that
    /// performs the read. Reads are listed in evaluation order.
    pub fn reads(&self, stmt: Inst) -> SmallVec<[(Inst, Loc); 4]> {
        let mut out = SmallVec::new();

        for inst in self.value_tree(stmt) {
            match &self.insts[inst] {
                InstData::Load { src } => out.push((inst, *src)),
                InstData::Use { loc } => out.push((inst, *loc)),
                InstData::Call { args, .. } => out.extend(args.iter().map(|arg| (inst, *arg))),
                _ => {}
            }
        }

        out
    }

    /// Whether the statement (or anything it owns) is a call.
    pub fn contains_call(&self, stmt: Inst) -> bool {
        self.value_tree(stmt)
            .into_iter()
            .any(|inst| matches!(self.insts[inst], InstData::Call { .. }))
    }

    fn interned_loc(&mut self, data: LocationData) -> Loc {
        if let Some(&loc) = self.interned.get(&data) {
            return loc;
        }

        let loc = self.locs.insert(data);

        self.interned.insert(data, loc);

        loc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinaryOp;
    use crate::utility::StringPool;

    #[test]
    fn constants_and_globals_are_interned() {
        let mut strings = StringPool::new();
        let mut body = MethodBody::new(strings.insert("main"));
        let g = strings.insert("g");

        assert_eq!(body.constant(5), body.constant(5));
        assert_ne!(body.constant(5), body.constant(6));
        assert_eq!(body.global(g), body.global(g));
        assert_ne!(body.new_local(g), body.new_local(g));
        assert_ne!(body.new_temp(), body.new_temp());
    }

    #[test]
    fn reads_follow_evaluation_order() {
        let mut strings = StringPool::new();
        let mut body = MethodBody::new(strings.insert("main"));
        let a = body.new_local(strings.insert("a"));
        let b = body.new_local(strings.insert("b"));
        let c = body.new_local(strings.insert("c"));

        let la = body.create_inst(InstData::Load { src: a });
        let lb = body.create_inst(InstData::Load { src: b });
        let add = body.create_inst(InstData::Binary {
            op: BinaryOp::Add,
            lhs: la,
            rhs: lb,
        });
        let save = body.create_inst(InstData::Save {
            value: add,
            dest: c,
        });

        assert_eq!(body.reads(save).as_slice(), &[(la, a), (lb, b)]);
        assert_eq!(body.value_tree(save).as_slice(), &[la, lb, add, save]);
        assert!(!body.contains_call(save));
    }

    #[test]
    fn bindings_track_callee_saved_registers() {
        let mut strings = StringPool::new();
        let mut body = MethodBody::new(strings.insert("main"));
        let x = body.new_local(strings.insert("x"));
        let load = body.create_inst(InstData::Load { src: x });

        body.registers_mut().bind(load, x, Reg::R12);
        body.registers_mut().bind(load, x, Reg::R12);

        assert_eq!(body.registers().get(load, x), Some(Reg::R12));
        assert_eq!(body.registers().callee_saved().collect::<Vec<_>>(), vec![Reg::R12]);
    }
}
