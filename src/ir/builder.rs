//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{BinaryOp, Block, Inst, InstData, Label, Loc, MethodBody, UnaryOp};
use crate::utility::Str;
use smallvec::SmallVec;

/// Helper type for building a method body statement by statement.
///
/// Blocks are formed automatically: a new block starts at every label and
/// after every statement that can leave the block (jumps, branches, returns
/// and exits). Value records are created detached and are attached to the
/// statement that consumes them.
///
/// ```
/// # use garnet::ir::*;
/// # use garnet::utility::StringPool;
/// let mut strings = StringPool::new();
/// let mut b = MethodBuilder::new(strings.insert("f"));
/// let x = b.param(strings.insert("x"));
/// let y = b.local(strings.insert("y"));
/// let one = b.constant(1);
///
/// let sum = b.binary(BinaryOp::Add, x, one);
/// b.save(sum, y);
/// b.ret(Some(y));
///
/// let body = b.finish();
/// assert_eq!(body.layout().len_blocks(), 1);
/// ```
#[derive(Debug)]
pub struct MethodBuilder {
    body: MethodBody,
    current: Option<Block>,
}

impl MethodBuilder {
    /// Starts building the method `name`.
    pub fn new(name: Str) -> Self {
        Self {
            body: MethodBody::new(name),
            current: None,
        }
    }

    /// Read-only access to what has been built so far.
    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    /// Declares the next parameter, storing the incoming argument into a
    /// fresh local named `name`.
    pub fn param(&mut self, name: Str) -> Loc {
        let loc = self.body.new_local(name);
        let index = self.body.params().len() as u32;
        let value = self.body.create_inst(InstData::Param { index });

        self.body.push_param(loc);
        self.save(value, loc);

        loc
    }

    /// Creates a fresh local variable.
    pub fn local(&mut self, name: Str) -> Loc {
        self.body.new_local(name)
    }

    /// Gets the location for a global field.
    pub fn global(&mut self, name: Str) -> Loc {
        self.body.global(name)
    }

    /// Gets the location for an immediate.
    pub fn constant(&mut self, value: i64) -> Loc {
        self.body.constant(value)
    }

    /// Gets the location for a string literal.
    pub fn string(&mut self, s: Str) -> Loc {
        self.body.string(s)
    }

    /// Creates a label that can be jumped to before it's placed.
    pub fn new_label(&mut self) -> Label {
        self.body.new_label()
    }

    /// Creates a detached `Load` of `src`.
    pub fn load(&mut self, src: Loc) -> Inst {
        self.body.create_inst(InstData::Load { src })
    }

    /// Creates a detached `lhs op rhs`.
    pub fn binary(&mut self, op: BinaryOp, lhs: Loc, rhs: Loc) -> Inst {
        let lhs = self.load(lhs);
        let rhs = self.load(rhs);

        self.body.create_inst(InstData::Binary { op, lhs, rhs })
    }

    /// Creates a detached `op operand`.
    pub fn unary(&mut self, op: UnaryOp, operand: Loc) -> Inst {
        let operand = self.load(operand);

        self.body.create_inst(InstData::Unary { op, operand })
    }

    /// Creates a detached call. Attach it with [`Self::save`] to keep the
    /// result, or with [`Self::call_stmt`] to discard it.
    pub fn call(&mut self, target: Str, args: &[Loc], external: bool) -> Inst {
        self.body.create_inst(InstData::Call {
            target,
            args: SmallVec::from_slice(args),
            external,
            saved: SmallVec::new(),
        })
    }

    /// Appends `dest = value`.
    pub fn save(&mut self, value: Inst, dest: Loc) -> Inst {
        debug_assert!(self.body.data(value).is_value(), "can only save a value");

        self.append(InstData::Save { value, dest })
    }

    /// Appends `dest = src`.
    pub fn copy(&mut self, src: Loc, dest: Loc) -> Inst {
        let value = self.load(src);

        self.save(value, dest)
    }

    /// Appends a call whose result is discarded.
    pub fn call_stmt(&mut self, call: Inst) -> Inst {
        debug_assert!(matches!(self.body.data(call), InstData::Call { .. }));

        self.append_existing(call)
    }

    /// Appends a bare read of `loc`.
    pub fn use_loc(&mut self, loc: Loc) -> Inst {
        self.append(InstData::Use { loc })
    }

    /// Places `label` here, starting a new block unless the current block
    /// is still empty and unlabeled.
    pub fn label(&mut self, label: Label) -> Inst {
        match self.current {
            Some(block)
                if self.body.layout().block_first_inst(block).is_none()
                    && self.body.block_data(block).label().is_none() =>
            {
                self.body.place_label(label, block);
            }
            _ => self.current = Some(self.body.new_block(Some(label))),
        }

        self.append(InstData::Label(label))
    }

    /// Appends an unconditional jump.
    pub fn jump(&mut self, target: Label) -> Inst {
        self.append(InstData::Jump { target })
    }

    /// Appends a jump to `target` that is taken when `cond` is zero.
    pub fn branch_if_zero(&mut self, cond: Loc, target: Label) -> Inst {
        let cond = self.load(cond);

        self.append(InstData::Branch { cond, target })
    }

    /// Appends a return, optionally of the value in `value`.
    pub fn ret(&mut self, value: Option<Loc>) -> Inst {
        let value = value.map(|loc| self.load(loc));

        self.append(InstData::Return { value })
    }

    /// Appends a process exit with `code`.
    pub fn exit(&mut self, code: i32) -> Inst {
        self.append(InstData::Exit { code })
    }

    /// Whether the last statement appended can't fall through.
    pub fn is_terminated(&self) -> bool {
        self.current.is_none()
            && self
                .body
                .layout()
                .blocks()
                .last()
                .and_then(|bb| self.body.layout().block_last_inst(bb))
                .map_or(false, |inst| self.body.data(inst).is_terminator())
    }

    /// Finishes the body. A body always has at least the entry block.
    pub fn finish(mut self) -> MethodBody {
        if self.body.layout().entry_block().is_none() {
            self.body.new_block(None);
        }

        self.body
    }

    fn append(&mut self, data: InstData) -> Inst {
        let inst = self.body.create_inst(data);

        self.append_existing(inst)
    }

    fn append_existing(&mut self, inst: Inst) -> Inst {
        let block = match self.current {
            Some(block) => block,
            None => self.body.new_block(None),
        };

        self.body.layout_mut().append_inst(inst, block);

        self.current = if self.body.data(inst).ends_block() {
            None
        } else {
            Some(block)
        };

        inst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::StringPool;

    #[test]
    fn labels_and_terminators_split_blocks() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let x = b.local(strings.insert("x"));
        let top = b.new_label();
        let done = b.new_label();

        b.label(top);
        b.branch_if_zero(x, done);
        b.copy(x, x);
        b.jump(top);
        b.label(done);
        b.ret(None);

        let body = b.finish();
        let blocks: Vec<_> = body.layout().blocks().collect();

        // [top, bz], [x = x, jmp], [done, ret]
        assert_eq!(blocks.len(), 3);
        assert_eq!(body.label_block(top), Some(blocks[0]));
        assert_eq!(body.label_block(done), Some(blocks[2]));
        assert_eq!(body.layout().insts_in_block(blocks[1]).count(), 2);
    }

    #[test]
    fn label_reuses_empty_block() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let l = b.new_label();

        b.ret(None);
        b.label(l);
        b.ret(None);

        let body = b.finish();

        assert_eq!(body.layout().len_blocks(), 2);
    }

    #[test]
    fn params_are_saved_at_entry() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let p0 = b.param(strings.insert("a"));
        let p1 = b.param(strings.insert("b"));
        let body = b.finish();
        let entry = body.layout().entry_block().unwrap();
        let saves: Vec<_> = body
            .layout()
            .insts_in_block(entry)
            .map(|i| body.data(i).clone())
            .collect();

        assert_eq!(body.params(), &[p0, p1]);
        assert!(matches!(saves[1], InstData::Save { dest, .. } if dest == p1));
    }

    #[test]
    fn empty_body_still_has_entry() {
        let mut strings = StringPool::new();
        let body = MethodBuilder::new(strings.insert("f")).finish();

        assert!(body.layout().entry_block().is_some());
    }

    #[test]
    fn terminated_tracks_last_statement() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let x = b.local(strings.insert("x"));
        let l = b.new_label();

        assert!(!b.is_terminated());
        b.branch_if_zero(x, l);
        assert!(!b.is_terminated());
        b.exit(1);
        assert!(b.is_terminated());
    }
}
