//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::codegen::x86_64::ARG_REGS;
use crate::ir::{Inst, InstData, Loc, MethodBody};
use std::collections::BTreeMap;

/// Size of every stack slot. Everything is one machine word.
pub const SLOT_SIZE: i32 = 8;

/// The stack frame of one method, addressed relative to `rbp`.
///
/// Slots are handed out from a counter that starts at zero: the arguments
/// that came in registers first, then every local or temporary that has at
/// least one access without a register binding, in the order they're first
/// touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    params: Vec<i32>,
    slots: BTreeMap<Loc, i32>,
    size: i32,
}

impl Frame {
    pub fn compute(body: &MethodBody) -> Self {
        let mut frame = Self::default();
        let in_registers = body.params().len().min(ARG_REGS.len());

        for _ in 0..in_registers {
            let offset = frame.next_slot();

            frame.params.push(offset);
        }

        for block in body.layout().blocks() {
            for stmt in body.layout().insts_in_block(block) {
                if let InstData::Save { dest, .. } = body.data(stmt) {
                    frame.note_access(body, stmt, *dest);
                }

                for (inst, loc) in body.reads(stmt) {
                    frame.note_access(body, inst, loc);
                }
            }
        }

        frame
    }

    fn note_access(&mut self, body: &MethodBody, inst: Inst, loc: Loc) {
        let unbound = body.loc(loc).is_allocatable() && body.registers().get(inst, loc).is_none();

        if unbound && !self.slots.contains_key(&loc) {
            let offset = self.next_slot();

            self.slots.insert(loc, offset);
        }
    }

    fn next_slot(&mut self) -> i32 {
        self.size += SLOT_SIZE;

        -self.size
    }

    /// The `rbp`-relative offset of `loc`'s slot, if it has one.
    pub fn slot(&self, loc: Loc) -> Option<i32> {
        self.slots.get(&loc).copied()
    }

    /// Where incoming argument `index` can be read from. Register arguments
    /// are copied into their slot by the prologue, the rest are above the
    /// saved `rbp` and return address.
    pub fn param(&self, index: u32) -> Option<i32> {
        let index = index as usize;

        match self.params.get(index) {
            Some(&offset) => Some(offset),
            None if index >= ARG_REGS.len() => {
                Some(2 * SLOT_SIZE + (index - ARG_REGS.len()) as i32 * SLOT_SIZE)
            }
            None => None,
        }
    }

    /// The offsets that the prologue spills each register argument into,
    /// in argument order.
    pub fn register_params(&self) -> impl Iterator<Item = i32> + '_ {
        self.params.iter().copied()
    }

    /// The total size of every slot, before any alignment.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// How much the prologue has to subtract from `rsp` so that it's still
    /// 16-byte aligned after `pushes` more registers are pushed.
    pub fn allocation_size(&self, pushes: usize) -> i32 {
        let pushed = pushes as i32 * SLOT_SIZE;
        let total = (self.size + pushed + 15) & !15;

        total - pushed
    }

    /// The number of slots for locals and temporaries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
