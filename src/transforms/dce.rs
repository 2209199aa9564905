//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{ControlFlowGraph, Liveness};
use crate::ir::{Inst, InstData, MethodBody};
use crate::pass::MethodTransformPass;
use log::debug;

/// Dead code elimination driven by liveness.
///
/// A save to a local or temp whose value reaches no read is deleted along
/// with everything it computed. Saves to globals always stay, since other
/// methods can observe them. When the deleted value was a call, the call
/// stays behind as a statement so its side effects are kept.
///
/// Deleting a save can make the saves feeding it dead in turn, so this
/// repeats until a round deletes nothing.
pub struct DeadCodeEliminationPass;

/// Runs dead code elimination to a fixpoint, returning how many saves were
/// deleted in total.
pub fn eliminate_dead_code(body: &mut MethodBody) -> usize {
    let cfg = ControlFlowGraph::compute(body);
    let mut deleted = 0;

    loop {
        let liveness = Liveness::compute(body, &cfg);
        let dead: Vec<Inst> = body
            .layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .filter(|&stmt| liveness.is_dead(stmt) || is_self_copy(body, stmt))
            .collect();

        if dead.is_empty() {
            break;
        }

        for save in dead.iter().copied() {
            delete_save(body, save);
        }

        deleted += dead.len();
    }

    deleted
}

// `x = x` for a method-private `x` does nothing at all
fn is_self_copy(body: &MethodBody, stmt: Inst) -> bool {
    match body.data(stmt) {
        InstData::Save { value, dest } => {
            matches!(body.data(*value), InstData::Load { src } if src == dest)
                && body.loc(*dest).is_allocatable()
        }
        _ => false,
    }
}

fn delete_save(body: &mut MethodBody, save: Inst) {
    let InstData::Save { value, .. } = *body.data(save) else {
        return;
    };

    if matches!(body.data(value), InstData::Call { .. }) {
        debug!("dce: keeping the call of dead save {save:?}");

        body.layout_mut().replace_inst(save, value);
    } else {
        debug!("dce: deleting {save:?}");

        body.layout_mut().remove_inst(save);
    }
}

impl MethodTransformPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run(&mut self, body: &mut MethodBody) -> bool {
        eliminate_dead_code(body) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Loc, MethodBuilder};
    use crate::utility::StringPool;

    fn writes(body: &MethodBody, loc: Loc) -> usize {
        body.layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .filter(|&i| body.data(i).def() == Some(loc))
            .count()
    }

    #[test]
    fn unused_local_is_deleted_with_its_operands() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let x = b.local(strings.insert("x"));
        let one = b.constant(1);

        let sum = b.binary(BinaryOp::Add, a, one);
        b.save(sum, x);
        b.ret(None);

        let mut body = b.finish();

        // the add goes first, which then leaves the parameter save dead
        assert_eq!(eliminate_dead_code(&mut body), 2);
        assert_eq!(writes(&body, x), 0);
        assert_eq!(writes(&body, a), 0);
        assert_eq!(body.layout().len_insts(), 1);
    }

    #[test]
    fn global_writes_survive() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let g = b.global(strings.insert("g"));
        let one = b.constant(1);

        b.copy(one, g);
        b.ret(None);

        let mut body = b.finish();

        assert_eq!(eliminate_dead_code(&mut body), 0);
        assert_eq!(writes(&body, g), 1);
    }

    #[test]
    fn dead_call_result_keeps_the_call() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let x = b.local(strings.insert("x"));
        let call = b.call(strings.insert("h"), &[], false);

        b.save(call, x);
        b.ret(None);

        let mut body = b.finish();

        assert_eq!(eliminate_dead_code(&mut body), 1);
        assert_eq!(writes(&body, x), 0);

        let entry = body.layout().entry_block().unwrap();
        let first = body.layout().block_first_inst(entry).unwrap();

        assert_eq!(first, call);
        assert!(body.layout().is_inst_inserted(call));
    }

    #[test]
    fn live_definitions_are_kept() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let x = b.local(strings.insert("x"));

        b.copy(a, x);
        b.copy(x, x);
        b.ret(Some(x));

        let mut body = b.finish();

        // only the self copy goes
        assert_eq!(eliminate_dead_code(&mut body), 1);
        assert_eq!(writes(&body, x), 1);
        assert_eq!(writes(&body, a), 1);
    }
}
