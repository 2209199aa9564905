//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Common subexpression elimination through value numbering.
//!
//! Two tables cooperate here. The local table numbers values inside one
//! block and remembers which temp holds each number. The global table,
//! [`AvailableExprs`], is the dataflow state: which expressions over
//! locations are still valid, and which locations currently hold their
//! value. Every computation and every copy of a variable also leaves its
//! value in a temp owned by that statement, so later computations can load
//! it instead.
//!
//! Expressions are keyed by the locations they read as written. Together
//! with the per-statement temps this makes each block's transfer a fixed
//! set of kills and gens, and the join a plain intersection, so the solver
//! always reaches a fixpoint. Temps that hold the same expression on
//! different paths into a merge are renamed to one location afterwards.

use crate::analysis::{join_inputs, solve, ControlFlowGraph, DataflowAnalysis, Direction};
use crate::arena::{SecondaryMap, SecondarySet};
use crate::ir::{BinaryOp, Block, Inst, InstData, Loc, LocationData, MethodBody, UnaryOp};
use crate::pass::MethodTransformPass;
use crate::utility::UnionFind;
use log::debug;
use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of a value inside one block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueNumber(u32);

/// An expression over locations. Operands of commutative operators are
/// kept in ascending key order so `a + b` and `b + a` are the same key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    /// A plain copy of a location.
    Leaf(Loc),
    Unary(UnaryOp, Loc),
    Binary(BinaryOp, Loc, Loc),
}

impl Expr {
    /// Builds a binary expression in canonical operand order.
    pub fn binary(op: BinaryOp, lhs: Loc, rhs: Loc) -> Self {
        if op.is_commutative() && rhs < lhs {
            Expr::Binary(op, rhs, lhs)
        } else {
            Expr::Binary(op, lhs, rhs)
        }
    }

    /// Every location the expression reads.
    pub fn mentions(&self) -> SmallVec<[Loc; 2]> {
        match *self {
            Expr::Leaf(loc) | Expr::Unary(_, loc) => smallvec![loc],
            Expr::Binary(_, lhs, rhs) => smallvec![lhs, rhs],
        }
    }

    pub fn mentions_loc(&self, loc: Loc) -> bool {
        self.mentions().contains(&loc)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Leaf(_))
    }
}

/// The expressions available at a program point, and which locations hold
/// the value of each one.
///
/// Both halves are plain sets of facts: "`expr` is available" and "`loc`
/// holds `expr`". An expression can stay available after every location
/// holding it was overwritten, which is what lets two paths that kept the
/// value in different temps still agree on it at a merge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvailableExprs {
    exprs: BTreeMap<Expr, BTreeSet<Loc>>,
    refs: BTreeMap<Loc, Expr>,
    mentions: BTreeMap<Loc, BTreeSet<Expr>>,
}

impl AvailableExprs {
    /// Whether `expr` has been computed on every path here and none of its
    /// operands changed since.
    pub fn contains(&self, expr: &Expr) -> bool {
        self.exprs.contains_key(expr)
    }

    /// The locations holding the value of `expr`, in ascending key order.
    pub fn representatives(&self, expr: &Expr) -> impl Iterator<Item = Loc> + '_ {
        self.exprs.get(expr).into_iter().flatten().copied()
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expr> + '_ {
        self.exprs.keys()
    }

    /// The expression whose value `loc` currently holds, if any.
    pub fn value_of(&self, loc: Loc) -> Option<Expr> {
        self.refs.get(&loc).copied()
    }

    /// Marks `expr` as available without naming a holder for it.
    pub fn make_available(&mut self, expr: Expr) {
        for loc in expr.mentions() {
            self.mentions.entry(loc).or_default().insert(expr);
        }

        self.exprs.entry(expr).or_default();
    }

    /// Records that `rep` now holds the value of `expr`.
    pub fn register(&mut self, expr: Expr, rep: Loc) {
        self.unbind(rep);
        self.make_available(expr);
        self.refs.insert(rep, expr);

        if let Some(reps) = self.exprs.get_mut(&expr) {
            reps.insert(rep);
        }
    }

    /// Records that `loc` was written: every expression reading it is no
    /// longer available, and whatever `loc` used to hold is gone.
    pub fn kill(&mut self, loc: Loc) {
        if let Some(exprs) = self.mentions.get(&loc).cloned() {
            for expr in exprs {
                self.forget(expr);
            }
        }

        self.unbind(loc);
    }

    /// Kills every global location this state knows about. Callees may
    /// write any field.
    pub fn kill_globals(&mut self, body: &MethodBody) {
        let globals: BTreeSet<Loc> = self
            .mentions
            .keys()
            .chain(self.refs.keys())
            .copied()
            .filter(|&loc| body.loc(loc).is_global())
            .collect();

        for global in globals {
            self.kill(global);
        }
    }

    fn unbind(&mut self, rep: Loc) {
        let Some(expr) = self.refs.remove(&rep) else {
            return;
        };

        if let Some(reps) = self.exprs.get_mut(&expr) {
            reps.remove(&rep);
        }
    }

    fn forget(&mut self, expr: Expr) {
        for rep in self.exprs.remove(&expr).into_iter().flatten() {
            self.refs.remove(&rep);
        }

        for loc in expr.mentions() {
            if let Some(exprs) = self.mentions.get_mut(&loc) {
                exprs.remove(&expr);

                if exprs.is_empty() {
                    self.mentions.remove(&loc);
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NumberedExpr {
    Unary(UnaryOp, ValueNumber),
    Binary(BinaryOp, ValueNumber, ValueNumber),
}

/// Value numbers for one block. Numbers name values, not locations, so
/// nothing here needs killing when a location is overwritten except the
/// mapping from that location and the temps it might have been.
#[derive(Default)]
struct LocalTable {
    next: u32,
    numbers: BTreeMap<Loc, ValueNumber>,
    exprs: BTreeMap<NumberedExpr, ValueNumber>,
    temps: BTreeMap<ValueNumber, Loc>,
}

impl LocalTable {
    fn fresh(&mut self) -> ValueNumber {
        self.next += 1;

        ValueNumber(self.next - 1)
    }

    fn number_of(&mut self, loc: Loc) -> ValueNumber {
        if let Some(&vn) = self.numbers.get(&loc) {
            return vn;
        }

        let vn = self.fresh();

        self.numbers.insert(loc, vn);

        vn
    }

    fn number_expr(&mut self, expr: Expr) -> ValueNumber {
        let key = match expr {
            Expr::Leaf(loc) => return self.number_of(loc),
            Expr::Unary(op, loc) => NumberedExpr::Unary(op, self.number_of(loc)),
            Expr::Binary(op, lhs, rhs) => {
                let (mut a, mut b) = (self.number_of(lhs), self.number_of(rhs));

                if op.is_commutative() && b < a {
                    std::mem::swap(&mut a, &mut b);
                }

                NumberedExpr::Binary(op, a, b)
            }
        };

        match self.exprs.get(&key) {
            Some(&vn) => vn,
            None => {
                let vn = self.fresh();

                self.exprs.insert(key, vn);

                vn
            }
        }
    }

    fn define(&mut self, loc: Loc, vn: ValueNumber) {
        self.temps.retain(|_, temp| *temp != loc);
        self.numbers.insert(loc, vn);
    }

    fn forget_globals(&mut self, body: &MethodBody) {
        self.numbers.retain(|&loc, _| !body.loc(loc).is_global());
        self.temps.retain(|_, &mut loc| !body.loc(loc).is_global());
    }
}

#[derive(Copy, Clone, Debug)]
enum Edit {
    /// Replace the value of a save with a load of `from`.
    Reuse { save: Inst, from: Loc },
    /// Copy the destination of a save into `temp` right after it.
    Remember { save: Inst, temp: Loc },
}

struct ValueNumbering {
    // one temp per save site that could need one, made up front so that
    // transfer functions never have to create locations
    site_temps: SecondaryMap<Inst, Loc>,
    temps: SecondarySet<Loc>,
    aliases: UnionFind<Loc>,
    unify: bool,
}

impl ValueNumbering {
    fn prepare(body: &mut MethodBody) -> Self {
        let sites: Vec<Inst> = body
            .layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .filter(|&inst| match body.data(inst) {
                InstData::Save { value, dest } => match body.data(*value) {
                    InstData::Binary { .. } | InstData::Unary { .. } => true,
                    InstData::Load { src } => *src != *dest && is_variable(body, *src),
                    _ => false,
                },
                _ => false,
            })
            .collect();

        let mut site_temps = SecondaryMap::new();

        for site in sites {
            site_temps.insert(site, body.new_temp());
        }

        let temps = body
            .locations()
            .filter(|(_, data)| matches!(data, LocationData::Temp))
            .map(|(loc, _)| loc)
            .collect();

        Self {
            site_temps,
            temps,
            aliases: UnionFind::new(),
            unify: false,
        }
    }

    // keys only depend on the statement, never on the incoming state, so a
    // block's transfer is a fixed set of kills followed by a fixed set of gens
    fn key(&self, body: &MethodBody, value: Inst) -> Option<Expr> {
        let loaded = |inst: Inst| match body.data(inst) {
            InstData::Load { src } => Some(*src),
            _ => None,
        };

        match body.data(value) {
            InstData::Load { src } => Some(Expr::Leaf(*src)),
            InstData::Unary { op, operand } => Some(Expr::Unary(*op, loaded(*operand)?)),
            InstData::Binary { op, lhs, rhs } => Some(Expr::binary(*op, loaded(*lhs)?, loaded(*rhs)?)),
            _ => None,
        }
    }

    fn walk(
        &self,
        body: &MethodBody,
        block: Block,
        mut state: AvailableExprs,
        mut edits: Option<&mut Vec<Edit>>,
    ) -> AvailableExprs {
        let mut local = LocalTable::default();

        for stmt in body.layout().insts_in_block(block) {
            if body.contains_call(stmt) {
                state.kill_globals(body);
                local.forget_globals(body);
            }

            let InstData::Save { value, dest } = *body.data(stmt) else {
                continue;
            };

            let key = self.key(body, value);
            let number = key.map(|key| local.number_expr(key));

            let reuse = key.and_then(|key| {
                let from_local = number
                    .and_then(|vn| local.temps.get(&vn).copied())
                    .filter(|_| !key.is_leaf());

                from_local
                    .into_iter()
                    .chain(state.representatives(&key))
                    .find(|&rep| rep != dest && worth_reusing(body, key, rep))
            });

            if let (Some(from), Some(edits)) = (reuse, edits.as_deref_mut()) {
                edits.push(Edit::Reuse { save: stmt, from });
            }

            state.kill(dest);

            let vn = number.unwrap_or_else(|| local.fresh());

            local.define(dest, vn);

            let Some(key) = key.filter(|key| !key.mentions_loc(dest)) else {
                continue;
            };

            state.register(key, dest);

            // the temp is written whether or not the value was reused, so the
            // facts leaving the block never depend on the facts entering it
            if let Some(&temp) = self.site_temps.get(stmt) {
                state.kill(temp);
                state.register(key, temp);
                local.define(temp, vn);

                if !key.is_leaf() {
                    local.temps.insert(vn, temp);
                }

                if let Some(edits) = edits.as_deref_mut() {
                    edits.push(Edit::Remember { save: stmt, temp });
                }
            }
        }

        state
    }
}

// locations whose value can change, as opposed to immediates and strings
fn is_variable(body: &MethodBody, loc: Loc) -> bool {
    let data = body.loc(loc);

    data.is_allocatable() || data.is_global()
}

// copies are never rewritten to read memory, or to read anything instead of
// an immediate
fn worth_reusing(body: &MethodBody, key: Expr, rep: Loc) -> bool {
    match key {
        Expr::Leaf(src) => is_variable(body, src) && !body.loc(rep).is_global(),
        _ => true,
    }
}

impl DataflowAnalysis for ValueNumbering {
    type State = AvailableExprs;

    const DIRECTION: Direction = Direction::Forward;

    fn initial(&mut self, _: &MethodBody) -> AvailableExprs {
        AvailableExprs::default()
    }

    fn bottom(&mut self, _: &MethodBody) -> AvailableExprs {
        AvailableExprs::default()
    }

    /// Intersects both kinds of fact. Once the solution has converged, an
    /// expression that both sides hold in different temps additionally gets
    /// those temps merged into one location.
    fn join(&mut self, into: &mut AvailableExprs, other: &AvailableExprs) {
        let mut out = AvailableExprs::default();

        for (&expr, mine) in into.exprs.iter() {
            let Some(theirs) = other.exprs.get(&expr) else {
                continue;
            };

            let mut common: Vec<Loc> = mine.intersection(theirs).copied().collect();

            if common.is_empty() && self.unify {
                let first_temp = |reps: &BTreeSet<Loc>| reps.iter().copied().find(|&loc| self.temps.contains(loc));

                if let (Some(a), Some(b)) = (first_temp(mine), first_temp(theirs)) {
                    self.aliases.union(a, b);
                    common.push(a.min(b));
                }
            }

            out.make_available(expr);

            for rep in common {
                out.register(expr, rep);
            }
        }

        *into = out;
    }

    fn transfer(&mut self, body: &MethodBody, block: Block, input: &AvailableExprs) -> AvailableExprs {
        self.walk(body, block, input.clone(), None)
    }
}

/// Runs value numbering over `body`, reusing computed values wherever an
/// equal expression is still available. Returns how many computations were
/// replaced.
pub fn eliminate_common_subexpressions(body: &mut MethodBody) -> usize {
    let cfg = ControlFlowGraph::compute(body);
    let mut vn = ValueNumbering::prepare(body);
    let solution = solve(body, &cfg, &mut vn);
    let mut edits = Vec::new();

    // only the merges of the converged solution decide which temps alias
    vn.unify = true;

    for block in cfg.reverse_postorder() {
        let input = join_inputs(body, &cfg, &mut vn, &solution, block);

        vn.walk(body, block, input, Some(&mut edits));
    }

    let mut reused = 0;

    for edit in edits {
        match edit {
            Edit::Reuse { save, from } => {
                let load = body.create_inst(InstData::Load { src: from });

                if let InstData::Save { value, .. } = body.data_mut(save) {
                    *value = load;
                }

                debug!("cse: {save:?} now reuses {from:?}");
                reused += 1;
            }
            Edit::Remember { save, temp } => {
                let InstData::Save { dest, .. } = *body.data(save) else {
                    continue;
                };

                let load = body.create_inst(InstData::Load { src: dest });
                let copy = body.create_inst(InstData::Save { value: load, dest: temp });

                body.layout_mut().insert_inst_after(copy, save);
            }
        }
    }

    if !vn.aliases.is_trivial() {
        rename_aliases(body, &mut vn.aliases);
    }

    reused
}

fn rename_aliases(body: &mut MethodBody, aliases: &mut UnionFind<Loc>) {
    let stmts: Vec<Inst> = body
        .layout()
        .blocks()
        .flat_map(|bb| body.layout().insts_in_block(bb))
        .collect();

    for stmt in stmts {
        for inst in body.value_tree(stmt) {
            match body.data_mut(inst) {
                InstData::Load { src } => *src = aliases.find(*src),
                InstData::Save { dest, .. } => *dest = aliases.find(*dest),
                InstData::Use { loc } => *loc = aliases.find(*loc),
                InstData::Call { args, .. } => {
                    for arg in args.iter_mut() {
                        *arg = aliases.find(*arg);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Common subexpression elimination as a pass.
pub struct CommonSubexpressionEliminationPass;

impl MethodTransformPass for CommonSubexpressionEliminationPass {
    fn name(&self) -> &'static str {
        "cse"
    }

    fn run(&mut self, body: &mut MethodBody) -> bool {
        // inserting temps changes the body even when nothing is reused, but
        // that alone isn't worth reporting
        eliminate_common_subexpressions(body) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assert_fixpoint;
    use crate::ir::MethodBuilder;
    use crate::lower::lower_program;
    use crate::lower::tests::loops_with_calls;
    use crate::utility::StringPool;

    fn binaries(body: &MethodBody) -> usize {
        body.layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .filter(|&i| match body.data(i) {
                InstData::Save { value, .. } => matches!(body.data(*value), InstData::Binary { .. }),
                _ => false,
            })
            .count()
    }

    fn save_value(body: &MethodBody, dest: Loc) -> InstData {
        body.layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .find_map(|i| match body.data(i) {
                InstData::Save { value, dest: d } if *d == dest => Some(body.data(*value).clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn repeated_expression_reuses_first_result() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let bb = b.param(strings.insert("b"));
        let c = b.local(strings.insert("c"));
        let d = b.local(strings.insert("d"));

        let first = b.binary(BinaryOp::Add, a, bb);
        b.save(first, c);
        let second = b.binary(BinaryOp::Add, bb, a);
        b.save(second, d);
        b.ret(Some(d));

        let mut body = b.finish();

        assert_eq!(eliminate_common_subexpressions(&mut body), 1);
        assert_eq!(binaries(&body), 1);
        assert!(matches!(save_value(&body, d), InstData::Load { .. }));
    }

    #[test]
    fn redefined_operand_kills_expression() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let bb = b.param(strings.insert("b"));
        let c = b.local(strings.insert("c"));
        let d = b.local(strings.insert("d"));
        let one = b.constant(1);

        let first = b.binary(BinaryOp::Add, a, bb);
        b.save(first, c);
        b.copy(one, a);
        let second = b.binary(BinaryOp::Add, a, bb);
        b.save(second, d);
        b.ret(Some(d));

        let mut body = b.finish();

        assert_eq!(eliminate_common_subexpressions(&mut body), 0);
        assert_eq!(binaries(&body), 2);
    }

    #[test]
    fn self_referential_expression_is_not_reused() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let one = b.constant(1);

        let first = b.binary(BinaryOp::Add, a, one);
        b.save(first, a);
        let second = b.binary(BinaryOp::Add, a, one);
        b.save(second, a);
        b.ret(Some(a));

        let mut body = b.finish();

        assert_eq!(eliminate_common_subexpressions(&mut body), 0);
        assert_eq!(binaries(&body), 2);
    }

    #[test]
    fn calls_kill_expressions_over_globals() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let g = b.global(strings.insert("g"));
        let c = b.local(strings.insert("c"));
        let d = b.local(strings.insert("d"));
        let one = b.constant(1);

        let first = b.binary(BinaryOp::Add, g, one);
        b.save(first, c);
        let call = b.call(strings.insert("h"), &[], false);
        b.call_stmt(call);
        let second = b.binary(BinaryOp::Add, g, one);
        b.save(second, d);
        b.ret(Some(d));

        let mut body = b.finish();

        assert_eq!(eliminate_common_subexpressions(&mut body), 0);
        assert_eq!(binaries(&body), 2);
    }

    // if (p) { x = a * b } else { y = a * b }; z = a * b
    fn diamond(both: bool) -> (MethodBody, Loc, Block) {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let p = b.param(strings.insert("p"));
        let a = b.param(strings.insert("a"));
        let bb = b.param(strings.insert("b"));
        let x = b.local(strings.insert("x"));
        let y = b.local(strings.insert("y"));
        let z = b.local(strings.insert("z"));
        let otherwise = b.new_label();
        let join = b.new_label();

        b.branch_if_zero(p, otherwise);
        let then = b.binary(BinaryOp::Mul, a, bb);
        b.save(then, x);
        b.jump(join);
        b.label(otherwise);

        if both {
            let value = b.binary(BinaryOp::Mul, a, bb);
            b.save(value, y);
        } else {
            b.copy(a, y);
        }

        b.label(join);
        let value = b.binary(BinaryOp::Mul, a, bb);
        b.save(value, z);
        b.ret(Some(z));

        let body = b.finish();
        let merge = body.label_block(join).unwrap();

        (body, z, merge)
    }

    #[test]
    fn expression_on_both_paths_is_available_at_merge() {
        let (mut body, z, merge) = diamond(true);
        let cfg = ControlFlowGraph::compute(&body);
        let mut vn = ValueNumbering::prepare(&mut body);
        let solution = solve(&body, &cfg, &mut vn);
        let params = body.params().to_vec();
        let expr = Expr::binary(BinaryOp::Mul, params[1], params[2]);

        assert!(solution.input(merge).contains(&expr));

        assert_eq!(eliminate_common_subexpressions(&mut body), 1);
        assert!(matches!(save_value(&body, z), InstData::Load { .. }));
    }

    #[test]
    fn expression_on_one_path_is_not_available_at_merge() {
        let (mut body, z, merge) = diamond(false);
        let cfg = ControlFlowGraph::compute(&body);
        let mut vn = ValueNumbering::prepare(&mut body);
        let solution = solve(&body, &cfg, &mut vn);
        let params = body.params().to_vec();
        let expr = Expr::binary(BinaryOp::Mul, params[1], params[2]);

        assert!(!solution.input(merge).contains(&expr));

        assert_eq!(eliminate_common_subexpressions(&mut body), 0);
        assert!(matches!(save_value(&body, z), InstData::Binary { .. }));
    }

    #[test]
    fn merged_temps_are_renamed_to_one_location() {
        let (mut body, z, _) = diamond(true);

        eliminate_common_subexpressions(&mut body);

        let InstData::Load { src } = save_value(&body, z) else {
            panic!("expected a load");
        };

        let writers = body
            .layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .filter(|&i| body.data(i).def() == Some(src))
            .count();

        assert_eq!(body.loc(src), LocationData::Temp);
        assert_eq!(writers, 2);
    }

    #[test]
    fn kill_removes_mentions_and_bindings() {
        let mut strings = StringPool::new();
        let mut body = MethodBody::new(strings.insert("f"));
        let a = body.new_local(strings.insert("a"));
        let b = body.new_local(strings.insert("b"));
        let c = body.new_local(strings.insert("c"));
        let mut state = AvailableExprs::default();
        let sum = Expr::binary(BinaryOp::Add, a, b);

        state.register(sum, c);
        state.register(Expr::Leaf(a), b);

        assert_eq!(state.value_of(b), Some(Expr::Leaf(a)));

        state.kill(a);

        assert!(!state.contains(&sum));
        assert_eq!(state.value_of(b), None);
        assert_eq!(state, AvailableExprs::default());
    }

    #[test]
    fn repeated_copy_reuses_the_first_destination() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let a = b.param(strings.insert("a"));
        let c = b.local(strings.insert("c"));
        let d = b.local(strings.insert("d"));

        b.copy(a, c);
        b.copy(a, d);
        b.ret(Some(d));

        let mut body = b.finish();

        assert_eq!(eliminate_common_subexpressions(&mut body), 1);
        assert_eq!(save_value(&body, d), InstData::Load { src: c });

        // each copy also left its value in a temp
        let remembered = body
            .layout()
            .blocks()
            .flat_map(|bb| body.layout().insts_in_block(bb))
            .filter_map(|i| body.data(i).def())
            .filter(|&loc| body.loc(loc) == LocationData::Temp)
            .count();

        assert_eq!(remembered, 2);
    }

    #[test]
    fn copies_of_constants_are_left_alone() {
        let mut strings = StringPool::new();
        let mut b = MethodBuilder::new(strings.insert("f"));
        let c = b.local(strings.insert("c"));
        let d = b.local(strings.insert("d"));
        let five = b.constant(5);

        b.copy(five, c);
        b.copy(five, d);
        b.ret(Some(d));

        let mut body = b.finish();

        assert_eq!(eliminate_common_subexpressions(&mut body), 0);
        assert_eq!(save_value(&body, d), InstData::Load { src: five });
    }

    #[test]
    fn solution_is_a_fixpoint_on_loops_with_calls() {
        let module = lower_program(&loops_with_calls());

        for body in module.methods() {
            let mut body = body.clone();
            let cfg = ControlFlowGraph::compute(&body);
            let mut vn = ValueNumbering::prepare(&mut body);
            let solution = assert_fixpoint(&body, &cfg, &mut vn);

            // every fact is generated by a statement, so a few passes over
            // the blocks are always enough
            let blocks = body.layout().blocks().count();

            assert!(solution.iterations() <= blocks * 8, "{} iterations", solution.iterations());
        }
    }

    #[test]
    fn loops_with_calls_compile_with_every_pass() {
        let program = loops_with_calls();
        let options = crate::CompileOptions::default();

        assert!(crate::compile(&program, &options).is_ok());
    }
}
