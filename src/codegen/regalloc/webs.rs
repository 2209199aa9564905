//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::Liveness;
use crate::arena::{ArenaMap, SecondaryMap};
use crate::arena_key;
use crate::ir::{Inst, Loc, MethodBody};
use crate::utility::UnionFind;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

arena_key! {
    /// One allocatable value: a set of definitions of a location together
    /// with every read they reach.
    pub struct Web;
}

/// The definitions and reads making up a [`Web`].
///
/// Reads are the records performing them (`Load`, `Use` or `Call`), and
/// are always reads of [`Self::loc`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebData {
    loc: Loc,
    defs: BTreeSet<Inst>,
    uses: BTreeSet<Inst>,
}

impl WebData {
    fn new(loc: Loc) -> Self {
        Self {
            loc,
            defs: BTreeSet::new(),
            uses: BTreeSet::new(),
        }
    }

    /// The location whose value this is.
    pub fn loc(&self) -> Loc {
        self.loc
    }

    pub fn defs(&self) -> impl Iterator<Item = Inst> + '_ {
        self.defs.iter().copied()
    }

    pub fn uses(&self) -> impl Iterator<Item = Inst> + '_ {
        self.uses.iter().copied()
    }

    /// Whether the web only has reads, i.e. they read a value nothing in the
    /// method wrote. These never get a register.
    pub fn is_defless(&self) -> bool {
        self.defs.is_empty()
    }

    /// How many times the web is accessed in total.
    pub fn accesses(&self) -> usize {
        self.defs.len() + self.uses.len()
    }
}

/// Every web of a method.
#[derive(Clone, Debug)]
pub struct Webs {
    webs: ArenaMap<Web, WebData>,
    by_def: SecondaryMap<Inst, Web>,
    by_use: BTreeMap<(Inst, Loc), Web>,
}

impl Webs {
    /// Builds webs out of the def-use pairs of `liveness`: any two
    /// definitions that reach a common read end up in the same web.
    pub fn compute(body: &MethodBody, liveness: &Liveness) -> Self {
        let mut sets = UnionFind::new();
        let mut first_def = BTreeMap::new();

        for (def, reads) in liveness.definitions() {
            let Some(loc) = body.data(def).def() else {
                continue;
            };

            for &read in reads {
                match first_def.entry((read, loc)) {
                    Entry::Vacant(entry) => {
                        entry.insert(def);
                    }
                    Entry::Occupied(entry) => {
                        sets.union(*entry.get(), def);
                    }
                }
            }
        }

        let mut webs = ArenaMap::new();
        let mut by_def = SecondaryMap::new();
        let mut by_use = BTreeMap::new();
        let mut roots = BTreeMap::new();

        for (def, reads) in liveness.definitions() {
            let Some(loc) = body.data(def).def() else {
                continue;
            };

            let web = *roots
                .entry(sets.find(def))
                .or_insert_with(|| webs.insert(WebData::new(loc)));

            webs[web].defs.insert(def);
            webs[web].uses.extend(reads.iter().copied());
            by_def.insert(def, web);

            for &read in reads {
                by_use.insert((read, loc), web);
            }
        }

        // reads that nothing reaches are grouped per location
        let mut defless = BTreeMap::new();

        for block in body.layout().blocks() {
            for stmt in body.layout().insts_in_block(block) {
                for (read, loc) in body.reads(stmt) {
                    if !body.loc(loc).is_allocatable() || by_use.contains_key(&(read, loc)) {
                        continue;
                    }

                    let web = *defless
                        .entry(loc)
                        .or_insert_with(|| webs.insert(WebData::new(loc)));

                    webs[web].uses.insert(read);
                    by_use.insert((read, loc), web);
                }
            }
        }

        Self {
            webs,
            by_def,
            by_use,
        }
    }

    /// The web that the definition `def` belongs to.
    pub fn web_of_def(&self, def: Inst) -> Option<Web> {
        self.by_def.get(def).copied()
    }

    /// The web that the read of `loc` by `inst` belongs to.
    pub fn web_of_use(&self, inst: Inst, loc: Loc) -> Option<Web> {
        self.by_use.get(&(inst, loc)).copied()
    }

    pub fn len(&self) -> usize {
        self.webs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.webs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Web, &WebData)> + '_ {
        self.webs.iter()
    }
}

impl std::ops::Index<Web> for Webs {
    type Output = WebData;

    fn index(&self, web: Web) -> &WebData {
        &self.webs[web]
    }
}
