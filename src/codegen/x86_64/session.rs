//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::codegen::x86_64::{AsmFunction, AsmProgram, AsmString};
use crate::utility::SaHashMap;
use std::collections::BTreeSet;

/// Everything emission accumulates across methods: the data section, the
/// read-only string section and the set of external symbols.
///
/// One session is threaded through the emission of a whole program, and
/// methods are emitted one after another.
#[derive(Clone, Debug, Default)]
pub struct Session {
    globals: SaHashMap<String, String>,
    data: Vec<String>,
    strings: SaHashMap<String, String>,
    rodata: Vec<AsmString>,
    string_counter: usize,
    externs: BTreeSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives the global `name` a slot in the data section, labelled
    /// `field<n>` in declaration order. Declaring a name again returns the
    /// existing label.
    pub fn declare_global(&mut self, name: &str) -> &str {
        if !self.globals.contains_key(name) {
            let label = format!("field{}", self.data.len());

            self.data.push(label.clone());
            self.globals.insert(name.to_owned(), label);
        }

        &self.globals[name]
    }

    /// The data label of the global `name`, if it was declared.
    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    /// Gets the read-only label holding `text`, adding it if this is the
    /// first time it's been seen.
    ///
    /// Labels are `s_` plus the first 8 alphanumeric characters of the
    /// string plus a counter, so two literals that sanitize to the same
    /// prefix still get different labels.
    pub fn intern_string(&mut self, text: &str) -> &str {
        if !self.strings.contains_key(text) {
            let prefix: String = text
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .take(8)
                .collect();
            let label = format!("s_{prefix}{}", self.string_counter);

            self.string_counter += 1;
            self.rodata.push(AsmString {
                label: label.clone(),
                text: text.to_owned(),
            });
            self.strings.insert(text.to_owned(), label);
        }

        &self.strings[text]
    }

    /// Records that `name` is defined outside of the program.
    pub fn add_extern(&mut self, name: &str) {
        if !self.externs.contains(name) {
            self.externs.insert(name.to_owned());
        }
    }

    pub fn externs(&self) -> impl Iterator<Item = &str> + '_ {
        self.externs.iter().map(String::as_str)
    }

    /// Puts the accumulated sections together with the code for every method.
    pub fn finish(self, text: Vec<AsmFunction>) -> AsmProgram {
        AsmProgram {
            externs: self.externs.into_iter().collect(),
            data: self.data,
            rodata: self.rodata,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_get_sequential_labels() {
        let mut session = Session::new();

        assert_eq!(session.declare_global("a"), "field0");
        assert_eq!(session.declare_global("b"), "field1");
        assert_eq!(session.declare_global("a"), "field0");
        assert_eq!(session.global("b"), Some("field1"));
        assert_eq!(session.global("c"), None);
    }

    #[test]
    fn string_labels_are_unique_and_deduplicated() {
        let mut session = Session::new();
        let first = session.intern_string("Hello, world!\n").to_owned();
        let second = session.intern_string("Hello world").to_owned();
        let again = session.intern_string("Hello, world!\n").to_owned();

        assert_eq!(first, "s_Hellowor0");
        assert_eq!(second, "s_Hellowor1");
        assert_eq!(first, again);

        let program = session.finish(Vec::new());

        assert_eq!(program.rodata.len(), 2);
    }

    #[test]
    fn externs_are_sorted_and_listed_once() {
        let mut session = Session::new();

        session.add_extern("printf");
        session.add_extern("exit");
        session.add_extern("printf");

        assert_eq!(session.finish(Vec::new()).externs, vec!["exit", "printf"]);
    }
}
