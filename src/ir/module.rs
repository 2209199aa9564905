//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{MethodBody, MethodWriter};
use crate::utility::{Str, StringPool};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A whole lowered program: global fields, methods, and the names both of
/// them refer to.
#[derive(Clone, Debug, Default)]
pub struct Module {
    strings: StringPool,
    globals: Vec<Str>,
    methods: Vec<MethodBody>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every identifier and string literal used by the module.
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut StringPool {
        &mut self.strings
    }

    /// Interns `s` in the module's string pool.
    pub fn intern(&mut self, s: &str) -> Str {
        self.strings.insert(s)
    }

    /// Declares a global field. Declaring the same name twice is a no-op.
    pub fn add_global(&mut self, name: Str) {
        if !self.globals.contains(&name) {
            self.globals.push(name);
        }
    }

    /// Every global field, in declaration order.
    pub fn globals(&self) -> &[Str] {
        &self.globals
    }

    pub fn add_method(&mut self, body: MethodBody) {
        self.methods.push(body);
    }

    /// Every method, in declaration order.
    pub fn methods(&self) -> &[MethodBody] {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut [MethodBody] {
        &mut self.methods
    }

    /// Splits the module so methods can be mutated while names are read.
    pub fn split_mut(&mut self) -> (&StringPool, &mut [MethodBody]) {
        (&self.strings, &mut self.methods)
    }

    /// Finds a method by name.
    pub fn method(&self, name: &str) -> Option<&MethodBody> {
        let name = self.strings.find(name)?;

        self.methods.iter().find(|m| m.name() == name)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for global in self.globals.iter() {
            writeln!(f, "global @{}", &self.strings[*global])?;
        }

        for method in self.methods.iter() {
            writeln!(f)?;
            write!(f, "{}", MethodWriter::new(method, &self.strings))?;
        }

        Ok(())
    }
}
