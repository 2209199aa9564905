//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{MethodBody, Module};
use crate::pass::MethodTransformPass;
use log::debug;

/// Manages running a sequence of passes over method bodies.
///
/// An important note is that this is actually a method pass itself, it's a
/// pass that simply runs other passes in the order they were added.
#[derive(Default)]
pub struct MethodPassManager {
    passes: Vec<Box<dyn MethodTransformPass>>,
}

impl MethodPassManager {
    /// Creates a new, empty, pass manager.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Adds a pass to the end of the pipeline.
    pub fn add_pass<T: MethodTransformPass + 'static>(&mut self, pass: T) {
        self.passes.push(Box::new(pass));
    }

    /// Adds an already-boxed pass to the end of the pipeline.
    pub fn add_boxed_pass(&mut self, pass: Box<dyn MethodTransformPass>) {
        self.passes.push(pass);
    }

    /// The names of the passes, in the order they run.
    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|pass| pass.name())
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Runs the pipeline over every method of `module`, one method at a
    /// time. Returns whether any method changed.
    pub fn run_on_module(&mut self, module: &mut Module) -> bool {
        let mut changed = false;

        for body in module.methods_mut() {
            changed |= self.run(body);
        }

        changed
    }
}

impl MethodTransformPass for MethodPassManager {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn run(&mut self, body: &mut MethodBody) -> bool {
        let mut changed = false;

        for pass in self.passes.iter_mut() {
            let this = pass.run(body);

            debug!(
                "pass '{}' {} method {:?}",
                pass.name(),
                if this { "changed" } else { "left alone" },
                body.name()
            );

            changed |= this;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::MethodBuilder;
    use crate::utility::StringPool;

    struct Counting(&'static str, bool);

    impl MethodTransformPass for Counting {
        fn name(&self) -> &'static str {
            self.0
        }

        fn run(&mut self, _: &mut MethodBody) -> bool {
            self.1
        }
    }

    #[test]
    fn changes_are_combined() {
        let mut strings = StringPool::new();
        let mut body = MethodBuilder::new(strings.insert("f")).finish();
        let mut pm = MethodPassManager::new();

        assert!(!pm.run(&mut body));

        pm.add_pass(Counting("a", false));
        pm.add_pass(Counting("b", true));

        assert!(pm.run(&mut body));
        assert_eq!(pm.pass_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
