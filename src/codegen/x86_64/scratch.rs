//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::codegen::x86_64::{Reg, SCRATCH_REGS};

/// The pool of registers used for values that only live inside one
/// statement.
///
/// The pool is tiny, so instructions have to release their inputs before
/// taking their output. That lets `r10 = r10 + r11` reuse an input register
/// instead of needing a third one.
#[derive(Clone, Debug)]
pub struct ScratchPool {
    free: [bool; SCRATCH_REGS.len()],
}

impl ScratchPool {
    /// Creates a pool with every scratch register free.
    pub fn new() -> Self {
        Self {
            free: [true; SCRATCH_REGS.len()],
        }
    }

    /// Takes the first free scratch register, or `None` if every one is
    /// already in use.
    pub fn take(&mut self) -> Option<Reg> {
        let index = self.free.iter().position(|&free| free)?;

        self.free[index] = false;

        Some(SCRATCH_REGS[index])
    }

    /// Gives `reg` back. Releasing a register that isn't part of the pool
    /// does nothing, so callers can release any value's register.
    pub fn release(&mut self, reg: Reg) {
        if let Some(index) = SCRATCH_REGS.iter().position(|&r| r == reg) {
            self.free[index] = true;
        }
    }

    /// Whether `reg` belongs to the pool at all.
    pub fn owns(&self, reg: Reg) -> bool {
        SCRATCH_REGS.contains(&reg)
    }

    /// Frees everything, used between statements.
    pub fn reset(&mut self) {
        self.free = [true; SCRATCH_REGS.len()];
    }

    pub fn available(&self) -> usize {
        self.free.iter().filter(|&&free| free).count()
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_runs_out_after_two() {
        let mut pool = ScratchPool::new();

        assert_eq!(pool.take(), Some(Reg::R10));
        assert_eq!(pool.take(), Some(Reg::R11));
        assert_eq!(pool.take(), None);
    }

    #[test]
    fn released_input_is_reused_for_output() {
        let mut pool = ScratchPool::new();
        let lhs = pool.take().unwrap();
        let rhs = pool.take().unwrap();

        pool.release(lhs);
        pool.release(rhs);

        assert_eq!(pool.take(), Some(lhs));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn releasing_other_registers_is_ignored() {
        let mut pool = ScratchPool::new();

        pool.take();
        pool.take();
        pool.release(Reg::R12);

        assert_eq!(pool.available(), 0);
        assert!(!pool.owns(Reg::R12));

        pool.reset();

        assert_eq!(pool.available(), 2);
    }
}
