//! `MemOverseer`: a valgrind-style plugin that tracks per-cell definedness
//! and flags out-of-range registers and unsafe writes.

use tracing::warn;

use crate::consts::{Word, RESERVED, SIZE};
use crate::opcode::Mnemonic as M;
use crate::plugin::{Plugin, PluginInitError, VmView};

/// Per-run state: a dense definedness bitmap over the whole address space.
pub struct MemOverseer {
    is_defined: Vec<bool>,
    program_size: usize,
}

impl MemOverseer {
    pub fn new() -> Self {
        Self {
            is_defined: vec![false; SIZE],
            program_size: RESERVED,
        }
    }

    /// Checks that the `n` cells about to be popped from `sp` are in bounds
    /// and defined, warning (non-fatally) otherwise.
    fn check_stack_pop(&self, sp: usize, n: usize) {
        for i in sp..sp + n {
            if i >= SIZE {
                warn!("next instruction will cause stack underflow");
                return;
            }
            if !self.is_defined[i] {
                warn!("next instruction operates with undefined stack element");
                return;
            }
        }
    }
}

impl Default for MemOverseer {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for MemOverseer {
    fn name(&self) -> &str {
        "MemOverseer"
    }

    fn init(&mut self, vm: &VmView) -> Result<(), PluginInitError> {
        // The reference implementation's init infamously fails when reading
        // the program size *succeeds* (an inverted boolean the spec calls
        // out as a bug). This corrects the polarity: init only fails if the
        // program size genuinely cannot be determined.
        self.program_size = vm.program_size();
        Ok(())
    }

    fn before(&mut self, vm: &VmView, opcode: Word) {
        let regs = vm.registers();

        if !(RESERVED..=self.program_size).contains(&regs.ip) {
            warn!(ip = regs.ip, reserved = RESERVED, program_size = self.program_size, "IP out of range [RESERVED, PROGRAM_SIZE]");
        }
        if regs.sp <= self.program_size {
            warn!(sp = regs.sp, program_size = self.program_size, "stack overflow, SP <= PROGRAM_SIZE");
        } else if regs.sp > SIZE {
            warn!(sp = regs.sp, size = SIZE, "stack underflow, SP > SIZE");
        }

        let sp = regs.sp;
        match opcode {
            x if x == M::Add.opcode()
                || x == M::Sub.opcode()
                || x == M::Mul.opcode()
                || x == M::Div.opcode()
                || x == M::Mod.opcode()
                || x == M::Bitand.opcode()
                || x == M::Bitor.opcode()
                || x == M::Bitxor.opcode()
                || x == M::Lshift.opcode()
                || x == M::Rshift.opcode()
                || x == M::Cmp.opcode()
                || x == M::Setsp.opcode()
                || x == M::Out.opcode()
                || x == M::Halt.opcode() =>
            {
                self.check_stack_pop(sp, if x == M::Setsp.opcode() || x == M::Out.opcode() || x == M::Halt.opcode() { 1 } else { 2 });
                if sp < SIZE {
                    self.is_defined[sp] = false;
                }
            }
            x if x == M::Neg.opcode() || x == M::Bitnot.opcode() => {
                self.check_stack_pop(sp, 1);
            }
            x if x == M::Dup.opcode() || x == M::Over.opcode() => {
                self.check_stack_pop(sp, if x == M::Dup.opcode() { 1 } else { 2 });
                if sp >= 1 && sp - 1 < SIZE {
                    self.is_defined[sp - 1] = true;
                }
            }
            x if x == M::Drop.opcode() => {
                if sp < SIZE {
                    self.is_defined[sp] = false;
                }
            }
            x if x == M::Drop2.opcode() => {
                for i in [sp, sp + 1] {
                    if i < SIZE {
                        self.is_defined[i] = false;
                    }
                }
            }
            x if x == M::Swap.opcode() || x == M::Rot.opcode() => {
                self.check_stack_pop(sp, if x == M::Swap.opcode() { 2 } else { 3 });
            }
            x if x == M::Sdrop.opcode() => {
                self.check_stack_pop(sp, 2);
                if sp < SIZE {
                    self.is_defined[sp] = false;
                }
            }
            x if x == M::Load.opcode() => {
                self.check_stack_pop(sp, 1);
                let addr = vm.memory()[sp];
                if addr >= 0 && (addr as usize) < SIZE && !self.is_defined[addr as usize] {
                    warn!("loading variable from undefined element of stack");
                }
            }
            x if x == M::Save.opcode() => {
                self.check_stack_pop(sp, 2);
                let addr = vm.memory()[sp + 1];
                if (addr as usize) <= self.program_size {
                    warn!(addr, "saving word to program memory or reserved memory");
                } else if addr as usize >= SIZE {
                    warn!(addr, "saving word outside of memory");
                }
                if (addr as usize) < SIZE {
                    self.is_defined[addr as usize] = true;
                }
            }
            x if x == M::Getip.opcode() || x == M::Getsp.opcode() || x == M::In.opcode() => {
                if sp >= 1 {
                    self.is_defined[sp - 1] = true;
                }
            }
            x if x == M::Getfp.opcode() => {
                if regs.fp.is_none() {
                    warn!("trying to get FP value but FP is undefined");
                }
                if sp >= 1 {
                    self.is_defined[sp - 1] = true;
                }
            }
            x if x == M::Getrv.opcode() => {
                if regs.rv.is_none() {
                    warn!("trying to get RV value but RV is undefined");
                }
                if sp >= 1 {
                    self.is_defined[sp - 1] = true;
                }
            }
            x if x == M::Setfp.opcode() || x == M::Setrv.opcode() => {
                self.check_stack_pop(sp, 1);
                if sp < SIZE {
                    self.is_defined[sp] = false;
                }
            }
            // JMP/SETIP/RET: pop the target address, net one cell freed.
            x if x == M::Jmp.opcode() => {
                self.check_stack_pop(sp, 1);
                if sp < SIZE {
                    self.is_defined[sp] = false;
                }
            }
            // CALL pops the target address; the return IP written in its
            // place is always well-defined, so no bit needs clearing here.
            x if x == M::Call.opcode() => {
                self.check_stack_pop(sp, 1);
            }
            x if x == M::Jlt.opcode()
                || x == M::Jgt.opcode()
                || x == M::Jeq.opcode()
                || x == M::Jle.opcode()
                || x == M::Jge.opcode()
                || x == M::Jne.opcode() =>
            {
                self.check_stack_pop(sp, 2);
                for i in [sp, sp + 1] {
                    if i < SIZE {
                        self.is_defined[i] = false;
                    }
                }
            }
            // RET2 only requires the return address to be defined, but it
            // drops two cells (the address, plus the frame slot below it).
            x if x == M::Ret2.opcode() => {
                self.check_stack_pop(sp, 1);
                for i in [sp, sp + 1] {
                    if i < SIZE {
                        self.is_defined[i] = false;
                    }
                }
            }
            _ => {
                // Literal push (cmd >= 0).
                if sp >= 1 {
                    self.is_defined[sp - 1] = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Image;
    use crate::interpreter::registers::Registers;

    #[test]
    fn flags_undefined_load() {
        let mut overseer = MemOverseer::new();
        let image = Image::new();
        let mut regs = Registers::new();
        regs.sp = SIZE - 1;
        let vm = VmView::new(&image, &regs);
        overseer.init(&vm).unwrap();
        // No assertion on warn! output here; this exercises the path
        // without panicking on an undefined LOAD source address.
        overseer.before(&vm, M::Load.opcode());
    }
}
