//! `MemoryDump`: prints final register state and a memory dump after
//! execution halts.

use itertools::Itertools;
use tracing::warn;

use crate::consts::{Word, RESERVED};
use crate::plugin::{Plugin, PluginInitError, VmView};

/// Consecutive zero cells at or beyond this count are elided from the dump
/// as a single ellipsis line, matching the reference dumper's output.
const ZERO_RUN_ELISION_THRESHOLD: usize = 9;

pub struct MemoryDump {
    program_size: usize,
}

impl MemoryDump {
    pub fn new() -> Self {
        Self { program_size: RESERVED }
    }
}

impl Default for MemoryDump {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for MemoryDump {
    fn name(&self) -> &str {
        "MemoryDump"
    }

    fn init(&mut self, vm: &VmView) -> Result<(), PluginInitError> {
        self.program_size = vm.program_size();
        Ok(())
    }

    fn after(&mut self, vm: &VmView, _opcode: Word) {
        let regs = vm.registers();
        println!("IP = {}", regs.ip);
        println!("SP = {}", regs.sp);
        match regs.fp {
            Some(v) => println!("FP = {v}"),
            None => println!("FP = undefined"),
        }
        match regs.rv {
            Some(v) => println!("RV = {v}"),
            None => println!("RV = undefined"),
        }

        for (addr, &cell) in vm.memory()[..RESERVED].iter().enumerate() {
            if cell != 0 {
                warn!(addr, value = cell, "reserved memory cell is non-zero");
            }
        }

        println!("memory dump ({} words used):", self.program_size);
        for (is_zero, group) in &vm.memory()[RESERVED..].iter().copied().enumerate().group_by(|&(_, w)| w == 0) {
            let group: Vec<(usize, Word)> = group.collect();
            if is_zero && group.len() >= ZERO_RUN_ELISION_THRESHOLD {
                let (first, _) = group[0];
                let (last, _) = group[group.len() - 1];
                println!("  [{}..{}] = 0 ({} words)", first + RESERVED, last + RESERVED, group.len());
            } else {
                for (addr, value) in group {
                    println!("  [{}] = {value}", addr + RESERVED);
                }
            }
        }
    }
}
