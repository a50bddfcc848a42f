//! Fetch-decode-execute loop over a translated [`Image`].

pub mod error;
pub mod registers;

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::consts::Word;
use crate::image::Image;
use crate::opcode::Mnemonic;
use crate::plugin::{PluginHost, VmView};

pub use error::RunError;
pub use registers::Registers;

mod op {
    use super::Mnemonic as M;
    pub const ADD: i32 = M::Add.opcode();
    pub const SUB: i32 = M::Sub.opcode();
    pub const MUL: i32 = M::Mul.opcode();
    pub const DIV: i32 = M::Div.opcode();
    pub const MOD: i32 = M::Mod.opcode();
    pub const NEG: i32 = M::Neg.opcode();
    pub const BITAND: i32 = M::Bitand.opcode();
    pub const BITOR: i32 = M::Bitor.opcode();
    pub const BITXOR: i32 = M::Bitxor.opcode();
    pub const BITNOT: i32 = M::Bitnot.opcode();
    pub const LSHIFT: i32 = M::Lshift.opcode();
    pub const RSHIFT: i32 = M::Rshift.opcode();
    pub const DUP: i32 = M::Dup.opcode();
    pub const DROP: i32 = M::Drop.opcode();
    pub const SWAP: i32 = M::Swap.opcode();
    pub const ROT: i32 = M::Rot.opcode();
    pub const OVER: i32 = M::Over.opcode();
    pub const SDROP: i32 = M::Sdrop.opcode();
    pub const DROP2: i32 = M::Drop2.opcode();
    pub const LOAD: i32 = M::Load.opcode();
    pub const SAVE: i32 = M::Save.opcode();
    pub const GETIP: i32 = M::Getip.opcode();
    pub const GETSP: i32 = M::Getsp.opcode();
    pub const GETFP: i32 = M::Getfp.opcode();
    pub const GETRV: i32 = M::Getrv.opcode();
    pub const SETSP: i32 = M::Setsp.opcode();
    pub const SETFP: i32 = M::Setfp.opcode();
    pub const SETRV: i32 = M::Setrv.opcode();
    pub const CMP: i32 = M::Cmp.opcode();
    /// Shared numeric value for `JMP`/`SETIP`/`RET`.
    pub const JMP: i32 = M::Jmp.opcode();
    pub const JLT: i32 = M::Jlt.opcode();
    pub const JGT: i32 = M::Jgt.opcode();
    pub const JEQ: i32 = M::Jeq.opcode();
    pub const JLE: i32 = M::Jle.opcode();
    pub const JGE: i32 = M::Jge.opcode();
    pub const JNE: i32 = M::Jne.opcode();
    pub const CALL: i32 = M::Call.opcode();
    pub const RET2: i32 = M::Ret2.opcode();
    pub const IN: i32 = M::In.opcode();
    pub const OUT: i32 = M::Out.opcode();
    pub const HALT: i32 = M::Halt.opcode();
}

/// Runtime knobs the CLI (or a test) sets for one execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Pause for one byte on `input` after every instruction's after-hooks.
    pub step_by_step: bool,
}

/// Owns the translated image and the four architectural registers, and
/// drives the fetch-decode-execute loop.
pub struct Interpreter {
    image: Image,
    registers: Registers,
}

impl Interpreter {
    pub fn new(image: Image) -> Self {
        Self { image, registers: Registers::new() }
    }

    pub const fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    fn view(&self) -> VmView<'_> {
        VmView::new(&self.image, &self.registers)
    }

    fn push(&mut self, value: Word) {
        self.registers.sp -= 1;
        self.image.write(self.registers.sp, value);
    }

    fn pop(&mut self) -> Word {
        let value = self.image.read(self.registers.sp);
        self.registers.sp += 1;
        value
    }

    /// Runs until `HALT` or a fatal [`RunError`], calling every registered
    /// plugin's hooks around each instruction.
    pub fn run<R: Read, W: Write>(
        &mut self,
        options: RunOptions,
        host: &mut PluginHost,
        input: &mut R,
        output: &mut W,
    ) -> Result<Word, RunError> {
        host.init_all(&self.view())?;

        let mut step = 1usize;
        loop {
            let cmd = self.image.read(self.registers.ip);
            self.registers.ip += 1;

            host.before_all(&self.view(), cmd);

            if let Some(result) = self.execute(cmd, input, output)? {
                return Ok(result);
            }

            host.after_all(&self.view(), cmd);

            if options.step_by_step {
                writeln!(output, "step {step} completed, press <Enter> to proceed")?;
                output.flush()?;
                let mut buf = [0u8; 1];
                let _ = input.read(&mut buf);
            }
            step += 1;
        }
    }

    /// Executes one fetched opcode. Returns `Ok(Some(value))` on `HALT`.
    fn execute<R: Read, W: Write>(&mut self, cmd: Word, input: &mut R, output: &mut W) -> Result<Option<Word>, RunError> {
        match cmd {
            op::ADD => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_add(y));
            }
            op::SUB => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_sub(y));
            }
            op::MUL => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_mul(y));
            }
            op::DIV => {
                let y = self.pop();
                let x = self.pop();
                if y == 0 {
                    return Err(RunError::DivisionByZero);
                }
                self.push(x.wrapping_div(y));
            }
            op::MOD => {
                let y = self.pop();
                let x = self.pop();
                if y == 0 {
                    return Err(RunError::DivisionByZero);
                }
                self.push(x.wrapping_rem(y));
            }
            op::NEG => {
                let x = self.pop();
                self.push(x.wrapping_neg());
            }
            op::BITAND => {
                let y = self.pop();
                let x = self.pop();
                self.push(x & y);
            }
            op::BITOR => {
                let y = self.pop();
                let x = self.pop();
                self.push(x | y);
            }
            op::BITXOR => {
                let y = self.pop();
                let x = self.pop();
                self.push(x ^ y);
            }
            op::BITNOT => {
                let x = self.pop();
                self.push(!x);
            }
            op::LSHIFT => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_shl(y as u32));
            }
            op::RSHIFT => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_shr(y as u32));
            }
            op::DUP => {
                let x = self.image.read(self.registers.sp);
                self.push(x);
            }
            op::DROP => {
                self.registers.sp += 1;
            }
            op::SWAP => {
                let y = self.pop();
                let x = self.pop();
                self.push(y);
                self.push(x);
            }
            op::ROT => {
                let z = self.pop();
                let y = self.pop();
                let x = self.pop();
                self.push(y);
                self.push(z);
                self.push(x);
            }
            op::OVER => {
                let y = self.pop();
                let x = self.pop();
                self.push(x);
                self.push(y);
                self.push(x);
            }
            op::SDROP => {
                let y = self.pop();
                let _x = self.pop();
                self.push(y);
            }
            op::DROP2 => {
                self.registers.sp += 2;
            }
            op::LOAD => {
                let a = self.pop();
                self.push(self.image.read(a as usize));
            }
            op::SAVE => {
                let v = self.pop();
                let a = self.pop();
                self.image.write(a as usize, v);
            }
            op::GETIP => {
                let ip = self.registers.ip as Word;
                self.push(ip);
            }
            op::GETSP => {
                let sp = self.registers.sp as Word;
                self.push(sp);
            }
            op::GETFP => {
                if self.registers.fp.is_none() {
                    warn!("GETFP read while FP is undefined");
                }
                self.push(self.registers.fp.unwrap_or_default());
            }
            op::GETRV => {
                if self.registers.rv.is_none() {
                    warn!("GETRV read while RV is undefined");
                }
                self.push(self.registers.rv.unwrap_or_default());
            }
            op::SETSP => {
                let a = self.pop();
                self.registers.sp = a as usize;
            }
            op::SETFP => {
                let a = self.pop();
                self.registers.fp = Some(a);
            }
            op::SETRV => {
                let a = self.pop();
                self.registers.rv = Some(a);
            }
            op::CMP => {
                let y = self.pop();
                let x = self.pop();
                self.push(match x.cmp(&y) {
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Greater => 1,
                });
            }
            // JMP, SETIP, and RET all decode to this same value.
            op::JMP => {
                let a = self.pop();
                self.registers.ip = a as usize;
            }
            op::JLT => {
                let a = self.pop();
                let x = self.pop();
                if x < 0 {
                    self.registers.ip = a as usize;
                }
            }
            op::JGT => {
                let a = self.pop();
                let x = self.pop();
                if x > 0 {
                    self.registers.ip = a as usize;
                }
            }
            op::JEQ => {
                let a = self.pop();
                let x = self.pop();
                if x == 0 {
                    self.registers.ip = a as usize;
                }
            }
            op::JLE => {
                let a = self.pop();
                let x = self.pop();
                if x <= 0 {
                    self.registers.ip = a as usize;
                }
            }
            op::JGE => {
                let a = self.pop();
                let x = self.pop();
                if x >= 0 {
                    self.registers.ip = a as usize;
                }
            }
            op::JNE => {
                let a = self.pop();
                let x = self.pop();
                if x != 0 {
                    self.registers.ip = a as usize;
                }
            }
            op::CALL => {
                let a = self.pop();
                let ip = self.registers.ip as Word;
                self.push(ip);
                self.registers.ip = a as usize;
            }
            op::RET2 => {
                let a = self.pop();
                self.registers.sp += 1;
                self.registers.ip = a as usize;
            }
            op::IN => {
                let mut buf = [0u8; 1];
                let value = match input.read(&mut buf)? {
                    1 => buf[0] as Word,
                    _ => -1,
                };
                self.push(value);
            }
            op::OUT => {
                let c = self.pop();
                output.write_all(&[c as u8])?;
                output.flush()?;
            }
            op::HALT => {
                let value = self.pop();
                debug!(value, "halt");
                return Ok(Some(value));
            }
            _ if cmd >= 0 => {
                // A non-negative word at IP is not an instruction: push it.
                self.push(cmd);
            }
            _ => return Err(RunError::UnknownOpcode(cmd)),
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::RESERVED;
    use crate::translator::translate_files;
    use quickcheck_macros::quickcheck;
    use std::io::Cursor;

    fn run_source(src: &str, stdin: &[u8]) -> (Word, Vec<u8>) {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, src.as_bytes()).unwrap();
        let out = translate_files(&[f.path()]);
        assert!(!out.has_errors(), "{:?}", out.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>());
        let mut interp = Interpreter::new(out.image);
        let mut host = PluginHost::new();
        let mut input = Cursor::new(stdin.to_vec());
        let mut output = Vec::new();
        let result = interp.run(RunOptions::default(), &mut host, &mut input, &mut output).unwrap();
        (result, output)
    }

    #[test]
    fn push_and_halt() {
        let (result, out) = run_source("42 HALT", b"");
        assert_eq!(result, 42);
        assert!(out.is_empty());
    }

    #[test]
    fn arithmetic() {
        let (result, _) = run_source("2 3 ADD 10 MUL HALT", b"");
        assert_eq!(result, 50);
    }

    #[test]
    fn echoes_one_byte() {
        let (result, out) = run_source("IN OUT 0 HALT", b"A");
        assert_eq!(result, 0);
        assert_eq!(out, b"A");
    }

    #[test]
    fn branch_taken() {
        let (result, _) = run_source("5 :skip JMP 99 HALT :skip 7 HALT", b"");
        assert_eq!(result, 7);
    }

    #[test]
    fn conditional_not_taken() {
        let (result, _) = run_source("1 :L JEQ 8 HALT :L 9 HALT", b"");
        assert_eq!(result, 8);
    }

    #[test]
    fn load_save_round_trip() {
        let (result, _) = run_source("PROGRAM_SIZE 1 ADD 12345 SAVE PROGRAM_SIZE 1 ADD LOAD HALT", b"");
        assert_eq!(result, 12345);
    }

    #[test]
    fn cmp_is_anti_symmetric() {
        let (a, _) = run_source("3 7 CMP HALT", b"");
        let (b, _) = run_source("7 3 CMP HALT", b"");
        assert_eq!(a, -b);
    }

    #[test]
    fn division_by_zero_traps() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, b"1 0 DIV HALT").unwrap();
        let out = translate_files(&[f.path()]);
        let mut interp = Interpreter::new(out.image);
        let mut host = PluginHost::new();
        let mut input = Cursor::new(Vec::<u8>::new());
        let mut output = Vec::new();
        let result = interp.run(RunOptions::default(), &mut host, &mut input, &mut output);
        assert!(matches!(result, Err(RunError::DivisionByZero)));
    }

    #[quickcheck]
    fn cmp_matches_signum_of_comparison(x: i32, y: i32) -> bool {
        let (result, _) = run_source(&format!("{x} {y} CMP HALT"), b"");
        result
            == match x.cmp(&y) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }
    }

    #[quickcheck]
    fn add_wraps_like_native_i32(x: i32, y: i32) -> bool {
        let (result, _) = run_source(&format!("{x} {y} ADD HALT"), b"");
        result == x.wrapping_add(y)
    }

    #[quickcheck]
    fn push_then_pop_is_identity(x: i32) -> bool {
        let (result, _) = run_source(&format!("{x} HALT"), b"");
        result == x
    }

    #[test]
    fn unknown_opcode_halts_with_error() {
        // -99 is not a defined opcode.
        let mut image = Image::new();
        image.write(RESERVED, -99);
        image.program_size = RESERVED + 1;
        let mut interp = Interpreter::new(image);
        let mut host = PluginHost::new();
        let mut input = Cursor::new(Vec::<u8>::new());
        let mut output = Vec::new();
        let result = interp.run(RunOptions::default(), &mut host, &mut input, &mut output);
        assert!(matches!(result, Err(RunError::UnknownOpcode(-99))));
    }
}
