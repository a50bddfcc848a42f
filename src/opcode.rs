//! Instruction mnemonics and their numeric opcodes.
//!
//! `JMP` shares its opcode value with two other source spellings, `SETIP`
//! and `RET` (all decode to `-13`). Rust's `#[repr(i32)]` enums cannot carry
//! two variants with the same discriminant, so the aliases are not
//! `Mnemonic` variants at all: they're extra symbol-table entries, listed in
//! [`Mnemonic::ALIASES`], that resolve to [`Mnemonic::Jmp`]'s opcode. The
//! equivalence is only meaningful at the symbol-table / source level: the
//! interpreter's fetch-decode-execute loop dispatches on the numeric `i32`
//! value alone (see [`crate::interpreter`]).

use strum::EnumIter;

/// Every mnemonic the translator recognizes as a keyword identifier.
///
/// `as i32` yields the numeric opcode recorded in the symbol table and
/// matched on during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[repr(i32)]
pub enum Mnemonic {
    Add = -1,
    Sub = -2,
    Bitand = -3,
    Bitor = -4,
    Bitxor = -5,
    Lshift = -6,
    Rshift = -7,
    Cmp = -8,
    Getip = -9,
    Getsp = -10,
    Getfp = -11,
    Getrv = -12,
    /// Also reachable from source as `SETIP` or `RET`; see [`Mnemonic::ALIASES`].
    Jmp = -13,
    Setsp = -14,
    Setfp = -15,
    Setrv = -16,
    Ret2 = -17,
    Jge = -18,
    Jne = -19,
    Jgt = -20,
    Jle = -21,
    Jeq = -22,
    Jlt = -23,
    Drop2 = -24,
    Dup = -25,
    Drop = -26,
    Swap = -27,
    Rot = -28,
    Over = -29,
    Sdrop = -30,
    Call = -31,
    Neg = -33,
    Bitnot = -34,
    Load = -35,
    Save = -36,
    Halt = -37,
    Mul = -40,
    Div = -41,
    Mod = -42,
    In = -43,
    Out = -44,
}

impl Mnemonic {
    /// Extra keyword spellings that resolve to an existing variant's opcode
    /// rather than introducing one of their own. `SETIP` and `RET` are both
    /// `JMP` under a different name: pop a target address, jump to it.
    pub const ALIASES: &'static [(&'static str, Mnemonic)] = &[("SETIP", Mnemonic::Jmp), ("RET", Mnemonic::Jmp)];

    pub const fn opcode(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Mnemonic::Add => "ADD",
            Mnemonic::Sub => "SUB",
            Mnemonic::Bitand => "BITAND",
            Mnemonic::Bitor => "BITOR",
            Mnemonic::Bitxor => "BITXOR",
            Mnemonic::Lshift => "LSHIFT",
            Mnemonic::Rshift => "RSHIFT",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Getip => "GETIP",
            Mnemonic::Getsp => "GETSP",
            Mnemonic::Getfp => "GETFP",
            Mnemonic::Getrv => "GETRV",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Setsp => "SETSP",
            Mnemonic::Setfp => "SETFP",
            Mnemonic::Setrv => "SETRV",
            Mnemonic::Ret2 => "RET2",
            Mnemonic::Jge => "JGE",
            Mnemonic::Jne => "JNE",
            Mnemonic::Jgt => "JGT",
            Mnemonic::Jle => "JLE",
            Mnemonic::Jeq => "JEQ",
            Mnemonic::Jlt => "JLT",
            Mnemonic::Drop2 => "DROP2",
            Mnemonic::Dup => "DUP",
            Mnemonic::Drop => "DROP",
            Mnemonic::Swap => "SWAP",
            Mnemonic::Rot => "ROT",
            Mnemonic::Over => "OVER",
            Mnemonic::Sdrop => "SDROP",
            Mnemonic::Call => "CALL",
            Mnemonic::Neg => "NEG",
            Mnemonic::Bitnot => "BITNOT",
            Mnemonic::Load => "LOAD",
            Mnemonic::Save => "SAVE",
            Mnemonic::Halt => "HALT",
            Mnemonic::Mul => "MUL",
            Mnemonic::Div => "DIV",
            Mnemonic::Mod => "MOD",
            Mnemonic::In => "IN",
            Mnemonic::Out => "OUT",
        }
    }

    /// All mnemonics recognized by the translator, in declaration order.
    /// Does not include the [`Mnemonic::ALIASES`] spellings.
    pub fn all() -> impl Iterator<Item = Mnemonic> {
        use strum::IntoEnumIterator;
        Mnemonic::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jmp_setip_ret_share_one_opcode() {
        for &(_, aliased) in Mnemonic::ALIASES {
            assert_eq!(Mnemonic::Jmp.opcode(), aliased.opcode());
        }
    }

    #[test]
    fn every_mnemonic_has_a_negative_opcode() {
        for m in Mnemonic::all() {
            assert!(m.opcode() < 0, "{} has non-negative opcode", m.name());
        }
    }

    #[test]
    fn alias_spellings_are_distinct_from_every_declared_variant_name() {
        for &(alias_name, _) in Mnemonic::ALIASES {
            assert!(Mnemonic::all().all(|m| m.name() != alias_name));
        }
    }
}
