//! Fixed-capacity, open-addressed symbol table.
//!
//! Mirrors the assembler's hand-rolled hash map: linear probing over a
//! `MAX_N_IDENT`-sized table, keyed by a djb2-style string hash.

use crate::consts::MAX_N_IDENT;
use crate::diagnostic::{Position, TranslateError};

/// A symbol table entry: an address (opcode or label address), whether the
/// entry was defined by user source (vs. a built-in mnemonic), and the
/// position it was first defined at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentInfo {
    pub address: i32,
    pub is_user_defined: bool,
    pub position: Position,
}

#[derive(Clone)]
struct Slot {
    key: String,
    value: IdentInfo,
}

/// Capacity-bounded open-addressed hash map from identifier to [`IdentInfo`].
pub struct SymbolTable {
    table: Vec<Option<Slot>>,
}

fn hash(key: &str) -> usize {
    let mut h: u64 = 5381;
    for b in key.bytes() {
        h = h.wrapping_shl(5).wrapping_add(h).wrapping_add(b as u64);
    }
    (h % MAX_N_IDENT as u64) as usize
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            table: vec![None; MAX_N_IDENT],
        }
    }

    /// Inserts or overwrites `key`. Returns `TooManyIdents` if the table is
    /// full and `key` is not already present.
    pub fn insert(&mut self, key: &str, value: IdentInfo) -> Result<(), TranslateError> {
        let start = hash(key);
        let mut idx = start;
        loop {
            match &mut self.table[idx] {
                Some(slot) if slot.key == key => {
                    slot.value = value;
                    return Ok(());
                }
                Some(_) => {
                    idx = (idx + 1) % MAX_N_IDENT;
                    if idx == start {
                        return Err(TranslateError::TooManyIdents);
                    }
                }
                slot @ None => {
                    *slot = Some(Slot { key: key.to_owned(), value });
                    return Ok(());
                }
            }
        }
    }

    /// Looks up `key`, returning `None` if absent.
    pub fn get(&self, key: &str) -> Option<IdentInfo> {
        let start = hash(key);
        let mut idx = start;
        loop {
            match &self.table[idx] {
                Some(slot) if slot.key == key => return Some(slot.value),
                Some(_) => {
                    idx = (idx + 1) % MAX_N_IDENT;
                    if idx == start {
                        return None;
                    }
                }
                None => return None,
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over every occupied slot, for diagnostic dumping.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IdentInfo)> {
        self.table.iter().filter_map(|s| s.as_ref()).map(|s| (s.key.as_str(), &s.value))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(addr: i32, user: bool) -> IdentInfo {
        IdentInfo { address: addr, is_user_defined: user, position: Position::default() }
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let mut t = SymbolTable::new();
        t.insert("ADD", info(-1, false)).unwrap();
        t.insert("loop", info(300, true)).unwrap();
        assert_eq!(t.get("ADD"), Some(info(-1, false)));
        assert_eq!(t.get("loop"), Some(info(300, true)));
        assert_eq!(t.get("missing"), None);
    }

    #[test]
    fn overwrite_updates_existing_slot() {
        let mut t = SymbolTable::new();
        t.insert("PROGRAM_SIZE", info(256, false)).unwrap();
        t.insert("PROGRAM_SIZE", info(300, false)).unwrap();
        assert_eq!(t.get("PROGRAM_SIZE"), Some(info(300, false)));
    }
}
