//! Generic addressable register file.
//!
//! Memory-mapped chips expose a fixed set of registers at fixed addresses.
//! Rather than scattering address matches through each chip, a
//! `RegisterFile` holds an ordered map from address to a chip-defined key.
//! The chip registers each address once, then dispatches reads and write
//! strobes through the file: the supplied closure fires only on an address
//! match, reads from unmapped addresses return a fixed default, and writes
//! to unmapped addresses are no-ops.

use std::collections::BTreeMap;

/// Ordered map from register address to a chip-defined register key.
///
/// `K` identifies a register to its owning chip (typically a small enum).
/// Keys are unique per address; the map imposes no semantics beyond the
/// address match.
pub struct RegisterFile<K> {
    default: u8,
    entries: BTreeMap<u16, K>,
}

impl<K: Copy> RegisterFile<K> {
    /// Create an empty file. `default` is returned for unmapped reads.
    #[must_use]
    pub fn new(default: u8) -> Self {
        Self {
            default,
            entries: BTreeMap::new(),
        }
    }

    /// Map `addr` to `key`. Each address may be registered only once.
    pub fn add(&mut self, addr: u16, key: K) {
        let prev = self.entries.insert(addr, key);
        debug_assert!(prev.is_none(), "register {addr:#06X} mapped twice");
    }

    /// The key mapped at `addr`, if any.
    #[must_use]
    pub fn lookup(&self, addr: u16) -> Option<K> {
        self.entries.get(&addr).copied()
    }

    /// Read the register at `addr`, or the fixed default if unmapped.
    pub fn read(&self, addr: u16, read: impl FnOnce(K) -> u8) -> u8 {
        self.lookup(addr).map_or(self.default, read)
    }

    /// Strobe the register at `addr` for writing. No-op if unmapped.
    pub fn write(&self, addr: u16, strobe: impl FnOnce(K)) {
        if let Some(key) = self.lookup(addr) {
            strobe(key);
        }
    }
}
