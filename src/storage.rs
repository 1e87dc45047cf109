use std::borrow::Cow;
use std::collections::HashMap;

use crate::lang::value::{Number, Value};

/// Fixed capacities shared by every pipeline stage.
///
/// These are part of the external contract: callers may rely on inputs up to
/// these limits being accepted and anything beyond them failing loudly.
pub const MAX_TOKENS: usize = 256;
pub const MAX_VARS: usize = 256;
pub const MAX_OPS: usize = 512;
pub const MAX_CODE_WORDS: usize = 512;
pub const MAX_STACK: usize = 10_000;
pub const STRING_POOL_BYTES: usize = 100_000;
pub const MAX_LITERALS: usize = 2048;

/// An index pair into the string pool.
///
/// References stay valid until the pool is reset; the pool never compacts or
/// reuses earlier bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrRef {
    pub offset: u32,
    pub len: u32,
}

/// Append-only byte buffer for identifier and string-literal text.
#[derive(Debug)]
pub struct StringPool {
    bytes: Vec<u8>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool { bytes: Vec::new() }
    }

    /// Next write offset. Monotonically increasing between resets.
    #[allow(dead_code)]
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    /// Appends `data` and returns a reference to it, or `None` when the pool
    /// is out of capacity.
    pub fn intern(&mut self, data: &[u8]) -> Option<StrRef> {
        if self.bytes.len() + data.len() > STRING_POOL_BYTES {
            return None;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(data);
        Some(StrRef {
            offset,
            len: data.len() as u32,
        })
    }

    /// Raw bytes behind a reference. An out-of-range reference yields the
    /// empty slice rather than panicking.
    pub fn get(&self, r: StrRef) -> &[u8] {
        let start = r.offset as usize;
        let end = start + r.len as usize;
        self.bytes.get(start..end).unwrap_or(&[])
    }

    /// Text behind a reference, for diagnostics and token dumps.
    pub fn text(&self, r: StrRef) -> Cow<'_, str> {
        String::from_utf8_lossy(self.get(r))
    }

    /// True when `r` lies entirely inside the written region.
    pub fn contains(&self, r: StrRef) -> bool {
        r.offset as usize + r.len as usize <= self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replaces the pool contents with a snapshot (bytecode image loading).
    /// Returns false when the snapshot exceeds pool capacity.
    pub fn load(&mut self, snapshot: &[u8]) -> bool {
        if snapshot.len() > STRING_POOL_BYTES {
            return false;
        }
        self.bytes.clear();
        self.bytes.extend_from_slice(snapshot);
        true
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}

/// Append-only sequence of decoded numeric literals.
#[derive(Debug)]
pub struct LiteralPool {
    values: Vec<Number>,
}

impl LiteralPool {
    pub fn new() -> Self {
        LiteralPool { values: Vec::new() }
    }

    /// Next free index.
    #[allow(dead_code)]
    pub fn offset(&self) -> usize {
        self.values.len()
    }

    /// Appends a literal and returns its index, or `None` when full.
    pub fn push(&mut self, n: Number) -> Option<usize> {
        if self.values.len() >= MAX_LITERALS {
            return None;
        }
        self.values.push(n);
        Some(self.values.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<Number> {
        self.values.get(index).copied()
    }

    pub fn values(&self) -> &[Number] {
        &self.values
    }

    /// Replaces the pool contents with a snapshot (bytecode image loading).
    /// Returns false when the snapshot exceeds pool capacity.
    pub fn load(&mut self, snapshot: &[Number]) -> bool {
        if snapshot.len() > MAX_LITERALS {
            return false;
        }
        self.values.clear();
        self.values.extend_from_slice(snapshot);
        true
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// The variable table: 256 slots, each holding one typed value.
///
/// Slots are bound to identifiers at parse time (first-seen allocation) and
/// keep their values and bindings across pool resets, which is what makes
/// variables persist between REPL-style runs.
#[derive(Debug)]
pub struct VarTable {
    slots: Vec<Option<Value>>,
    names: HashMap<String, usize>,
}

impl VarTable {
    pub fn new() -> Self {
        VarTable {
            slots: vec![None; MAX_VARS],
            names: HashMap::new(),
        }
    }

    /// Slot for `name`, allocating the next free slot on first sight.
    /// Returns `None` when all slots are taken.
    pub fn resolve(&mut self, name: &str) -> Option<usize> {
        if let Some(&slot) = self.names.get(name) {
            return Some(slot);
        }
        let slot = self.names.len();
        if slot >= MAX_VARS {
            return None;
        }
        self.names.insert(name.to_string(), slot);
        Some(slot)
    }

    /// Slot already bound to `name`, if any. Does not allocate.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Number of bound slots.
    #[allow(dead_code)]
    pub fn bound(&self) -> usize {
        self.names.len()
    }

    /// Current value of a slot. `None` for never-stored or out-of-range slots.
    pub fn get(&self, slot: usize) -> Option<Value> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn set(&mut self, slot: usize, value: Value) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_append_only() {
        let mut pool = StringPool::new();
        let a = pool.intern(b"foo").unwrap();
        let b = pool.intern(b"bar").unwrap();

        assert_eq!(a, StrRef { offset: 0, len: 3 });
        assert_eq!(b, StrRef { offset: 3, len: 3 });
        assert_eq!(pool.get(a), b"foo");
        assert_eq!(pool.get(b), b"bar");
        assert_eq!(pool.offset(), 6);
    }

    #[test]
    fn test_string_pool_capacity() {
        let mut pool = StringPool::new();
        let big = vec![b'x'; STRING_POOL_BYTES];
        assert!(pool.intern(&big).is_some());
        assert!(pool.intern(b"y").is_none());

        // a failed intern must not move the offset
        assert_eq!(pool.offset(), STRING_POOL_BYTES);
    }

    #[test]
    fn test_out_of_range_ref_is_empty() {
        let pool = StringPool::new();
        let r = StrRef { offset: 10, len: 5 };
        assert_eq!(pool.get(r), b"");
        assert!(!pool.contains(r));
    }

    #[test]
    fn test_literal_pool_capacity() {
        let mut pool = LiteralPool::new();
        for i in 0..MAX_LITERALS {
            assert_eq!(pool.push(Number::Int(i as i64)), Some(i));
        }
        assert_eq!(pool.push(Number::Int(0)), None);
        assert_eq!(pool.offset(), MAX_LITERALS);
    }

    #[test]
    fn test_var_table_first_seen_allocation() {
        let mut vars = VarTable::new();
        assert_eq!(vars.resolve("x"), Some(0));
        assert_eq!(vars.resolve("y"), Some(1));
        assert_eq!(vars.resolve("x"), Some(0));
        assert_eq!(vars.bound(), 2);
    }

    #[test]
    fn test_var_table_slot_exhaustion() {
        let mut vars = VarTable::new();
        for i in 0..MAX_VARS {
            assert!(vars.resolve(&format!("v{}", i)).is_some());
        }
        assert_eq!(vars.resolve("one_too_many"), None);
    }

    #[test]
    fn test_var_table_store_and_read() {
        let mut vars = VarTable::new();
        let slot = vars.resolve("x").unwrap();

        assert_eq!(vars.get(slot), None);
        vars.set(slot, Value::Int(42));
        assert_eq!(vars.get(slot), Some(Value::Int(42)));
    }
}
