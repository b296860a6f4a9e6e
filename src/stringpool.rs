//! String canonicalization.
//!
//! Symbol names and version names are interned here once and addressed by
//! [`Key`] afterwards. Key equality is string equality, so the symbol table
//! can hash and compare names as plain integers. A second pool instance
//! collects the names that survive into the output file and assigns their
//! `.strtab` offsets.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::rc::Rc;

/// Canonical handle for an interned string.
///
/// Keys are never zero; the symbol table reserves the raw value 0 to encode
/// "no version" in its index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(NonZeroU32);

impl Key {
    /// The raw value, for building composite hash keys. Never 0.
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

struct Entry {
    text: Rc<str>,
    offset: u64,
}

/// An insert-only pool of unique strings.
///
/// Mutation requires `&mut self`, which is also the single-writer discipline
/// the symbol table itself runs under.
pub struct Stringpool {
    map: HashMap<Rc<str>, Key>,
    entries: Vec<Entry>,
    // Next string table offset; offset 0 is the leading NUL.
    next_offset: u64,
}

impl Default for Stringpool {
    fn default() -> Self {
        Self::new()
    }
}

impl Stringpool {
    pub fn new() -> Self {
        Stringpool {
            map: HashMap::new(),
            entries: Vec::new(),
            next_offset: 1,
        }
    }

    /// Look up a string without inserting it.
    pub fn find(&self, s: &str) -> Option<Key> {
        self.map.get(s).copied()
    }

    /// Intern a string, returning its canonical key. Idempotent.
    pub fn add(&mut self, s: &str) -> Key {
        if let Some(key) = self.map.get(s) {
            return *key;
        }
        let text: Rc<str> = Rc::from(s);
        let index = u32::try_from(self.entries.len() + 1).expect("string pool overflow");
        let key = Key(NonZeroU32::new(index).unwrap());
        self.entries.push(Entry {
            text: Rc::clone(&text),
            offset: self.next_offset,
        });
        self.next_offset += s.len() as u64 + 1;
        self.map.insert(text, key);
        key
    }

    /// The canonical text for a key.
    pub fn get(&self, key: Key) -> &str {
        &self.entries[key.raw() as usize - 1].text
    }

    /// The string table offset assigned to a key.
    pub fn get_offset(&self, key: Key) -> u64 {
        self.entries[key.raw() as usize - 1].offset
    }

    /// Total byte size of the rendered string table.
    pub fn strtab_size(&self) -> u64 {
        self.next_offset
    }

    /// Render the pool as an ELF string table: a leading NUL, then every
    /// string in insertion order, each NUL-terminated.
    pub fn strtab(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.next_offset as usize);
        buf.push(0);
        for entry in &self.entries {
            buf.extend_from_slice(entry.text.as_bytes());
            buf.push(0);
        }
        buf
    }
}
