//! Architecture abstraction.
//!
//! The symbol table is generic over the target; it only needs the ELF class,
//! the byte order, and a hook that lets a backend intervene when a symbol
//! record is allocated.

use object::Endianness;

use crate::elf::ElfClass;

/// A backend's answer when the symbol table is about to allocate a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolAllocation {
    /// No backend involvement; allocate an ordinary record.
    Plain,
    /// Allocate the record and tag it target-special.
    TargetSpecial,
    /// Do not add this symbol at all.
    Suppress,
}

/// A target architecture (e.g. x86_64).
pub trait Target {
    /// The ELF class this target links.
    fn elf_class(&self) -> ElfClass;

    /// True for big-endian targets.
    fn is_big_endian(&self) -> bool;

    /// The byte order as the `object` crate spells it.
    fn endianness(&self) -> Endianness {
        if self.is_big_endian() {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    /// Allocation hook, consulted for every new symbol record.
    fn make_symbol(&self) -> SymbolAllocation {
        SymbolAllocation::Plain
    }
}
