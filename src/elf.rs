//! Raw ELF symbol records.
//!
//! The symbol table stores merged symbols in its own representation; this
//! module is the boundary where `Elf32_Sym` / `Elf64_Sym` records are decoded
//! from input byte spans and encoded into the output view. Input spans carry
//! no alignment guarantee, so decoding reads fields at explicit offsets;
//! encoding goes through the `object` crate's packed structs.

use anyhow::{bail, Result};
use object::elf::{Sym32, Sym64};
use object::endian::{U16, U32, U64};
use object::pod::bytes_of;
use object::{Endian, Endianness};

/// The ELF class of the link: fixes record sizes and address widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    /// Size in bytes of one symbol record.
    pub fn sym_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }

    /// Size in bytes of an address; symbol records are aligned to this.
    pub fn addr_size(self) -> u64 {
        match self {
            ElfClass::Elf32 => 4,
            ElfClass::Elf64 => 8,
        }
    }

    /// Address width in bits, for diagnostics.
    pub fn bits(self) -> u32 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 64,
        }
    }
}

/// One ELF symbol record, decoded to host integers.
///
/// `st_info` and `st_other` are kept split into their subfields; `shndx` is
/// widened to `u32` so reserved indices compare without casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfSymbol {
    pub st_name: u32,
    pub shndx: u32,
    pub value: u64,
    pub size: u64,
    pub symbol_type: u8,
    pub binding: u8,
    pub visibility: u8,
    pub nonvis: u8,
}

impl ElfSymbol {
    pub fn st_info(&self) -> u8 {
        st_info(self.binding, self.symbol_type)
    }

    pub fn st_other(&self) -> u8 {
        st_other(self.visibility, self.nonvis)
    }

    fn decode(rec: &[u8], class: ElfClass, endian: Endianness) -> ElfSymbol {
        let u16_at = |off: usize| endian.read_u16_bytes(rec[off..off + 2].try_into().unwrap());
        let u32_at = |off: usize| endian.read_u32_bytes(rec[off..off + 4].try_into().unwrap());
        let u64_at = |off: usize| endian.read_u64_bytes(rec[off..off + 8].try_into().unwrap());
        let (st_info, st_other, shndx, value, size) = match class {
            ElfClass::Elf32 => (
                rec[12],
                rec[13],
                u16_at(14),
                u32_at(4) as u64,
                u32_at(8) as u64,
            ),
            ElfClass::Elf64 => (rec[4], rec[5], u16_at(6), u64_at(8), u64_at(16)),
        };
        ElfSymbol {
            st_name: u32_at(0),
            shndx: shndx as u32,
            value,
            size,
            symbol_type: st_info & 0xf,
            binding: st_info >> 4,
            visibility: st_other & 0x3,
            nonvis: st_other >> 2,
        }
    }

    /// Encode into `buf`, which must be exactly `class.sym_size()` bytes.
    pub fn encode(&self, class: ElfClass, endian: Endianness, buf: &mut [u8]) {
        match class {
            ElfClass::Elf32 => {
                let sym = Sym32::<Endianness> {
                    st_name: U32::new(endian, self.st_name),
                    st_value: U32::new(endian, self.value as u32),
                    st_size: U32::new(endian, self.size as u32),
                    st_info: self.st_info(),
                    st_other: self.st_other(),
                    st_shndx: U16::new(endian, self.shndx as u16),
                };
                buf.copy_from_slice(bytes_of(&sym));
            }
            ElfClass::Elf64 => {
                let sym = Sym64::<Endianness> {
                    st_name: U32::new(endian, self.st_name),
                    st_info: self.st_info(),
                    st_other: self.st_other(),
                    st_shndx: U16::new(endian, self.shndx as u16),
                    st_value: U64::new(endian, self.value),
                    st_size: U64::new(endian, self.size),
                };
                buf.copy_from_slice(bytes_of(&sym));
            }
        }
    }
}

/// Pack binding and type into `st_info`.
pub fn st_info(binding: u8, symbol_type: u8) -> u8 {
    (binding << 4) | (symbol_type & 0xf)
}

/// Pack visibility and the unused high bits into `st_other`.
pub fn st_other(visibility: u8, nonvis: u8) -> u8 {
    (nonvis << 2) | (visibility & 0x3)
}

/// Decode a whole symbol array. The span must be an exact multiple of the
/// record size.
pub fn read_symbols(data: &[u8], class: ElfClass, endian: Endianness) -> Result<Vec<ElfSymbol>> {
    let sym_size = class.sym_size();
    if data.len() % sym_size != 0 {
        bail!("truncated {}-bit symbol table", class.bits());
    }
    Ok(data
        .chunks_exact(sym_size)
        .map(|rec| ElfSymbol::decode(rec, class, endian))
        .collect())
}

/// Decode a `.gnu.version` stream: one `u16` per symbol.
pub fn read_versym(data: &[u8], endian: Endianness) -> Result<Vec<u16>> {
    if data.len() % 2 != 0 {
        bail!("truncated version symbol table");
    }
    Ok(data
        .chunks_exact(2)
        .map(|w| endian.read_u16_bytes([w[0], w[1]]))
        .collect())
}

/// Read the NUL-terminated string at `offset` in a string table.
pub fn read_name(strtab: &[u8], offset: u32) -> Option<&str> {
    let start = offset as usize;
    if start >= strtab.len() {
        return None;
    }
    let end = start + strtab[start..].iter().position(|&b| b == 0)?;
    std::str::from_utf8(&strtab[start..end]).ok()
}
