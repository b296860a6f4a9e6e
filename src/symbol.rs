//! The merged global symbol record.
//!
//! Every global the linker has seen is one [`Symbol`]: metadata shared by all
//! variants plus a [`SymbolSource`] payload saying where the current winner
//! lives. Records are owned by the symbol table's arena and addressed by
//! [`SymbolId`]; superseded records stay allocated so earlier consumers'
//! ids stay valid (see the forwarders map in `symtab`).

use std::fmt;

use object::elf;

use crate::elf::ElfSymbol;
use crate::object::Object;
use crate::output::{OutputData, OutputSegment};
use crate::stringpool::Key;

/// Index of a record in the symbol table's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a segment-anchored symbol's offset is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOffsetBase {
    /// Relative to the segment's virtual address.
    SegmentStart,
    /// Relative to the end of the segment in memory.
    SegmentEnd,
    /// Relative to the end of the segment's file image (the start of bss).
    SegmentBss,
}

/// Where the current definition of a symbol lives.
#[derive(Clone, Copy)]
pub enum SymbolSource<'a> {
    /// Imported from an input object; a definition or a reference depending
    /// on `shndx`.
    FromObject {
        object: &'a dyn Object,
        shndx: u32,
    },
    /// Defined relative to a block of output data.
    InOutputData {
        data: &'a dyn OutputData,
        offset_is_from_end: bool,
    },
    /// Defined relative to an output segment.
    InOutputSegment {
        segment: &'a dyn OutputSegment,
        offset_base: SegmentOffsetBase,
    },
    /// An absolute constant.
    Constant,
}

impl fmt::Debug for SymbolSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolSource::FromObject { object, shndx } => f
                .debug_struct("FromObject")
                .field("object", &object.name())
                .field("shndx", shndx)
                .finish(),
            SymbolSource::InOutputData {
                offset_is_from_end, ..
            } => f
                .debug_struct("InOutputData")
                .field("offset_is_from_end", offset_is_from_end)
                .finish(),
            SymbolSource::InOutputSegment { offset_base, .. } => f
                .debug_struct("InOutputSegment")
                .field("offset_base", offset_base)
                .finish(),
            SymbolSource::Constant => f.write_str("Constant"),
        }
    }
}

/// One merged global symbol.
#[derive(Debug)]
pub struct Symbol<'a> {
    pub(crate) name: Key,
    pub(crate) version: Option<Key>,
    pub(crate) symbol_type: u8,
    pub(crate) binding: u8,
    pub(crate) visibility: u8,
    pub(crate) nonvis: u8,
    pub(crate) source: SymbolSource<'a>,
    /// Address-sized payload; section-relative until `finalize`, absolute
    /// afterwards. Narrowed on emission for 32-bit links.
    pub(crate) value: u64,
    pub(crate) symsize: u64,
    pub(crate) got_offset: Option<u64>,
    pub(crate) is_target_special: bool,
    pub(crate) is_def: bool,
    pub(crate) is_forwarder: bool,
    pub(crate) in_dyn: bool,
    pub(crate) has_warning: bool,
    /// Output section index resolved by `finalize`; `None` for records that
    /// are not emitted (forwarders, discarded-section symbols).
    pub(crate) out_shndx: Option<u16>,
}

impl<'a> Symbol<'a> {
    /// A record imported from an input object.
    pub(crate) fn from_object(
        name: Key,
        version: Option<Key>,
        object: &'a dyn Object,
        esym: &ElfSymbol,
    ) -> Symbol<'a> {
        Symbol {
            name,
            version,
            symbol_type: esym.symbol_type,
            binding: esym.binding,
            visibility: esym.visibility,
            nonvis: esym.nonvis,
            source: SymbolSource::FromObject {
                object,
                shndx: esym.shndx,
            },
            value: esym.value,
            symsize: esym.size,
            got_offset: None,
            is_target_special: false,
            is_def: esym.shndx != u32::from(elf::SHN_UNDEF),
            is_forwarder: false,
            in_dyn: object.is_dynamic(),
            has_warning: false,
            out_shndx: None,
        }
    }

    /// An empty record for the linker-defined path; one of the `init_*`
    /// methods fills it in.
    pub(crate) fn placeholder(name: Key) -> Symbol<'a> {
        Symbol {
            name,
            version: None,
            symbol_type: elf::STT_NOTYPE,
            binding: elf::STB_GLOBAL,
            visibility: elf::STV_DEFAULT,
            nonvis: 0,
            source: SymbolSource::Constant,
            value: 0,
            symsize: 0,
            got_offset: None,
            is_target_special: false,
            is_def: false,
            is_forwarder: false,
            in_dyn: false,
            has_warning: false,
            out_shndx: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn init_special(
        &mut self,
        source: SymbolSource<'a>,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
    ) {
        self.version = None;
        self.symbol_type = symbol_type;
        self.binding = binding;
        self.visibility = visibility;
        self.nonvis = nonvis;
        self.source = source;
        self.value = value;
        self.symsize = symsize;
        self.got_offset = None;
        self.is_def = true;
        self.in_dyn = false;
        self.has_warning = false;
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn init_in_output_data(
        &mut self,
        data: &'a dyn OutputData,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
        offset_is_from_end: bool,
    ) {
        self.init_special(
            SymbolSource::InOutputData {
                data,
                offset_is_from_end,
            },
            value,
            symsize,
            symbol_type,
            binding,
            visibility,
            nonvis,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn init_in_output_segment(
        &mut self,
        segment: &'a dyn OutputSegment,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
        offset_base: SegmentOffsetBase,
    ) {
        self.init_special(
            SymbolSource::InOutputSegment {
                segment,
                offset_base,
            },
            value,
            symsize,
            symbol_type,
            binding,
            visibility,
            nonvis,
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn init_as_constant(
        &mut self,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
    ) {
        self.init_special(
            SymbolSource::Constant,
            value,
            symsize,
            symbol_type,
            binding,
            visibility,
            nonvis,
        );
    }

    pub fn name(&self) -> Key {
        self.name
    }

    pub fn version(&self) -> Option<Key> {
        self.version
    }

    pub fn symbol_type(&self) -> u8 {
        self.symbol_type
    }

    pub fn binding(&self) -> u8 {
        self.binding
    }

    pub fn visibility(&self) -> u8 {
        self.visibility
    }

    pub fn nonvis(&self) -> u8 {
        self.nonvis
    }

    pub fn source(&self) -> &SymbolSource<'a> {
        &self.source
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn symsize(&self) -> u64 {
        self.symsize
    }

    /// The defining object, when the winner came from an input.
    pub fn object(&self) -> Option<&'a dyn Object> {
        match self.source {
            SymbolSource::FromObject { object, .. } => Some(object),
            _ => None,
        }
    }

    /// The input section index, when the winner came from an input.
    pub fn shndx(&self) -> Option<u32> {
        match self.source {
            SymbolSource::FromObject { shndx, .. } => Some(shndx),
            _ => None,
        }
    }

    /// True for a reference that nothing has defined yet.
    pub fn is_undefined(&self) -> bool {
        matches!(
            self.source,
            SymbolSource::FromObject { shndx, .. } if shndx == u32::from(elf::SHN_UNDEF)
        )
    }

    /// True for a tentative (common) definition.
    pub fn is_common(&self) -> bool {
        matches!(
            self.source,
            SymbolSource::FromObject { shndx, .. } if shndx == u32::from(elf::SHN_COMMON)
        )
    }

    pub fn is_def(&self) -> bool {
        self.is_def
    }

    pub fn is_forwarder(&self) -> bool {
        self.is_forwarder
    }

    pub fn is_target_special(&self) -> bool {
        self.is_target_special
    }

    /// True once any dynamic object has supplied this symbol.
    pub fn in_dyn(&self) -> bool {
        self.in_dyn
    }

    pub fn has_warning(&self) -> bool {
        self.has_warning
    }

    pub fn got_offset(&self) -> Option<u64> {
        self.got_offset
    }

    /// Record the GOT slot assigned by relocation processing.
    pub fn set_got_offset(&mut self, offset: u64) {
        self.got_offset = Some(offset);
    }

    /// Output section index computed by `finalize`; `None` means the record
    /// is not emitted.
    pub fn out_shndx(&self) -> Option<u16> {
        self.out_shndx
    }

    /// True when the merge rule classifies this record as strongly bound.
    pub(crate) fn is_strong(&self) -> bool {
        self.binding != elf::STB_WEAK
    }

    /// True when the winner was supplied by a dynamic object.
    pub(crate) fn is_from_dynamic(&self) -> bool {
        self.object().is_some_and(|obj| obj.is_dynamic())
    }

    /// Reconstruct the winner as a raw ELF record, for the rare merge of two
    /// already-independent records. Sources other than an input object read
    /// as absolute definitions.
    pub(crate) fn elf_view(&self) -> (ElfSymbol, Option<&'a dyn Object>) {
        let (shndx, object) = match self.source {
            SymbolSource::FromObject { object, shndx } => (shndx, Some(object)),
            _ => (u32::from(elf::SHN_ABS), None),
        };
        (
            ElfSymbol {
                st_name: 0,
                shndx,
                value: self.value,
                size: self.symsize,
                symbol_type: self.symbol_type,
                binding: self.binding,
                visibility: self.visibility,
                nonvis: self.nonvis,
            },
            object,
        )
    }
}
