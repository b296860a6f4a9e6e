//! Shared fixtures: collaborator implementations and raw table builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use object::{elf, Endian, Endianness};

use rld::elf::{ElfClass, ElfSymbol};
use rld::object::Object;
use rld::output::{Layout, OutputData, OutputSegment};
use rld::target::{SymbolAllocation, Target};

pub struct TestTarget {
    pub class: ElfClass,
    pub big_endian: bool,
    pub allocation: SymbolAllocation,
}

impl TestTarget {
    pub fn elf64() -> TestTarget {
        TestTarget {
            class: ElfClass::Elf64,
            big_endian: false,
            allocation: SymbolAllocation::Plain,
        }
    }

    pub fn elf32() -> TestTarget {
        TestTarget {
            class: ElfClass::Elf32,
            big_endian: false,
            allocation: SymbolAllocation::Plain,
        }
    }
}

impl Target for TestTarget {
    fn elf_class(&self) -> ElfClass {
        self.class
    }

    fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    fn make_symbol(&self) -> SymbolAllocation {
        self.allocation
    }
}

pub struct TestSection {
    pub address: u64,
    pub size: u64,
    pub shndx: u16,
}

impl OutputData for TestSection {
    fn address(&self) -> u64 {
        self.address
    }

    fn data_size(&self) -> u64 {
        self.size
    }

    fn out_shndx(&self) -> u16 {
        self.shndx
    }
}

pub struct TestSegment {
    pub vaddr: u64,
    pub memsz: u64,
    pub filesz: u64,
}

impl OutputSegment for TestSegment {
    fn vaddr(&self) -> u64 {
        self.vaddr
    }

    fn memsz(&self) -> u64 {
        self.memsz
    }

    fn filesz(&self) -> u64 {
        self.filesz
    }
}

struct Placement {
    section: TestSection,
    offset: u64,
}

/// An input object with scripted answers for everything the symbol table
/// asks about.
pub struct TestObject {
    name: String,
    dynamic: bool,
    target: TestTarget,
    excluded: Vec<u32>,
    placements: HashMap<u32, Placement>,
    contents: Mutex<HashMap<u32, Vec<u8>>>,
}

impl TestObject {
    pub fn new(name: &str) -> TestObject {
        TestObject {
            name: name.to_string(),
            dynamic: false,
            target: TestTarget::elf64(),
            excluded: Vec::new(),
            placements: HashMap::new(),
            contents: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_dynamic(name: &str) -> TestObject {
        let mut obj = TestObject::new(name);
        obj.dynamic = true;
        obj
    }

    pub fn with_target(mut self, target: TestTarget) -> TestObject {
        self.target = target;
        self
    }

    /// Mark an input section as not included in the link.
    pub fn exclude(mut self, shndx: u32) -> TestObject {
        self.excluded.push(shndx);
        self
    }

    /// Map an input section to an output section at the given offset.
    pub fn place(mut self, shndx: u32, section: TestSection, offset: u64) -> TestObject {
        self.placements.insert(shndx, Placement { section, offset });
        self
    }

    /// Give an input section readable contents.
    pub fn section_bytes(self, shndx: u32, bytes: &[u8]) -> TestObject {
        self.contents.lock().unwrap().insert(shndx, bytes.to_vec());
        self
    }
}

impl Object for TestObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn target(&self) -> &dyn Target {
        &self.target
    }

    fn is_section_included(&self, shndx: u32) -> bool {
        !self.excluded.contains(&shndx)
    }

    fn output_section(&self, shndx: u32) -> Option<(&dyn OutputData, u64)> {
        self.placements
            .get(&shndx)
            .map(|placement| (&placement.section as &dyn OutputData, placement.offset))
    }

    fn section_contents(&self, shndx: u32) -> Result<Vec<u8>> {
        // The guard's scope is the read, as the trait contract asks.
        let contents = self.contents.lock().unwrap();
        contents
            .get(&shndx)
            .cloned()
            .ok_or_else(|| anyhow!("{}: no contents for section {}", self.name, shndx))
    }
}

pub struct TestLayout {
    pub sections: Vec<(String, TestSection)>,
    /// (segment type, segment flags, segment)
    pub segments: Vec<(u32, u32, TestSegment)>,
}

impl TestLayout {
    pub fn empty() -> TestLayout {
        TestLayout {
            sections: Vec::new(),
            segments: Vec::new(),
        }
    }
}

impl Layout for TestLayout {
    fn find_output_section(&self, name: &str) -> Option<&dyn OutputData> {
        self.sections
            .iter()
            .find(|(section_name, _)| section_name == name)
            .map(|(_, section)| section as &dyn OutputData)
    }

    fn find_output_segment(
        &self,
        segment_type: u32,
        flags_set: u32,
        flags_clear: u32,
    ) -> Option<&dyn OutputSegment> {
        self.segments
            .iter()
            .find(|(kind, flags, _)| {
                *kind == segment_type && flags & flags_set == flags_set && flags & flags_clear == 0
            })
            .map(|(_, _, segment)| segment as &dyn OutputSegment)
    }
}

/// Builds the raw byte spans `add_from_*` consumes: a symbol array and its
/// string table, encoded with the real wire format.
pub struct SymtabBuilder {
    class: ElfClass,
    endian: Endianness,
    syms: Vec<u8>,
    strtab: Vec<u8>,
}

impl SymtabBuilder {
    pub fn new(class: ElfClass, endian: Endianness) -> SymtabBuilder {
        SymtabBuilder {
            class,
            endian,
            syms: Vec::new(),
            strtab: vec![0],
        }
    }

    pub fn elf64() -> SymtabBuilder {
        SymtabBuilder::new(ElfClass::Elf64, Endianness::Little)
    }

    pub fn sym(
        mut self,
        name: &str,
        binding: u8,
        symbol_type: u8,
        shndx: u32,
        value: u64,
        size: u64,
    ) -> SymtabBuilder {
        let st_name = if name.is_empty() {
            0
        } else {
            let offset = self.strtab.len() as u32;
            self.strtab.extend_from_slice(name.as_bytes());
            self.strtab.push(0);
            offset
        };
        let record = ElfSymbol {
            st_name,
            shndx,
            value,
            size,
            symbol_type,
            binding,
            visibility: elf::STV_DEFAULT,
            nonvis: 0,
        };
        let mut buf = vec![0; self.class.sym_size()];
        record.encode(self.class, self.endian, &mut buf);
        self.syms.extend_from_slice(&buf);
        self
    }

    pub fn func(self, name: &str, shndx: u32, value: u64) -> SymtabBuilder {
        self.sym(name, elf::STB_GLOBAL, elf::STT_FUNC, shndx, value, 0)
    }

    pub fn weak_func(self, name: &str, shndx: u32, value: u64) -> SymtabBuilder {
        self.sym(name, elf::STB_WEAK, elf::STT_FUNC, shndx, value, 0)
    }

    pub fn undef(self, name: &str) -> SymtabBuilder {
        self.sym(
            name,
            elf::STB_GLOBAL,
            elf::STT_NOTYPE,
            u32::from(elf::SHN_UNDEF),
            0,
            0,
        )
    }

    pub fn common(self, name: &str, align: u64, size: u64) -> SymtabBuilder {
        self.sym(
            name,
            elf::STB_GLOBAL,
            elf::STT_OBJECT,
            u32::from(elf::SHN_COMMON),
            align,
            size,
        )
    }

    pub fn build(self) -> (Vec<u8>, Vec<u8>) {
        (self.syms, self.strtab)
    }
}

/// Encode a `.gnu.version` stream.
pub fn versym(words: &[u16], endian: Endianness) -> Vec<u8> {
    words
        .iter()
        .flat_map(|&word| endian.write_u16_bytes(word))
        .collect()
}
