//! The global symbol table.
//!
//! One table per link. Ingestion adds the globals of every input object,
//! merging records that share a `(name, version)` pair through the rule in
//! [`crate::resolve`]; layout rules and target backends add linker-defined
//! symbols; `finalize` turns section-relative values into absolute ones once
//! layout has assigned addresses; `write_globals` emits the survivors.
//!
//! A versioned name may be spelled `name@ver` (a specific version) or
//! `name@@ver` (the default version). Defining a default version makes the
//! plain `name` and `name@ver` lookups land on the same record. When both
//! spellings already have independent records, the older record is merged
//! into the winner and left behind as a *forwarder*: earlier-ingested
//! objects keep their ids, and [`SymbolTable::resolve_forwards`] follows the
//! redirect to the live record.
//!
//! The table is single-writer: every mutating entry point takes `&mut self`,
//! and the phases (ingest, define, finalize, write) run strictly in order.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use object::{elf, Endianness};
use tracing::{debug, error, warn};

use crate::elf::{read_name, read_symbols, read_versym, ElfClass, ElfSymbol};
use crate::object::{same_object, Object};
use crate::output::{Layout, OutputData, OutputFile, OutputSegment};
use crate::resolve::resolve;
use crate::stringpool::{Key, Stringpool};
use crate::symbol::{SegmentOffsetBase, Symbol, SymbolId, SymbolSource};
use crate::target::{SymbolAllocation, Target};
use crate::utils::align_up;
use crate::warnings::Warnings;

/// Descriptor for a linker-defined symbol anchored to a named output
/// section. If the section does not exist in this link, the symbol becomes
/// an absolute constant 0 instead.
pub struct DefineSymbolInSection<'s> {
    pub name: &'s str,
    pub output_section: &'s str,
    pub value: u64,
    pub size: u64,
    pub symbol_type: u8,
    pub binding: u8,
    pub visibility: u8,
    pub nonvis: u8,
    pub offset_is_from_end: bool,
    pub only_if_ref: bool,
}

/// Descriptor for a linker-defined symbol anchored to an output segment,
/// selected by segment type and flags. Falls back to constant 0 like the
/// section form.
pub struct DefineSymbolInSegment<'s> {
    pub name: &'s str,
    pub segment_type: u32,
    pub segment_flags_set: u32,
    pub segment_flags_clear: u32,
    pub value: u64,
    pub size: u64,
    pub symbol_type: u8,
    pub binding: u8,
    pub visibility: u8,
    pub nonvis: u8,
    pub offset_base: SegmentOffsetBase,
    pub only_if_ref: bool,
}

/// Index key: canonical name key and version key, 0 for "no version".
type TableKey = (u32, u32);

/// The merged global symbol table of a link.
pub struct SymbolTable<'a> {
    /// Fixed by the first input; every later input must match.
    class: Option<ElfClass>,
    endian: Option<Endianness>,
    table: HashMap<TableKey, SymbolId>,
    /// Arena of every record ever created, forwarders included.
    symbols: Vec<Symbol<'a>>,
    /// Superseded record -> live record.
    forwarders: HashMap<SymbolId, SymbolId>,
    /// Records that became common, in the order they did.
    commons: Vec<SymbolId>,
    namepool: Stringpool,
    warnings: Warnings<'a>,
    /// Bumped whenever a record becomes undefined; archive group scans
    /// re-run while this grows.
    saw_undefined: usize,
    error_count: usize,
    /// File offset of the symbol table, set by `finalize`.
    offset: u64,
    /// Number of records `finalize` decided to emit.
    output_count: usize,
}

impl Default for SymbolTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SymbolTable<'a> {
    pub fn new() -> SymbolTable<'a> {
        SymbolTable {
            class: None,
            endian: None,
            table: HashMap::new(),
            symbols: Vec::new(),
            forwarders: HashMap::new(),
            commons: Vec::new(),
            namepool: Stringpool::new(),
            warnings: Warnings::default(),
            saw_undefined: 0,
            error_count: 0,
            offset: 0,
            output_count: 0,
        }
    }

    /// The ELF class of the link, once an input or a defined symbol has
    /// fixed it.
    pub fn elf_class(&self) -> Option<ElfClass> {
        self.class
    }

    /// How many records have become undefined so far.
    pub fn saw_undefined(&self) -> usize {
        self.saw_undefined
    }

    /// Records that became common, for the common allocator.
    pub fn commons(&self) -> &[SymbolId] {
        &self.commons
    }

    /// Number of link semantic errors reported so far. Nonzero marks the
    /// link failed even though processing continued.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// File offset of the symbol table, valid after `finalize`.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of symbols `finalize` selected for output.
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol<'a> {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol<'a> {
        &mut self.symbols[id.index()]
    }

    /// The canonical text of a symbol's name.
    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.namepool.get(self.symbols[id.index()].name())
    }

    /// Intern a name in the table's pool.
    pub fn canonicalize_name(&mut self, name: &str) -> Key {
        self.namepool.add(name)
    }

    /// Look up a symbol by name and optional version. Never returns a
    /// forwarder; records reached through stale ids must go through
    /// [`SymbolTable::resolve_forwards`] instead.
    pub fn lookup(&self, name: &str, version: Option<&str>) -> Option<SymbolId> {
        let name_key = self.namepool.find(name)?;
        let version_key = match version {
            Some(version) => self.namepool.find(version)?.raw(),
            None => 0,
        };
        self.table.get(&(name_key.raw(), version_key)).copied()
    }

    /// Follow forwarding until the live record. Ids held since before a
    /// default-version collapse may point at superseded records; this is
    /// the only correct way to use such an id.
    pub fn resolve_forwards(&self, mut id: SymbolId) -> SymbolId {
        while self.symbols[id.index()].is_forwarder() {
            id = self.forwarders[&id];
        }
        id
    }

    fn push_symbol(&mut self, sym: Symbol<'a>) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).expect("symbol table overflow"));
        self.symbols.push(sym);
        id
    }

    fn make_forwarder(&mut self, from: SymbolId, to: SymbolId) {
        assert_ne!(from, to);
        assert!(!self.symbols[from.index()].is_forwarder());
        assert!(!self.symbols[to.index()].is_forwarder());
        self.forwarders.insert(from, to);
        self.symbols[from.index()].is_forwarder = true;
    }

    /// First input fixes the class and byte order; later inputs must agree.
    fn check_input(&mut self, object: &dyn Object, class: ElfClass, endian: Endianness) -> Result<()> {
        match self.class {
            None => {
                self.class = Some(class);
                self.endian = Some(endian);
            }
            Some(current) if current != class => bail!(
                "{}: mixing {}-bit and {}-bit ELF objects",
                object.name(),
                class.bits(),
                current.bits()
            ),
            _ => {}
        }
        if class != object.target().elf_class() {
            bail!(
                "{}: object does not match its target's ELF class",
                object.name()
            );
        }
        if self.endian != Some(endian) {
            bail!(
                "{}: mixing little-endian and big-endian ELF objects",
                object.name()
            );
        }
        Ok(())
    }

    /// Merge one raw symbol into the record at `id`, reporting a multiple
    /// definition if the rule rejects the pair.
    fn resolve_into(&mut self, id: SymbolId, esym: &ElfSymbol, object: Option<&'a dyn Object>) {
        if resolve(&mut self.symbols[id.index()], esym, object).is_err() {
            let sym = &self.symbols[id.index()];
            let name = self.namepool.get(sym.name());
            let first = sym.object().map_or("<linker-defined>", |obj| obj.name());
            let second = object.map_or("<linker-defined>", |obj| obj.name());
            error!(
                "multiple definition of `{}`: defined in both {} and {}",
                name, first, second
            );
            self.error_count += 1;
        }
    }

    fn update_counters(&mut self, id: SymbolId, was_undefined: bool, was_common: bool) {
        let sym = &self.symbols[id.index()];
        if !was_undefined && sym.is_undefined() {
            self.saw_undefined += 1;
        }
        if !was_common && sym.is_common() {
            self.commons.push(id);
        }
    }

    /// Add one symbol from an input object. `def` says the version is the
    /// default one, which aliases the unversioned name to this record.
    ///
    /// Returns `None` when the target's allocation hook suppressed the
    /// symbol.
    fn add_from_object(
        &mut self,
        object: &'a dyn Object,
        name_key: Key,
        version_key: Option<Key>,
        def: bool,
        esym: &ElfSymbol,
    ) -> Option<SymbolId> {
        let key = (name_key.raw(), version_key.map_or(0, Key::raw));
        let defkey = (name_key.raw(), 0);

        if let Some(id) = self.table.get(&key).copied() {
            // An existing record for (name, version); merge into it.
            let sym = &self.symbols[id.index()];
            let (was_undefined, was_common) = (sym.is_undefined(), sym.is_common());
            self.resolve_into(id, esym, Some(object));

            if def {
                match self.table.get(&defkey).copied() {
                    None => {
                        // First sight of the unversioned name: alias it.
                        self.table.insert(defkey, id);
                    }
                    Some(def_id) if def_id != id => {
                        // Both spellings already had independent records.
                        // Merge the unversioned one in and leave it behind
                        // as a forwarder; ids in older sympointers arrays
                        // still point at it.
                        let (view, view_obj) = self.symbols[def_id.index()].elf_view();
                        self.resolve_into(id, &view, view_obj);
                        self.make_forwarder(def_id, id);
                        self.table.insert(defkey, id);
                    }
                    Some(_) => {}
                }
            }

            self.update_counters(id, was_undefined, was_common);
            return Some(id);
        }

        // (name, version) is new. A default-version definition may still
        // land on the unversioned record.
        if def {
            if let Some(id) = self.table.get(&defkey).copied() {
                let sym = &self.symbols[id.index()];
                let (was_undefined, was_common) = (sym.is_undefined(), sym.is_common());
                self.resolve_into(id, esym, Some(object));
                self.table.insert(key, id);
                self.update_counters(id, was_undefined, was_common);
                return Some(id);
            }
        }

        let allocation = object.target().make_symbol();
        if allocation == SymbolAllocation::Suppress {
            return None;
        }
        let mut sym = Symbol::from_object(name_key, version_key, object, esym);
        if allocation == SymbolAllocation::TargetSpecial {
            sym.is_target_special = true;
        }
        let id = self.push_symbol(sym);
        self.table.insert(key, id);
        if def {
            self.table.insert(defkey, id);
        }
        self.update_counters(id, false, false);
        Some(id)
    }

    /// Add all the global symbols of a relocatable object.
    ///
    /// `syms` is the global part of the object's symbol table as raw bytes
    /// in the given class and byte order; `sym_names` is its string table.
    /// The returned vector maps each input symbol position to its merged
    /// record, for relocation processing; an entry is `None` only when the
    /// target suppressed the symbol.
    pub fn add_from_relobj(
        &mut self,
        relobj: &'a dyn Object,
        class: ElfClass,
        endian: Endianness,
        syms: &[u8],
        sym_names: &[u8],
    ) -> Result<Vec<Option<SymbolId>>> {
        self.check_input(relobj, class, endian)?;
        let records = read_symbols(syms, class, endian)
            .with_context(|| relobj.name().to_string())?;
        debug!(
            "adding {} global symbols from {}",
            records.len(),
            relobj.name()
        );

        let mut sympointers = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let mut esym = *record;

            let Some(raw_name) = read_name(sym_names, esym.st_name) else {
                bail!(
                    "{}: bad global symbol name offset {} at {}",
                    relobj.name(),
                    esym.st_name,
                    i
                );
            };

            // A symbol defined in a section we are not including must be
            // treated as an undefined reference.
            if esym.shndx != u32::from(elf::SHN_UNDEF)
                && esym.shndx < u32::from(elf::SHN_LORESERVE)
                && !relobj.is_section_included(esym.shndx)
            {
                esym.shndx = u32::from(elf::SHN_UNDEF);
            }

            // An '@' separates the name from the version; a second '@'
            // marks the default version.
            let result = match raw_name.find('@') {
                None => {
                    let name_key = self.namepool.add(raw_name);
                    self.add_from_object(relobj, name_key, None, false, &esym)
                }
                Some(at) => {
                    let name_key = self.namepool.add(&raw_name[..at]);
                    let mut version = &raw_name[at + 1..];
                    let def = version.starts_with('@');
                    if def {
                        version = &version[1..];
                    }
                    let version_key = self.namepool.add(version);
                    self.add_from_object(relobj, name_key, Some(version_key), def, &esym)
                }
            };
            sympointers.push(result);
        }
        Ok(sympointers)
    }

    /// Add all the symbols of a dynamic object.
    ///
    /// `versym` is the object's `.gnu.version` stream when it has one, and
    /// `version_map` maps version indices to version names.
    pub fn add_from_dynobj(
        &mut self,
        dynobj: &'a dyn Object,
        class: ElfClass,
        endian: Endianness,
        syms: &[u8],
        sym_names: &[u8],
        versym: Option<&[u8]>,
        version_map: &[Option<&str>],
    ) -> Result<()> {
        self.check_input(dynobj, class, endian)?;
        let records = read_symbols(syms, class, endian)
            .with_context(|| dynobj.name().to_string())?;
        let versym_words = match versym {
            Some(data) => {
                let words = read_versym(data, endian)
                    .with_context(|| dynobj.name().to_string())?;
                if words.len() < records.len() {
                    bail!("{}: too few symbol versions", dynobj.name());
                }
                Some(words)
            }
            None => None,
        };
        debug!(
            "adding {} dynamic symbols from {}",
            records.len(),
            dynobj.name()
        );

        for (i, record) in records.iter().enumerate() {
            // A shared object's locals are not visible outside it.
            if record.binding == elf::STB_LOCAL {
                continue;
            }

            let Some(raw_name) = read_name(sym_names, record.st_name) else {
                bail!(
                    "{}: bad symbol name offset {} at {}",
                    dynobj.name(),
                    record.st_name,
                    i
                );
            };

            let Some(words) = &versym_words else {
                let name_key = self.namepool.add(raw_name);
                self.add_from_object(dynobj, name_key, None, false, record);
                continue;
            };

            let word = words[i];
            let hidden = word & elf::VERSYM_HIDDEN != 0;
            let version_index = word & elf::VERSYM_VERSION;

            if version_index == elf::VER_NDX_LOCAL {
                continue;
            }

            let name_key = self.namepool.add(raw_name);

            if version_index == elf::VER_NDX_GLOBAL {
                self.add_from_object(dynobj, name_key, None, false, record);
                continue;
            }

            if version_index as usize >= version_map.len() {
                bail!(
                    "{}: versym for symbol {} out of range: {}",
                    dynobj.name(),
                    i,
                    version_index
                );
            }
            let Some(version) = version_map[version_index as usize] else {
                bail!(
                    "{}: versym for symbol {} has no name: {}",
                    dynobj.name(),
                    i,
                    version_index
                );
            };
            let version_key = self.namepool.add(version);

            // An absolute symbol whose name is its version is the version
            // definition anchor; it carries no version of its own.
            if record.shndx == u32::from(elf::SHN_ABS) && name_key == version_key {
                self.add_from_object(dynobj, name_key, None, false, record);
                continue;
            }

            let def = !hidden && record.shndx != u32::from(elf::SHN_UNDEF);
            self.add_from_object(dynobj, name_key, Some(version_key), def, record);
        }
        Ok(())
    }

    fn adopt_target(&mut self, target: &dyn Target) {
        if self.class.is_none() {
            self.class = Some(target.elf_class());
            self.endian = Some(target.endianness());
        }
        assert_eq!(self.class, Some(target.elf_class()));
    }

    /// Create or claim the record a linker-defined symbol will overwrite.
    ///
    /// With `only_if_ref`, succeeds only when the name already exists as an
    /// undefined reference. Otherwise a collision with a real definition
    /// (anything but an undefined, a common, or a dynamic-object symbol) is
    /// a link error and returns `None`.
    fn define_special_symbol(
        &mut self,
        target: &dyn Target,
        name: &str,
        only_if_ref: bool,
    ) -> Option<SymbolId> {
        self.adopt_target(target);

        if only_if_ref {
            let id = self.lookup(name, None)?;
            if !self.symbols[id.index()].is_undefined() {
                return None;
            }
            return Some(id);
        }

        let name_key = self.namepool.add(name);
        let key = (name_key.raw(), 0);

        if let Some(id) = self.table.get(&key).copied() {
            let sym = &self.symbols[id.index()];
            let defined = match *sym.source() {
                SymbolSource::FromObject { object, shndx } => {
                    shndx != u32::from(elf::SHN_UNDEF)
                        && shndx != u32::from(elf::SHN_COMMON)
                        && !object.is_dynamic()
                }
                _ => true,
            };
            if defined {
                error!("linker defined: multiple definition of `{}`", name);
                self.error_count += 1;
                return None;
            }
            // The new definition overrides the old reference.
            return Some(id);
        }

        match target.make_symbol() {
            SymbolAllocation::Suppress => None,
            allocation => {
                let mut sym = Symbol::placeholder(name_key);
                if allocation == SymbolAllocation::TargetSpecial {
                    sym.is_target_special = true;
                }
                let id = self.push_symbol(sym);
                self.table.insert(key, id);
                Some(id)
            }
        }
    }

    /// Define a symbol relative to a block of output data.
    #[allow(clippy::too_many_arguments)]
    pub fn define_in_output_data(
        &mut self,
        target: &dyn Target,
        name: &str,
        data: &'a dyn OutputData,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
        offset_is_from_end: bool,
        only_if_ref: bool,
    ) -> Option<SymbolId> {
        let id = self.define_special_symbol(target, name, only_if_ref)?;
        self.symbols[id.index()].init_in_output_data(
            data,
            value,
            symsize,
            symbol_type,
            binding,
            visibility,
            nonvis,
            offset_is_from_end,
        );
        Some(id)
    }

    /// Define a symbol relative to an output segment.
    #[allow(clippy::too_many_arguments)]
    pub fn define_in_output_segment(
        &mut self,
        target: &dyn Target,
        name: &str,
        segment: &'a dyn OutputSegment,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
        offset_base: SegmentOffsetBase,
        only_if_ref: bool,
    ) -> Option<SymbolId> {
        let id = self.define_special_symbol(target, name, only_if_ref)?;
        self.symbols[id.index()].init_in_output_segment(
            segment,
            value,
            symsize,
            symbol_type,
            binding,
            visibility,
            nonvis,
            offset_base,
        );
        Some(id)
    }

    /// Define a symbol with an absolute value.
    #[allow(clippy::too_many_arguments)]
    pub fn define_as_constant(
        &mut self,
        target: &dyn Target,
        name: &str,
        value: u64,
        symsize: u64,
        symbol_type: u8,
        binding: u8,
        visibility: u8,
        nonvis: u8,
        only_if_ref: bool,
    ) -> Option<SymbolId> {
        let id = self.define_special_symbol(target, name, only_if_ref)?;
        self.symbols[id.index()].init_as_constant(
            value,
            symsize,
            symbol_type,
            binding,
            visibility,
            nonvis,
        );
        Some(id)
    }

    /// Define a batch of symbols anchored to named output sections.
    pub fn define_symbols_in_sections(
        &mut self,
        layout: &'a dyn Layout,
        target: &dyn Target,
        definitions: &[DefineSymbolInSection<'_>],
    ) {
        for def in definitions {
            match layout.find_output_section(def.output_section) {
                Some(section) => {
                    self.define_in_output_data(
                        target,
                        def.name,
                        section,
                        def.value,
                        def.size,
                        def.symbol_type,
                        def.binding,
                        def.visibility,
                        def.nonvis,
                        def.offset_is_from_end,
                        def.only_if_ref,
                    );
                }
                None => {
                    self.define_as_constant(
                        target,
                        def.name,
                        0,
                        def.size,
                        def.symbol_type,
                        def.binding,
                        def.visibility,
                        def.nonvis,
                        def.only_if_ref,
                    );
                }
            }
        }
    }

    /// Define a batch of symbols anchored to output segments.
    pub fn define_symbols_in_segments(
        &mut self,
        layout: &'a dyn Layout,
        target: &dyn Target,
        definitions: &[DefineSymbolInSegment<'_>],
    ) {
        for def in definitions {
            match layout.find_output_segment(
                def.segment_type,
                def.segment_flags_set,
                def.segment_flags_clear,
            ) {
                Some(segment) => {
                    self.define_in_output_segment(
                        target,
                        def.name,
                        segment,
                        def.value,
                        def.size,
                        def.symbol_type,
                        def.binding,
                        def.visibility,
                        def.nonvis,
                        def.offset_base,
                        def.only_if_ref,
                    );
                }
                None => {
                    self.define_as_constant(
                        target,
                        def.name,
                        0,
                        def.size,
                        def.symbol_type,
                        def.binding,
                        def.visibility,
                        def.nonvis,
                        def.only_if_ref,
                    );
                }
            }
        }
    }

    /// Set the final value of every symbol and select which are emitted.
    ///
    /// Must run after layout has assigned every output address. `off` is the
    /// file offset the symbol table may start at; the aligned start is
    /// recorded and the offset past the table is returned. Every emitted
    /// name is added to `pool`, the output string pool.
    pub fn finalize(&mut self, off: u64, pool: &mut Stringpool) -> Result<u64> {
        let Some(class) = self.class else {
            bail!("symbol table class never set: no inputs were added");
        };
        let sym_size = class.sym_size() as u64;
        let mut off = align_up(off, class.addr_size());
        self.offset = off;

        let mut count = 0;
        for index in 0..self.symbols.len() {
            if self.symbols[index].is_forwarder() {
                continue;
            }

            let sym = &self.symbols[index];
            let resolved = match *sym.source() {
                SymbolSource::FromObject { object, shndx } => {
                    if shndx >= u32::from(elf::SHN_LORESERVE)
                        && shndx != u32::from(elf::SHN_ABS)
                    {
                        bail!(
                            "{}: unsupported symbol section 0x{:x} for `{}`",
                            object.name(),
                            shndx,
                            self.namepool.get(sym.name())
                        );
                    }
                    if object.is_dynamic() {
                        // TODO: emit defined dynamic symbols once there is a
                        // dynamic symbol table writer.
                        Some((0, elf::SHN_UNDEF))
                    } else if shndx == u32::from(elf::SHN_UNDEF) {
                        Some((0, elf::SHN_UNDEF))
                    } else if shndx == u32::from(elf::SHN_ABS) {
                        Some((sym.value(), elf::SHN_ABS))
                    } else {
                        // A symbol whose section was discarded is dropped.
                        object.output_section(shndx).map(|(section, secoff)| {
                            (
                                sym.value() + section.address() + secoff,
                                section.out_shndx(),
                            )
                        })
                    }
                }
                SymbolSource::InOutputData {
                    data,
                    offset_is_from_end,
                } => {
                    let mut value = sym.value() + data.address();
                    if offset_is_from_end {
                        value += data.data_size();
                    }
                    Some((value, data.out_shndx()))
                }
                SymbolSource::InOutputSegment {
                    segment,
                    offset_base,
                } => {
                    let mut value = sym.value() + segment.vaddr();
                    match offset_base {
                        SegmentOffsetBase::SegmentStart => {}
                        SegmentOffsetBase::SegmentEnd => value += segment.memsz(),
                        SegmentOffsetBase::SegmentBss => value += segment.filesz(),
                    }
                    Some((value, elf::SHN_ABS))
                }
                SymbolSource::Constant => Some((sym.value(), elf::SHN_ABS)),
            };

            let Some((value, shndx)) = resolved else {
                continue;
            };
            let name_key = {
                let sym = &mut self.symbols[index];
                sym.value = value;
                sym.out_shndx = Some(shndx);
                sym.name()
            };
            pool.add(self.namepool.get(name_key));
            off += sym_size;
            count += 1;
        }
        self.output_count = count;

        // With every symbol's source now stable, decide which of them carry
        // warnings and pull in the warning text.
        self.note_warnings()?;

        Ok(off)
    }

    /// Write the emitted records into the output file at the offset chosen
    /// by `finalize`. `sympool` must be the pool `finalize` filled.
    pub fn write_globals(
        &self,
        target: &dyn Target,
        sympool: &Stringpool,
        of: &mut dyn OutputFile,
    ) -> Result<()> {
        if self.output_count == 0 {
            return Ok(());
        }
        let Some(class) = self.class else {
            bail!("write_globals before finalize");
        };
        let endian = target.endianness();
        let sym_size = class.sym_size();
        let view = of.get_output_view(self.offset, self.output_count * sym_size)?;

        let mut pos = 0;
        for sym in &self.symbols {
            if sym.is_forwarder() {
                continue;
            }
            // Skipped by finalize (discarded defining section).
            let Some(shndx) = sym.out_shndx() else {
                continue;
            };
            let name = self.namepool.get(sym.name());
            let key = sympool
                .find(name)
                .with_context(|| format!("`{}` missing from the output string pool", name))?;
            let record = ElfSymbol {
                st_name: sympool.get_offset(key) as u32,
                shndx: u32::from(shndx),
                value: sym.value(),
                size: sym.symsize(),
                symbol_type: sym.symbol_type(),
                binding: sym.binding(),
                visibility: sym.visibility(),
                nonvis: sym.nonvis(),
            };
            record.encode(class, endian, &mut view[pos..pos + sym_size]);
            pos += sym_size;
        }
        debug_assert_eq!(pos, self.output_count * sym_size);
        Ok(())
    }

    /// Record that `object` carries a warning for `name` in its section
    /// `shndx`. The text is read later, during `finalize`.
    pub fn add_warning(&mut self, name: &str, object: &'a dyn Object, shndx: u32) {
        let key = self.namepool.add(name);
        self.warnings.add(key, object, shndx);
    }

    /// Mark the symbols that warnings apply to and cache the warning text.
    /// Runs as part of `finalize`, once every symbol's source is stable.
    pub fn note_warnings(&mut self) -> Result<()> {
        for (name_key, object, shndx) in self.warnings.entries() {
            let Some(&id) = self.table.get(&(name_key.raw(), 0)) else {
                continue;
            };
            let matches = self.symbols[id.index()]
                .object()
                .is_some_and(|owner| same_object(owner, object));
            if !matches {
                continue;
            }
            self.symbols[id.index()].has_warning = true;

            // The section read takes the object's own lock, scoped to the
            // call; warnings issued during relocation use the cached text
            // and never lock.
            let contents = object.section_contents(shndx).with_context(|| {
                format!("{}: reading warning section {}", object.name(), shndx)
            })?;
            self.warnings
                .set_text(name_key, String::from_utf8_lossy(&contents).into_owned());
        }
        Ok(())
    }

    /// Emit the warning attached to a symbol, at a relocation's location.
    /// Returns the message, `None` if no warning text is recorded.
    pub fn issue_warning(&self, id: SymbolId, location: &str) -> Option<String> {
        let sym = &self.symbols[id.index()];
        debug_assert!(sym.has_warning());
        let text = self.warnings.text(sym.name())?;
        let message = format!("{}: warning: {}", location, text);
        warn!("{}", message);
        Some(message)
    }
}
