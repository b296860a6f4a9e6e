//! Merge-rule behavior across whole ingestions.

mod common;

use common::{SymtabBuilder, TestObject, TestTarget};
use object::{elf, Endianness};
use rld::elf::ElfClass;
use rld::symtab::SymbolTable;
use rld::target::SymbolAllocation;

#[test]
fn strong_definition_overrides_weak() {
    let a = TestObject::new("a.o");
    let b = TestObject::new("b.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().weak_func("w", 1, 0x10).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let (syms, names) = SymtabBuilder::elf64().func("w", 1, 0x20).build();
    symtab
        .add_from_relobj(&b, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();

    let id = symtab.lookup("w", None).unwrap();
    let sym = symtab.symbol(id);
    assert_eq!(sym.binding(), elf::STB_GLOBAL);
    assert_eq!(sym.value(), 0x20);
    assert_eq!(sym.object().unwrap().name(), "b.o");
    assert_eq!(symtab.error_count(), 0);
}

#[test]
fn second_strong_definition_is_reported_and_first_wins() {
    let a = TestObject::new("a.o");
    let b = TestObject::new("b.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("s", 1, 0x10).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let (syms, names) = SymtabBuilder::elf64().func("s", 1, 0x20).build();
    symtab
        .add_from_relobj(&b, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();

    assert_eq!(symtab.error_count(), 1);
    let id = symtab.lookup("s", None).unwrap();
    let sym = symtab.symbol(id);
    assert_eq!(sym.value(), 0x10);
    assert_eq!(sym.object().unwrap().name(), "a.o");
}

#[test]
fn commons_merge_to_the_larger_size() {
    let a = TestObject::new("a.o");
    let b = TestObject::new("b.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().common("c", 4, 4).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let (syms, names) = SymtabBuilder::elf64().common("c", 8, 16).build();
    symtab
        .add_from_relobj(&b, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();

    let id = symtab.lookup("c", None).unwrap();
    let sym = symtab.symbol(id);
    assert!(sym.is_common());
    assert_eq!(sym.symsize(), 16);
    assert_eq!(sym.value(), 8, "strictest alignment survives");
    assert_eq!(symtab.commons(), &[id]);
}

#[test]
fn definition_in_excluded_section_degrades_to_reference() {
    let a = TestObject::new("a.o").exclude(7);
    let b = TestObject::new("b.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("g", 7, 0x100).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let id = symtab.lookup("g", None).unwrap();
    assert!(symtab.symbol(id).is_undefined());
    assert_eq!(symtab.saw_undefined(), 1);

    // A later real definition wins without a multiple-definition report.
    let (syms, names) = SymtabBuilder::elf64().func("g", 2, 0x200).build();
    symtab
        .add_from_relobj(&b, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let sym = symtab.symbol(id);
    assert!(sym.is_def());
    assert_eq!(sym.value(), 0x200);
    assert_eq!(symtab.error_count(), 0);
}

#[test]
fn sympointers_map_input_positions_to_merged_records() {
    let a = TestObject::new("a.o");
    let b = TestObject::new("b.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64()
        .undef("puts")
        .func("main", 1, 0)
        .build();
    let pointers_a = symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let (syms, names) = SymtabBuilder::elf64().func("puts", 1, 0x40).build();
    let pointers_b = symtab
        .add_from_relobj(&b, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();

    // Both objects' entries for `puts` are the same record.
    assert_eq!(pointers_a[0], pointers_b[0]);
    assert_eq!(pointers_a[0], symtab.lookup("puts", None));
    assert_eq!(pointers_a[1], symtab.lookup("main", None));
    let sym = symtab.symbol(pointers_b[0].unwrap());
    assert!(sym.is_def());
}

#[test]
fn reingesting_the_same_object_is_idempotent() {
    let a = TestObject::new("a.o");
    let mut symtab = SymbolTable::new();

    let build = || {
        SymtabBuilder::elf64()
            .weak_func("w", 1, 0x10)
            .common("c", 4, 8)
            .undef("ext")
            .build()
    };
    let (syms, names) = build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let snapshot = |symtab: &SymbolTable<'_>| {
        ["w", "c", "ext"].map(|name| {
            let sym = symtab.symbol(symtab.lookup(name, None).unwrap());
            (sym.binding(), sym.value(), sym.symsize(), sym.is_def())
        })
    };
    let first = snapshot(&symtab);

    let (syms, names) = build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    assert_eq!(snapshot(&symtab), first);
    assert_eq!(symtab.error_count(), 0);
    assert_eq!(symtab.saw_undefined(), 1);
    assert_eq!(symtab.commons().len(), 1);
}

#[test]
fn class_mismatch_is_fatal() {
    let a = TestObject::new("a.o");
    let b = TestObject::new("b32.o").with_target(TestTarget::elf32());
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("main", 1, 0).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();

    let (syms, names) = SymtabBuilder::new(ElfClass::Elf32, Endianness::Little)
        .func("aux", 1, 0)
        .build();
    let err = symtab
        .add_from_relobj(&b, ElfClass::Elf32, Endianness::Little, &syms, &names)
        .unwrap_err();
    assert!(err.to_string().contains("mixing"));
}

#[test]
fn endianness_mismatch_is_fatal() {
    let a = TestObject::new("a.o");
    let b = TestObject::new("b.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("main", 1, 0).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();

    let (syms, names) = SymtabBuilder::new(ElfClass::Elf64, Endianness::Big)
        .func("aux", 1, 0)
        .build();
    assert!(symtab
        .add_from_relobj(&b, ElfClass::Elf64, Endianness::Big, &syms, &names)
        .is_err());
}

#[test]
fn bad_name_offset_is_fatal() {
    let a = TestObject::new("a.o");
    let mut symtab = SymbolTable::new();

    let (mut syms, names) = SymtabBuilder::elf64().func("main", 1, 0).build();
    // Corrupt st_name to point far past the string table.
    syms[0] = 0xff;
    syms[1] = 0xff;
    let err = symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap_err();
    assert!(err.to_string().contains("bad global symbol name offset"));
}

#[test]
fn truncated_symbol_table_is_fatal() {
    let a = TestObject::new("a.o");
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("main", 1, 0).build();
    assert!(symtab
        .add_from_relobj(
            &a,
            ElfClass::Elf64,
            Endianness::Little,
            &syms[..syms.len() - 1],
            &names
        )
        .is_err());
}

#[test]
fn target_can_suppress_symbols() {
    let mut quiet = TestTarget::elf64();
    quiet.allocation = SymbolAllocation::Suppress;
    let a = TestObject::new("a.o").with_target(quiet);
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("ignored", 1, 0).build();
    let pointers = symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    assert_eq!(pointers, vec![None]);
    assert!(symtab.lookup("ignored", None).is_none());
}

#[test]
fn target_special_allocation_tags_the_record() {
    let mut special = TestTarget::elf64();
    special.allocation = SymbolAllocation::TargetSpecial;
    let a = TestObject::new("a.o").with_target(special);
    let mut symtab = SymbolTable::new();

    let (syms, names) = SymtabBuilder::elf64().func("tagged", 1, 0).build();
    symtab
        .add_from_relobj(&a, ElfClass::Elf64, Endianness::Little, &syms, &names)
        .unwrap();
    let id = symtab.lookup("tagged", None).unwrap();
    assert!(symtab.symbol(id).is_target_special());
}
