//! The pairwise symbol merge rule.
//!
//! Given the current winner for a `(name, version)` and one more raw ELF
//! symbol from some input, decide which side wins and update the record in
//! place. The precedence is definition over reference, strong over weak,
//! defined over common, and first-wins between equals; dynamic objects lose
//! address ties against regular objects silently.

use object::elf;

use crate::elf::ElfSymbol;
use crate::object::Object;
use crate::symbol::{Symbol, SymbolSource};

/// Both sides are strong definitions from regular objects. The caller
/// reports it; the first definition stays the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipleDefinition;

#[derive(Clone, Copy, PartialEq, Eq)]
enum DefClass {
    Defined,
    Common,
    Undefined,
}

fn classify_shndx(shndx: u32) -> DefClass {
    if shndx == u32::from(elf::SHN_UNDEF) {
        DefClass::Undefined
    } else if shndx == u32::from(elf::SHN_COMMON) {
        DefClass::Common
    } else {
        DefClass::Defined
    }
}

fn classify_symbol(sym: &Symbol) -> DefClass {
    match *sym.source() {
        SymbolSource::FromObject { shndx, .. } => classify_shndx(shndx),
        // Linker-defined symbols and constants are definitions.
        _ => DefClass::Defined,
    }
}

// STV_DEFAULT < STV_PROTECTED < STV_HIDDEN < STV_INTERNAL.
fn visibility_rank(visibility: u8) -> u8 {
    match visibility {
        elf::STV_PROTECTED => 1,
        elf::STV_HIDDEN => 2,
        elf::STV_INTERNAL => 3,
        _ => 0,
    }
}

/// Merge `incoming` (from `object`, or from no object when replaying an
/// already-merged record) into the current winner `to`.
pub fn resolve<'a>(
    to: &mut Symbol<'a>,
    incoming: &ElfSymbol,
    object: Option<&'a dyn Object>,
) -> Result<(), MultipleDefinition> {
    let incoming_dyn = object.is_some_and(|obj| obj.is_dynamic());

    // These compose whichever side wins.
    if visibility_rank(incoming.visibility) > visibility_rank(to.visibility()) {
        to.visibility = incoming.visibility;
    }
    if incoming_dyn {
        to.in_dyn = true;
    }

    let cur_dyn = to.is_from_dynamic();
    let cur_strong = to.is_strong();
    let inc_strong = incoming.binding != elf::STB_WEAK;
    let inc_class = classify_shndx(incoming.shndx);

    let mut outcome = Ok(());
    let take = match classify_symbol(to) {
        DefClass::Defined if cur_strong => match inc_class {
            DefClass::Defined if inc_strong => {
                // A regular definition beats a dynamic one without comment;
                // two regular strong definitions are a link error.
                if cur_dyn && !incoming_dyn {
                    true
                } else {
                    if !cur_dyn && !incoming_dyn {
                        outcome = Err(MultipleDefinition);
                    }
                    false
                }
            }
            _ => false,
        },
        DefClass::Defined => matches!(inc_class, DefClass::Defined if inc_strong),
        DefClass::Common => match inc_class {
            DefClass::Defined if inc_strong => true,
            DefClass::Common => {
                // Tentative definitions merge: largest size, strictest
                // alignment (a common symbol's value is its alignment).
                to.symsize = to.symsize.max(incoming.size);
                to.value = to.value.max(incoming.value);
                false
            }
            _ => false,
        },
        DefClass::Undefined => match inc_class {
            DefClass::Undefined => {
                if inc_strong && !cur_strong {
                    to.binding = incoming.binding;
                }
                false
            }
            _ => true,
        },
    };

    if take {
        if let Some(object) = object {
            to.source = SymbolSource::FromObject {
                object,
                shndx: incoming.shndx,
            };
        }
        to.value = incoming.value;
        to.symsize = incoming.size;
        to.symbol_type = incoming.symbol_type;
        to.binding = incoming.binding;
        to.nonvis = incoming.nonvis;
        to.is_def = incoming.shndx != u32::from(elf::SHN_UNDEF);
    }

    outcome
}
