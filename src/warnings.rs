//! Warning text attached to symbols.
//!
//! A `.gnu.warning.SYMBOL` section asks the linker to print its contents
//! whenever SYMBOL is referenced. The symbol table records the requests
//! here during ingestion; once `finalize` knows every symbol's source, the
//! matching records are flagged and the section text is cached so issuing a
//! warning at relocation time never has to touch the input object again.

use std::collections::HashMap;

use crate::object::Object;
use crate::stringpool::Key;

struct WarningLocation<'a> {
    object: &'a dyn Object,
    shndx: u32,
    text: Option<String>,
}

/// Side table mapping a symbol name to the warning attached to it.
#[derive(Default)]
pub struct Warnings<'a> {
    warnings: HashMap<Key, WarningLocation<'a>>,
}

impl<'a> Warnings<'a> {
    /// Record that `object` carries a warning for `name` in section `shndx`.
    pub(crate) fn add(&mut self, name: Key, object: &'a dyn Object, shndx: u32) {
        self.warnings.insert(
            name,
            WarningLocation {
                object,
                shndx,
                text: None,
            },
        );
    }

    /// Snapshot of every recorded warning's location.
    pub(crate) fn entries(&self) -> Vec<(Key, &'a dyn Object, u32)> {
        self.warnings
            .iter()
            .map(|(&name, loc)| (name, loc.object, loc.shndx))
            .collect()
    }

    /// Cache the warning text read from the carrying section.
    pub(crate) fn set_text(&mut self, name: Key, text: String) {
        if let Some(loc) = self.warnings.get_mut(&name) {
            loc.text = Some(text);
        }
    }

    /// The cached warning text for `name`, once `set_text` has run.
    pub(crate) fn text(&self, name: Key) -> Option<&str> {
        self.warnings.get(&name)?.text.as_deref()
    }
}
