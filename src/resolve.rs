//! Symbol resolver.
//!
//! Maps a symbol index to a runtime address, distinguishing undefined
//! (external), absolute, and section-relative symbols.

use crate::elf::{shn, ElfView, Sym};
use crate::error::Error;
use crate::layout::Layout;

/// A host-provided "name → absolute address" lookup, abstracted so
/// production code can use the dynamic loader and tests can use a fake
/// table.
pub trait SymbolResolver {
    /// Resolve `name` in the host's global symbol namespace.
    fn resolve(&self, name: &str) -> Option<u64>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Option<u64>,
{
    fn resolve(&self, name: &str) -> Option<u64> {
        self(name)
    }
}

/// Resolve symbol `sym` to a runtime address within `region_base`, using
/// `layout` for section-relative symbols and `host` for external ones.
pub fn resolve_symbol(
    view: &ElfView,
    sym: &Sym,
    layout: &Layout,
    region_base: usize,
    host: &dyn SymbolResolver,
) -> Result<u64, Error> {
    if sym.shndx == shn::UNDEF {
        let name = view.symbol_name(sym)?;
        host.resolve(name)
            .ok_or_else(|| Error::UnresolvedExternal {
                name: name.to_string(),
            })
    } else if sym.shndx == shn::ABS {
        Ok(sym.value)
    } else {
        let index = sym.shndx as usize;
        let offset = layout
            .offset_of(index)
            .ok_or(Error::SymbolInNonAllocSection { index })?;
        Ok((region_base + offset) as u64 + sym.value)
    }
}
