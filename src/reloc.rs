//! Relocation engine.
//!
//! Patches bytes already copied into a destination region according to each
//! `SHT_RELA` entry's type, symbol, and addend, following the reference
//! loader's relocation `switch` exactly: `R_X86_64_64` is a full 64-bit
//! store, `R_X86_64_{32,32S}` are 32-bit stores of `S + A`, and
//! `R_X86_64_{PC32,PLT32}` are 32-bit stores of `S + A - P`. `PLT32` is
//! treated identically to `PC32` since this loader binds external symbols
//! directly and never goes through a PLT stub.
//!
//! `SHT_REL` (addend-less relocations) sections are never produced by
//! [`crate::elf::ElfView::relocation_sections`], so this engine only ever
//! sees `Elf64_Rela` entries — matching the reference loader, which reads
//! no other relocation form.

use crate::elf::{r_x86_64, ElfView, Rela};
use crate::error::Error;
use crate::layout::Layout;
use crate::resolve::{resolve_symbol, SymbolResolver};

/// Apply every relocation in `view` against the bytes already copied into
/// `region`, a writable view over the destination memory region starting at
/// `region_base`.
pub fn apply_all(
    view: &ElfView,
    layout: &Layout,
    region: &mut [u8],
    region_base: usize,
    host: &dyn SymbolResolver,
) -> Result<(), Error> {
    let symbols = view.symbols()?;

    for (target, entries) in view.relocation_sections()? {
        let target_offset = layout
            .offset_of(target)
            .expect("relocation_sections only yields allocatable targets");

        for rela in &entries {
            let sym = symbols
                .get(rela.sym as usize)
                .ok_or(Error::SymbolInNonAllocSection {
                    index: rela.sym as usize,
                })?;
            let sym_addr = resolve_symbol(view, sym, layout, region_base, host)?;
            apply_one(region, target_offset, rela, sym_addr, region_base)?;
        }
    }

    Ok(())
}

fn apply_one(
    region: &mut [u8],
    target_offset: usize,
    rela: &Rela,
    sym_addr: u64,
    region_base: usize,
) -> Result<(), Error> {
    let patch_offset = target_offset + rela.offset as usize;
    let patch_addr = (region_base + patch_offset) as i64;

    match rela.rel_type {
        r_x86_64::R64 => {
            let value = (sym_addr as i64).wrapping_add(rela.addend) as u64;
            write_at(region, patch_offset, &value.to_le_bytes())
        }
        r_x86_64::R32 => {
            let full = (sym_addr as i64).wrapping_add(rela.addend);
            if full < 0 || full > u32::MAX as i64 {
                return Err(Error::Overflow32 {
                    kind: "R_X86_64_32",
                    value: full,
                });
            }
            write_at(region, patch_offset, &(full as u32).to_le_bytes())
        }
        r_x86_64::R32S => {
            let full = (sym_addr as i64).wrapping_add(rela.addend);
            write_at(region, patch_offset, &(full as i32).to_le_bytes())
        }
        r_x86_64::PC32 | r_x86_64::PLT32 => {
            let full = (sym_addr as i64).wrapping_add(rela.addend) - patch_addr;
            write_at(region, patch_offset, &(full as i32).to_le_bytes())
        }
        other => Err(Error::UnsupportedRelocation { kind: other }),
    }
}

fn write_at(region: &mut [u8], offset: usize, bytes: &[u8]) -> Result<(), Error> {
    let end = offset + bytes.len();
    region
        .get_mut(offset..end)
        .ok_or(Error::Truncated)?
        .copy_from_slice(bytes);
    Ok(())
}
