//! Execution driver.
//!
//! Ties [`crate::elf`], [`crate::layout`], [`crate::resolve`], and
//! [`crate::reloc`] together: map a writable region, copy section contents
//! into it, apply relocations, flip the region executable, locate the
//! requested entry symbol, and invoke it. Mirrors the reference loader's
//! `BOFLoader` end to end.

use std::ffi::c_void;

use tracing::{debug, info, trace};

use crate::abi::{self, EntryFn};
use crate::elf::{shn, ElfView};
use crate::error::Error;
use crate::layout::Layout;
use crate::reloc;
use crate::resolve::SymbolResolver;

/// A single-use, write-then-execute anonymous memory region.
///
/// Starts life `PROT_READ | PROT_WRITE`; [`Region::make_executable`]
/// transitions it to `PROT_READ | PROT_EXEC` once relocations are applied.
/// Always unmapped on drop, on every exit path including errors, so a
/// failed load never leaks executable memory.
///
/// Holds a raw pointer, so it is `!Send`/`!Sync` by the normal auto-trait
/// rules; no thread-safety impl is provided for it.
pub struct Region {
    base: *mut u8,
    size: usize,
}

impl Region {
    /// Map `size` bytes of zeroed, anonymous, private, read-write memory.
    fn map(size: usize) -> Result<Self, Error> {
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(Error::AllocFailed);
        }
        Ok(Self {
            base: base as *mut u8,
            size,
        })
    }

    /// Base address of the mapping.
    pub fn base(&self) -> usize {
        self.base as usize
    }

    /// Total mapped size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// A mutable view over the whole mapping, for copying sections in and
    /// applying relocations.
    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.base, self.size) }
    }

    /// Transition the mapping from read-write to read-execute.
    fn make_executable(&mut self) -> Result<(), Error> {
        let rc = unsafe {
            libc::mprotect(
                self.base as *mut c_void,
                self.size,
                libc::PROT_READ | libc::PROT_EXEC,
            )
        };
        if rc != 0 {
            return Err(Error::ProtectFailed);
        }
        Ok(())
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut c_void, self.size);
        }
    }
}

/// Host symbol resolver backed by the dynamic loader's global symbol scope
/// (`dlsym(RTLD_DEFAULT, name)`), exactly as the reference loader resolves
/// externs like `printf`.
pub struct DynamicResolver;

impl SymbolResolver for DynamicResolver {
    fn resolve(&self, name: &str) -> Option<u64> {
        let cname = std::ffi::CString::new(name).ok()?;
        let addr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, cname.as_ptr()) };
        if addr.is_null() {
            None
        } else {
            Some(addr as u64)
        }
    }
}

/// Load `object_bytes`, locate the symbol named `entry_name`, invoke it
/// with `args`, and return its string result. The backing memory region is
/// unmapped before returning, on every path, success or failure.
pub fn run(
    object_bytes: &[u8],
    entry_name: &str,
    args: &[u8],
    host: &dyn SymbolResolver,
) -> Result<String, Error> {
    let view = ElfView::parse(object_bytes)?;
    trace!(sections = view.sections().len(), "parsed object");

    let layout = Layout::plan(view.sections())?;
    debug!(total_size = layout.total_size(), "planned section layout");

    let mut region = Region::map(layout.total_size())?;
    info!(base = %format!("{:#x}", region.base()), size = region.size(), "mapped region");

    copy_sections(&view, &layout, &mut region)?;

    let region_base = region.base();
    reloc::apply_all(&view, &layout, region.as_mut_slice(), region_base, host)?;
    trace!("relocations applied");

    let entry_addr = find_entry(&view, &layout, region.base(), entry_name)?;
    debug!(entry = %format!("{:#x}", entry_addr), name = entry_name, "entry resolved");

    region.make_executable()?;
    info!("region transitioned to read-execute");

    let entry_fn: EntryFn = unsafe { std::mem::transmute(entry_addr as usize) };
    let result = unsafe { abi::invoke(entry_fn, args) };
    info!(%result, "invocation returned");

    Ok(result)
}

fn copy_sections(view: &ElfView, layout: &Layout, region: &mut Region) -> Result<(), Error> {
    let slice = region.as_mut_slice();
    for (index, shdr) in view.sections().iter().enumerate() {
        let Some(offset) = layout.offset_of(index) else {
            continue;
        };
        let data = view.section_bytes(index);
        if data.is_empty() {
            continue; // SHT_NOBITS sections are already zeroed by mmap.
        }
        let end = offset + data.len();
        slice
            .get_mut(offset..end)
            .ok_or(Error::Truncated)?
            .copy_from_slice(data);
    }
    Ok(())
}

fn find_entry(
    view: &ElfView,
    layout: &Layout,
    region_base: usize,
    entry_name: &str,
) -> Result<u64, Error> {
    for sym in view.symbols()? {
        if sym.shndx == shn::UNDEF {
            continue;
        }
        if view.symbol_name(&sym)? != entry_name {
            continue;
        }
        let offset = layout
            .offset_of(sym.shndx as usize)
            .ok_or(Error::SymbolInNonAllocSection {
                index: sym.shndx as usize,
            })?;
        return Ok((region_base + offset) as u64 + sym.value);
    }
    Err(Error::EntryNotFound {
        name: entry_name.to_string(),
    })
}
