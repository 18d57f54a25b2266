//! Synthetic ELF64/x86-64 `ET_REL` object builder, test-only.
//!
//! No binary fixture is vendored; instead tests assemble minimal objects
//! field by field, which keeps section layout, symbol resolution, and
//! relocation behavior directly checkable without a prebuilt `.o` file.

#![allow(dead_code)]

use crate::elf::{sht, shn};

/// Content of a section in the object being built.
pub enum Content {
    /// Bytes present in the file.
    Bytes(Vec<u8>),
    /// `SHT_NOBITS`: occupies no file space.
    NoBits(u64),
}

/// A section to be emitted, before file offsets are known.
pub struct SectionSpec {
    pub name: String,
    pub sh_type: u32,
    pub flags: u64,
    pub align: u64,
    pub link: u32,
    pub info: u32,
    pub content: Content,
}

/// A symbol table entry to add to `.symtab`, at index 1 or later (index 0
/// is always the mandatory null entry, added automatically).
pub struct SymSpec {
    pub name: String,
    pub info: u8,
    pub shndx: u16,
    pub value: u64,
}

/// A relocation entry to add to a `.rela.*` section. `sym_index` indexes
/// the symbol table including its implicit null entry at 0, so the first
/// symbol registered with [`ObjectBuilder::set_symbols`] is index 1.
pub struct RelaSpec {
    pub offset: u64,
    pub sym_index: u32,
    pub rel_type: u32,
    pub addend: i64,
}

/// Builds a minimal but structurally valid ELF64/x86-64/`ET_REL` object.
#[derive(Default)]
pub struct ObjectBuilder {
    sections: Vec<SectionSpec>,
    symbols: Vec<SymSpec>,
    relas: Vec<(usize, Vec<RelaSpec>)>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section with file-resident content; returns its eventual index
    /// (1-based: index 0 is the mandatory null section).
    pub fn add_section(&mut self, spec: SectionSpec) -> usize {
        self.sections.push(spec);
        self.sections.len() // +1 for the null section at index 0
    }

    /// Add a `.text`-like `PROGBITS`, allocatable, executable section.
    pub fn add_text(&mut self, name: &str, data: Vec<u8>) -> usize {
        self.add_section(SectionSpec {
            name: name.to_string(),
            sh_type: sht::PROGBITS,
            flags: 0x2 | 0x4, // ALLOC | EXECINSTR
            align: 16,
            link: 0,
            info: 0,
            content: Content::Bytes(data),
        })
    }

    /// Add a `.bss`-like `NOBITS`, allocatable, writable section.
    pub fn add_bss(&mut self, name: &str, size: u64) -> usize {
        self.add_section(SectionSpec {
            name: name.to_string(),
            sh_type: sht::NOBITS,
            flags: 0x2 | 0x1, // ALLOC | WRITE
            align: 8,
            link: 0,
            info: 0,
            content: Content::NoBits(size),
        })
    }

    /// Add a non-allocatable `PROGBITS` section (e.g. faux debug info).
    pub fn add_non_alloc(&mut self, name: &str, data: Vec<u8>) -> usize {
        self.add_section(SectionSpec {
            name: name.to_string(),
            sh_type: sht::PROGBITS,
            flags: 0,
            align: 1,
            link: 0,
            info: 0,
            content: Content::Bytes(data),
        })
    }

    /// Register the symbols that will populate `.symtab`/`.strtab`.
    pub fn set_symbols(&mut self, symbols: Vec<SymSpec>) {
        self.symbols = symbols;
    }

    /// Add a `.rela.*` section targeting section index `target`.
    pub fn add_rela(&mut self, target: usize, entries: Vec<RelaSpec>) {
        self.relas.push((target, entries));
    }

    /// Assemble the final byte buffer.
    pub fn build(self) -> Vec<u8> {
        // Layout: ehdr, then each section's file content back-to-back
        // (null section and NOBITS sections occupy no file bytes), then the
        // section header table at the end. Section name / symbol name /
        // string table sections are appended automatically.
        let mut shstrtab = StringTable::new();
        let mut strtab = StringTable::new();

        // Build .strtab + .symtab bytes up front, since symbol names must be
        // assigned string table offsets before the symtab bytes are frozen.
        // Index 0 of a symbol table is always the mandatory null entry;
        // caller-registered symbols start at index 1.
        let mut symtab_bytes = vec![0u8; 24];
        for sym in &self.symbols {
            let name_off = strtab.intern(&sym.name);
            symtab_bytes.extend_from_slice(&name_off.to_le_bytes());
            symtab_bytes.push(sym.info);
            symtab_bytes.push(0); // st_other
            symtab_bytes.extend_from_slice(&sym.shndx.to_le_bytes());
            symtab_bytes.extend_from_slice(&sym.value.to_le_bytes());
            symtab_bytes.extend_from_slice(&0u64.to_le_bytes()); // st_size
        }
        let strtab_bytes = strtab.into_bytes();

        // Final section order: [user sections..., .symtab, .strtab,
        // .rela.* for each registered relocation group, .shstrtab].
        let mut all: Vec<(String, u32, u64, u64, u32, u32, Vec<u8>)> = Vec::new();
        let mut nobits_sizes: Vec<Option<u64>> = Vec::new();

        for s in &self.sections {
            let (bytes, nobits) = match &s.content {
                Content::Bytes(b) => (b.clone(), None),
                Content::NoBits(size) => (Vec::new(), Some(*size)),
            };
            all.push((s.name.clone(), s.sh_type, s.flags, s.align, s.link, s.info, bytes));
            nobits_sizes.push(nobits);
        }

        let symtab_index = if !self.symbols.is_empty() {
            let idx = all.len() + 1; // +1 for null section at index 0
            all.push((
                ".symtab".to_string(),
                sht::SYMTAB,
                0,
                8,
                0, // link fixed up below once strtab index is known
                0,
                symtab_bytes,
            ));
            nobits_sizes.push(None);
            Some(idx)
        } else {
            None
        };

        let strtab_index = if !self.symbols.is_empty() {
            let idx = all.len() + 1;
            all.push((".strtab".to_string(), sht::STRTAB, 0, 1, 0, 0, strtab_bytes));
            nobits_sizes.push(None);
            Some(idx)
        } else {
            None
        };

        if let (Some(symtab_index), Some(strtab_index)) = (symtab_index, strtab_index) {
            all[symtab_index - 1].4 = strtab_index as u32;
        }

        let rela_indices: Vec<usize> = self
            .relas
            .iter()
            .map(|(target, entries)| {
                let mut bytes = Vec::new();
                for e in entries {
                    bytes.extend_from_slice(&e.offset.to_le_bytes());
                    let r_info = ((e.sym_index as u64) << 32) | (e.rel_type as u64);
                    bytes.extend_from_slice(&r_info.to_le_bytes());
                    bytes.extend_from_slice(&e.addend.to_le_bytes());
                }
                let idx = all.len() + 1;
                let link = symtab_index.unwrap_or(0) as u32;
                all.push((
                    format!(".rela{}", idx),
                    sht::RELA,
                    0,
                    8,
                    link,
                    *target as u32,
                    bytes,
                ));
                nobits_sizes.push(None);
                idx
            })
            .collect();
        let _ = rela_indices;

        // Section name string table, covering every non-null section plus
        // itself.
        for (name, ..) in &all {
            shstrtab.intern(name);
        }
        let shstrtab_index = all.len() + 1;
        shstrtab.intern(".shstrtab");
        let shstrtab_bytes = shstrtab.clone_bytes();
        all.push((".shstrtab".to_string(), sht::STRTAB, 0, 1, 0, 0, shstrtab_bytes));
        nobits_sizes.push(None);

        // Now lay out file offsets: header, then each non-NOBITS section's
        // bytes back to back (naturally aligned, simple packing is fine for
        // a test object), then the section header table.
        const EHDR_SIZE: u64 = 64;
        const SHDR_SIZE: u64 = 64;

        let mut offsets = Vec::with_capacity(all.len());
        let mut cursor = EHDR_SIZE;
        for (i, (_, sh_type, ..)) in all.iter().enumerate() {
            if *sh_type == sht::NOBITS || nobits_sizes[i].is_some() {
                offsets.push(0);
                continue;
            }
            offsets.push(cursor);
            cursor += all[i].6.len() as u64;
        }
        let shoff = cursor;

        let mut buf = Vec::new();
        // e_ident
        buf.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
        buf.push(2); // ELFCLASS64
        buf.push(1); // ELFDATA2LSB
        buf.push(1); // EV_CURRENT
        buf.extend_from_slice(&[0u8; 9]); // pad to 16
        buf.extend_from_slice(&1u16.to_le_bytes()); // e_type = ET_REL
        buf.extend_from_slice(&62u16.to_le_bytes()); // e_machine = EM_X86_64
        buf.extend_from_slice(&1u32.to_le_bytes()); // e_version
        buf.extend_from_slice(&0u64.to_le_bytes()); // e_entry
        buf.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
        buf.extend_from_slice(&shoff.to_le_bytes()); // e_shoff
        buf.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        buf.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes()); // e_ehsize
        buf.extend_from_slice(&0u16.to_le_bytes()); // e_phentsize
        buf.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
        buf.extend_from_slice(&(SHDR_SIZE as u16).to_le_bytes()); // e_shentsize
        buf.extend_from_slice(&((all.len() + 1) as u16).to_le_bytes()); // e_shnum
        buf.extend_from_slice(&(shstrtab_index as u16).to_le_bytes()); // e_shstrndx
        assert_eq!(buf.len() as u64, EHDR_SIZE);

        for (i, (_, _, _, _, _, _, data)) in all.iter().enumerate() {
            if nobits_sizes[i].is_some() {
                continue;
            }
            buf.extend_from_slice(data);
        }

        // Null section header at index 0.
        buf.extend_from_slice(&[0u8; SHDR_SIZE as usize]);

        for (i, (name, sh_type, flags, align, link, info, data)) in all.iter().enumerate() {
            let name_off = shstrtab.offset_of(name);
            let size = nobits_sizes[i].unwrap_or(data.len() as u64);
            buf.extend_from_slice(&name_off.to_le_bytes());
            buf.extend_from_slice(&sh_type.to_le_bytes());
            buf.extend_from_slice(&flags.to_le_bytes());
            buf.extend_from_slice(&0u64.to_le_bytes()); // sh_addr
            buf.extend_from_slice(&offsets[i].to_le_bytes());
            buf.extend_from_slice(&size.to_le_bytes());
            buf.extend_from_slice(&link.to_le_bytes());
            buf.extend_from_slice(&info.to_le_bytes());
            buf.extend_from_slice(&align.to_le_bytes());
            buf.extend_from_slice(&0u64.to_le_bytes()); // sh_entsize
        }

        buf
    }
}

/// Section/symbol name -> offset within a growing string table, NUL-byte 0
/// always present at offset 0 for the empty name.
#[derive(Clone)]
struct StringTable {
    bytes: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        Self { bytes: vec![0] }
    }

    fn intern(&mut self, name: &str) -> u32 {
        if name.is_empty() {
            return 0;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(0);
        offset
    }

    fn offset_of(&self, name: &str) -> u32 {
        if name.is_empty() {
            return 0;
        }
        let needle = {
            let mut v = name.as_bytes().to_vec();
            v.push(0);
            v
        };
        self.bytes
            .windows(needle.len())
            .position(|w| w == needle.as_slice())
            .map(|p| p as u32)
            .unwrap_or(0)
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn clone_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// A symbol's `STB_GLOBAL`/`STT_FUNC` info byte.
pub const STB_GLOBAL_STT_FUNC: u8 = (1 << 4) | 2;

/// A symbol's `STB_GLOBAL`/`STT_NOTYPE` info byte.
pub const STB_GLOBAL_STT_NOTYPE: u8 = 1 << 4;

pub use shn::UNDEF as SHN_UNDEF;
pub use shn::ABS as SHN_ABS;
