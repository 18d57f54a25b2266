//! Zero-copy ELF64/x86-64 relocatable object view.
//!
//! Validates the ELF identification, then exposes indexed, borrowing access
//! to section headers, the section-name string table, the first symbol
//! table (plus its linked string table), and relocation entries. No data is
//! copied; every returned slice borrows from the input.

use bitflags::bitflags;

use crate::cursor::Cursor;
use crate::error::Error;

/// ELF magic: `0x7f 'E' 'L' 'F'`.
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EM_X86_64: u16 = 62;
const ET_REL: u16 = 1;

const EHDR_SIZE: usize = 64;
const SHDR_SIZE: usize = 64;
const SYM_SIZE: usize = 24;
const RELA_SIZE: usize = 24;

/// Special section indices (`st_shndx` / relocation target).
pub mod shn {
    /// Undefined: an external symbol, resolved via the host.
    pub const UNDEF: u16 = 0;
    /// Absolute: `st_value` is used unchanged.
    pub const ABS: u16 = 0xfff1;
}

/// Section header types relevant to this loader.
pub mod sht {
    /// Program data.
    pub const PROGBITS: u32 = 1;
    /// Symbol table.
    pub const SYMTAB: u32 = 2;
    /// String table.
    pub const STRTAB: u32 = 3;
    /// Relocations with explicit addends.
    pub const RELA: u32 = 4;
    /// Occupies no file space (e.g. `.bss`).
    pub const NOBITS: u32 = 8;
    /// Relocations without addends — not processed by this loader (see
    /// `reloc` module docs).
    pub const REL: u32 = 9;
}

/// Supported `R_X86_64_*` relocation type constants.
pub mod r_x86_64 {
    /// `S + A`, stored as an unsigned 64-bit value.
    pub const R64: u32 = 1;
    /// `S + A`, stored as the low 32 bits.
    pub const R32: u32 = 10;
    /// `S + A − P`, stored as the low 32 bits.
    pub const PC32: u32 = 2;
    /// `S + A`, stored as a signed 32-bit value.
    pub const R32S: u32 = 11;
    /// Treated identically to `PC32` by this loader (no PLT indirection).
    pub const PLT32: u32 = 4;
}

bitflags! {
    /// Section header flags (`sh_flags`).
    #[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
    pub struct SectionFlags: u64 {
        /// Writable at runtime.
        const WRITE = 0x1;
        /// Occupies memory during execution — the central flag for this loader.
        const ALLOC = 0x2;
        /// Contains executable machine instructions.
        const EXECINSTR = 0x4;
    }
}

/// The fixed fields of an ELF64 header this loader cares about.
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    /// Object file type (`ET_REL`, ...).
    pub e_type: u16,
    /// Target machine (`EM_X86_64`, ...).
    pub e_machine: u16,
    /// File offset of the section header table.
    pub e_shoff: u64,
    /// Size of one section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header table index of the section name string table.
    pub e_shstrndx: u16,
}

/// A parsed `Elf64_Shdr`.
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    /// Offset of this section's name in the section-name string table.
    pub name: u32,
    /// Section type (`SHT_*`).
    pub sh_type: u32,
    /// Section flags.
    pub flags: SectionFlags,
    /// File offset of the section's contents (meaningless for `SHT_NOBITS`).
    pub offset: u64,
    /// Size in bytes, in the file and (for allocatable sections) at runtime.
    pub size: u64,
    /// Section-type-dependent link (e.g. symtab → linked strtab index).
    pub link: u32,
    /// Section-type-dependent extra info (e.g. rela → target section index).
    pub info: u32,
    /// Required address alignment; 0 or 1 mean unaligned.
    pub addralign: u64,
}

impl SectionHeader {
    /// Whether this section occupies memory at runtime.
    pub fn is_alloc(&self) -> bool {
        self.flags.contains(SectionFlags::ALLOC)
    }
}

/// A parsed `Elf64_Sym`.
#[derive(Debug, Clone, Copy)]
pub struct Sym {
    /// Offset of this symbol's name in the linked string table.
    pub name: u32,
    /// `st_info`: binding (high 4 bits) and type (low 4 bits).
    pub info: u8,
    /// Section index, or `shn::UNDEF` / `shn::ABS`.
    pub shndx: u16,
    /// Value: a virtual address, section offset, or absolute value
    /// depending on `shndx`.
    pub value: u64,
}

impl Sym {
    /// Symbol binding (`STB_LOCAL`, `STB_GLOBAL`, `STB_WEAK`), the high 4 bits of `st_info`.
    pub fn bind(&self) -> u8 {
        self.info >> 4
    }

    /// Symbol type (`STT_NOTYPE`, `STT_FUNC`, ...), the low 4 bits of `st_info`.
    pub fn sym_type(&self) -> u8 {
        self.info & 0xf
    }
}

/// A parsed `Elf64_Rela`.
#[derive(Debug, Clone, Copy)]
pub struct Rela {
    /// Offset within the target section to patch.
    pub offset: u64,
    /// Index into the symbol table of the referenced symbol.
    pub sym: u32,
    /// Relocation type (`R_X86_64_*`).
    pub rel_type: u32,
    /// Signed addend.
    pub addend: i64,
}

/// Borrowing, zero-copy view over an ELF64/x86-64 `ET_REL` object.
pub struct ElfView<'a> {
    bytes: &'a [u8],
    header: ElfHeader,
    shdrs: Vec<SectionHeader>,
    symtab_index: Option<usize>,
}

impl<'a> ElfView<'a> {
    /// Parse and validate `bytes` as an ELF64, `EM_X86_64`, `ET_REL` object.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < EHDR_SIZE {
            return Err(Error::NotSupportedObject);
        }
        if bytes[0..4] != ELF_MAGIC {
            return Err(Error::NotSupportedObject);
        }
        if bytes[EI_CLASS] != ELFCLASS64 || bytes[EI_DATA] != ELFDATA2LSB {
            return Err(Error::NotSupportedObject);
        }

        let mut cursor = Cursor::at(bytes, 16);
        let e_type = cursor.read_u16()?;
        let e_machine = cursor.read_u16()?;
        if e_machine != EM_X86_64 || e_type != ET_REL {
            return Err(Error::NotSupportedObject);
        }

        let mut cursor = Cursor::at(bytes, 40);
        let e_shoff = cursor.read_u64()?;
        let mut cursor = Cursor::at(bytes, 58);
        let e_shentsize = cursor.read_u16()?;
        let e_shnum = cursor.read_u16()?;
        let e_shstrndx = cursor.read_u16()?;

        let header = ElfHeader {
            e_type,
            e_machine,
            e_shoff,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        };

        let mut shdrs = Vec::with_capacity(header.e_shnum as usize);
        for i in 0..header.e_shnum as usize {
            shdrs.push(Self::read_shdr(bytes, &header, i)?);
        }

        let symtab_index = shdrs.iter().position(|s| s.sh_type == sht::SYMTAB);

        Ok(Self {
            bytes,
            header,
            shdrs,
            symtab_index,
        })
    }

    fn read_shdr(bytes: &'a [u8], header: &ElfHeader, index: usize) -> Result<SectionHeader, Error> {
        let base = header.e_shoff as usize + index * header.e_shentsize as usize;
        let mut cursor = Cursor::at(bytes, base);
        let name = cursor.read_u32()?;
        let sh_type = cursor.read_u32()?;
        let flags = SectionFlags::from_bits_retain(cursor.read_u64()?);
        let _addr = cursor.read_u64()?;
        let offset = cursor.read_u64()?;
        let size = cursor.read_u64()?;
        let link = cursor.read_u32()?;
        let info = cursor.read_u32()?;
        let addralign = cursor.read_u64()?;
        let _entsize = cursor.read_u64()?;

        Ok(SectionHeader {
            name,
            sh_type,
            flags,
            offset,
            size,
            link,
            info,
            addralign,
        })
    }

    /// The validated object header.
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// All section headers, in file order.
    pub fn sections(&self) -> &[SectionHeader] {
        &self.shdrs
    }

    /// The raw file bytes for a section's contents. Returns an empty slice
    /// for `SHT_NOBITS` sections, which occupy no file space.
    pub fn section_bytes(&self, index: usize) -> &'a [u8] {
        let shdr = &self.shdrs[index];
        if shdr.sh_type == sht::NOBITS {
            return &[];
        }
        let start = shdr.offset as usize;
        let end = start + shdr.size as usize;
        &self.bytes[start..end]
    }

    /// Look up a NUL-terminated string at `offset` in the section at
    /// `strtab_index`.
    fn string_at(&self, strtab_index: usize, offset: u32) -> Result<&'a str, Error> {
        let table = self.section_bytes(strtab_index);
        let start = offset as usize;
        let rest = table.get(start..).ok_or(Error::Truncated)?;
        let end = rest.iter().position(|&b| b == 0).ok_or(Error::Truncated)?;
        std::str::from_utf8(&rest[..end]).map_err(|_| Error::Truncated)
    }

    /// The name of the section at `index`, read from the section-name
    /// string table (`e_shstrndx`).
    pub fn section_name(&self, index: usize) -> Result<&'a str, Error> {
        self.string_at(self.header.e_shstrndx as usize, self.shdrs[index].name)
    }

    /// Index of the section's linked string table, if this object has a
    /// symbol table.
    fn strtab_index(&self) -> Result<usize, Error> {
        let symtab = self.symtab_index.ok_or(Error::NoSymbolTable)?;
        Ok(self.shdrs[symtab].link as usize)
    }

    /// All symbol table entries, in table order. Fails with
    /// [`Error::NoSymbolTable`] if the object has no `SHT_SYMTAB` section.
    pub fn symbols(&self) -> Result<Vec<Sym>, Error> {
        let symtab = self.symtab_index.ok_or(Error::NoSymbolTable)?;
        let shdr = &self.shdrs[symtab];
        let count = shdr.size as usize / SYM_SIZE;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let base = shdr.offset as usize + i * SYM_SIZE;
            let mut cursor = Cursor::at(self.bytes, base);
            let name = cursor.read_u32()?;
            let info = cursor.read_u8()?;
            let _other = cursor.read_u8()?;
            let shndx = cursor.read_u16()?;
            let value = cursor.read_u64()?;
            let _size = cursor.read_u64()?;
            out.push(Sym {
                name,
                info,
                shndx,
                value,
            });
        }
        Ok(out)
    }

    /// Resolve a symbol's name through the linked string table.
    pub fn symbol_name(&self, sym: &Sym) -> Result<&'a str, Error> {
        self.string_at(self.strtab_index()?, sym.name)
    }

    /// All `(target_section_index, entries)` pairs for `SHT_RELA` sections
    /// whose target is an allocatable section. `SHT_RELA` sections whose
    /// target is not allocatable are skipped entirely, since nothing will
    /// ever load that section into memory to patch.
    pub fn relocation_sections(&self) -> Result<Vec<(usize, Vec<Rela>)>, Error> {
        let mut out = Vec::new();
        for shdr in &self.shdrs {
            if shdr.sh_type != sht::RELA {
                continue;
            }
            let target = shdr.info as usize;
            if !self.shdrs[target].is_alloc() {
                continue;
            }
            let count = shdr.size as usize / RELA_SIZE;
            let mut entries = Vec::with_capacity(count);
            for r in 0..count {
                let base = shdr.offset as usize + r * RELA_SIZE;
                let mut cursor = Cursor::at(self.bytes, base);
                let offset = cursor.read_u64()?;
                let r_info = cursor.read_u64()?;
                let addend = cursor.read_i64()?;
                entries.push(Rela {
                    offset,
                    sym: (r_info >> 32) as u32,
                    rel_type: (r_info & 0xffff_ffff) as u32,
                    addend,
                });
            }
            out.push((target, entries));
        }
        Ok(out)
    }
}
