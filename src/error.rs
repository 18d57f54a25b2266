//! Crate-wide error taxonomy.
//!
//! A single enum covers every failure mode a load can produce, from header
//! validation through relocation and argument packing. Each variant carries
//! enough context (symbol name, relocation type, section index, ...) to
//! print one diagnostic line naming the offending entity.

use thiserror::Error;

/// Everything that can go wrong while packing arguments, parsing an object,
/// laying it out, resolving symbols, relocating, or invoking the entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input is not a little-endian ELF64 `ET_REL` object for `EM_X86_64`.
    #[error("input is not a supported x86-64 ELF64 relocatable object")]
    NotSupportedObject,

    /// No `SHF_ALLOC` section was found, so there is nothing to load.
    #[error("object has no allocatable sections to load")]
    NothingToLoad,

    /// The object has no `SHT_SYMTAB` section.
    #[error("object has no symbol table")]
    NoSymbolTable,

    /// No defined, allocatable-section symbol matched the requested entry name.
    #[error("entry point '{name}' not found in object file")]
    EntryNotFound {
        /// The requested entry point name.
        name: String,
    },

    /// A relocation entry used a type this loader does not implement.
    #[error("unsupported relocation type: {kind}")]
    UnsupportedRelocation {
        /// The raw `ELF64_R_TYPE` value.
        kind: u32,
    },

    /// A relocation's symbol resolved into a section that is not `SHF_ALLOC`.
    #[error("symbol at section index {index} is not in an allocatable section")]
    SymbolInNonAllocSection {
        /// The section index the symbol claims to live in.
        index: usize,
    },

    /// An undefined (external) symbol was not found by the host resolver.
    #[error("unresolved external symbol: {name}")]
    UnresolvedExternal {
        /// The external symbol's name.
        name: String,
    },

    /// A computed 32-bit relocation value did not fit in its target width.
    #[error("relocation {kind} value {value:#x} does not fit in 32 bits")]
    Overflow32 {
        /// Name of the relocation type that overflowed.
        kind: &'static str,
        /// The out-of-range computed value.
        value: i64,
    },

    /// A `kind:value` argument used an unrecognized kind tag.
    #[error("unknown argument kind: {text}")]
    UnknownKind {
        /// The offending kind tag.
        text: String,
    },

    /// A `bin:` argument's hex text had odd length or non-hex characters.
    #[error("malformed hex in binary argument")]
    MalformedHex,

    /// A CLI argument lacked the `kind:value` shape.
    #[error("argument '{text}' is missing a type prefix (e.g. int:10)")]
    MissingTypePrefix {
        /// The offending raw argument text.
        text: String,
    },

    /// The host failed to provide a writable, readable memory region.
    #[error("failed to allocate destination memory region")]
    AllocFailed,

    /// The host failed to transition the destination region to executable.
    #[error("failed to make destination region executable")]
    ProtectFailed,

    /// A read ran past the end of the available bytes.
    #[error("truncated data: not enough bytes remaining")]
    Truncated,
}
