//! In-process loader for ELF64/x86-64 relocatable objects, exposing each
//! object's global function symbols as callable entry points.
//!
//! See [`driver::run`] for the end-to-end load-relocate-invoke path, and
//! [`args::ArgBuffer`] for packing arguments into the wire format an
//! entry point expects.

pub mod abi;
pub mod args;
pub mod cursor;
pub mod driver;
pub mod elf;
pub mod error;
pub mod layout;
pub mod reloc;
pub mod resolve;

#[cfg(test)]
mod testutil;

pub use error::Error;
