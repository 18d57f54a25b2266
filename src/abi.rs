//! Entry point ABI.
//!
//! A loaded object's entry function has the C signature
//! `char *entry(uint8_t *args, int args_len)`, where `args` points at a
//! [`crate::args::ArgBuffer`] (including its 4-byte length header) and
//! `args_len` is that buffer's total length. The callee owns the returned
//! string and is expected to have allocated it with `malloc`; this loader
//! frees it with `libc::free` after copying its contents out, mirroring
//! the reference loader's `printf("Result: %s\n", result)` followed by
//! process exit (which implicitly reclaims the allocation).

use std::ffi::CStr;
use std::os::raw::c_char;

use libc::c_void;

/// The raw calling convention a loaded object's entry point implements.
pub type EntryFn = unsafe extern "C" fn(*const u8, i32) -> *mut c_char;

/// Invoke `entry` with `args`, returning the callee's NUL-terminated string
/// result as an owned `String` and freeing the callee's allocation.
///
/// # Safety
///
/// `entry` must be a valid function pointer into a region currently mapped
/// `PROT_READ | PROT_EXEC`, implementing the calling convention described
/// on [`EntryFn`]. The caller is responsible for the region outliving this
/// call.
pub unsafe fn invoke(entry: EntryFn, args: &[u8]) -> String {
    let len = args.len() as i32;
    let result = entry(args.as_ptr(), len);

    if result.is_null() {
        return String::new();
    }

    let owned = CStr::from_ptr(result).to_string_lossy().into_owned();
    libc::free(result as *mut c_void);
    owned
}
