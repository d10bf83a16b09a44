//! UTF-16 string marshaling between the host and the native layer.
//!
//! Text crosses the boundary as raw UTF-16 code units. Nothing here
//! re-encodes, normalizes, or truncates: unpaired surrogates and embedded
//! NULs survive a trip through every type in this module.
//!
//! - [`WideString`] is the host-side owned representation.
//! - [`WideCString`] is the NUL-terminated buffer handed to native calls.
//! - [`NativeWideString`] owns a string the native layer allocated and
//!   releases it through the matching native deallocator exactly once.

use std::fmt;
use std::ptr::NonNull;

use crate::status::{NativeResult, Status};

/// Releases a native-allocated buffer of `len` code units.
///
/// The length excludes any terminator. Allocators that do not need it
/// (such as `CoTaskMemFree`) ignore it.
pub type ReleaseFn = unsafe fn(NonNull<u16>, usize);

// =============================================================================
// HOST STRING
// =============================================================================

/// An owned sequence of UTF-16 code units.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WideString(Vec<u16>);

impl WideString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Wrap raw code units verbatim.
    pub fn from_units(units: impl Into<Vec<u16>>) -> Self {
        Self(units.into())
    }

    pub fn as_units(&self) -> &[u16] {
        &self.0
    }

    pub fn into_units(self) -> Vec<u16> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode as UTF-8, replacing unpaired surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Build the NUL-terminated buffer for a native call.
    pub fn to_native(&self) -> WideCString {
        to_native(&self.0)
    }
}

impl From<&str> for WideString {
    fn from(value: &str) -> Self {
        Self(value.encode_utf16().collect())
    }
}

impl From<String> for WideString {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for WideString {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&WideString> for WideString {
    fn from(value: &WideString) -> Self {
        value.clone()
    }
}

impl From<Vec<u16>> for WideString {
    fn from(units: Vec<u16>) -> Self {
        Self(units)
    }
}

impl From<&[u16]> for WideString {
    fn from(units: &[u16]) -> Self {
        Self(units.to_vec())
    }
}

impl PartialEq<str> for WideString {
    fn eq(&self, other: &str) -> bool {
        self.0.iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for WideString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

// =============================================================================
// NATIVE INPUT
// =============================================================================

/// A NUL-terminated copy of a code-unit sequence, ready for a native call.
///
/// The explicit length is kept alongside the terminator, so a sequence with
/// embedded NULs is still fully represented on the host side.
#[derive(Clone, PartialEq, Eq)]
pub struct WideCString {
    units: Vec<u16>,
}

impl WideCString {
    /// Pointer to the first unit. The buffer is always NUL-terminated.
    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }

    /// The code units, without the terminator.
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.units.len() - 1]
    }

    pub fn as_units_with_nul(&self) -> &[u16] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a terminator-scanning reader would stop before the end.
    pub fn has_interior_nul(&self) -> bool {
        self.as_units().contains(&0)
    }

    /// `self`, or `E_INVALIDARG` when a terminator-scanning reader would cut
    /// the text short.
    pub fn checked(self) -> NativeResult<Self> {
        if self.has_interior_nul() {
            Err(Status::E_INVALIDARG)
        } else {
            Ok(self)
        }
    }

    pub fn to_wide(&self) -> WideString {
        WideString::from(self.as_units())
    }
}

impl fmt::Debug for WideCString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf16_lossy(self.as_units()), f)
    }
}

/// Copy `units` into a NUL-terminated native buffer.
pub fn to_native(units: &[u16]) -> WideCString {
    let mut buffer = Vec::with_capacity(units.len() + 1);
    buffer.extend_from_slice(units);
    buffer.push(0);
    WideCString { units: buffer }
}

// =============================================================================
// NATIVE OUTPUT
// =============================================================================

/// A string allocated by the native layer.
///
/// Ownership transfers the moment a native call hands back a non-null
/// pointer; dropping the value releases it through the native allocator.
pub struct NativeWideString {
    ptr: NonNull<u16>,
    len: usize,
    release: ReleaseFn,
}

impl NativeWideString {
    /// Take ownership of `len` units at `ptr`.
    ///
    /// Returns `None` for a null pointer, in which case nothing is released.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` initialized units owned by the allocator
    /// that `release` frees, and nothing else may release it.
    pub unsafe fn from_raw_parts(ptr: *mut u16, len: usize, release: ReleaseFn) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len, release })
    }

    /// Take ownership of a NUL-terminated native string.
    ///
    /// # Safety
    ///
    /// Same as [`from_raw_parts`](Self::from_raw_parts), and the buffer must
    /// be NUL-terminated.
    pub unsafe fn from_raw_terminated(ptr: *mut u16, release: ReleaseFn) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        Self::from_raw_parts(ptr, len, release)
    }

    pub fn as_units(&self) -> &[u16] {
        // SAFETY: `from_raw_parts` guarantees `len` initialized units that
        // stay alive until `drop`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy into a host string, leaving the native buffer alive.
    pub fn to_wide(&self) -> WideString {
        WideString::from(self.as_units())
    }
}

impl Drop for NativeWideString {
    fn drop(&mut self) {
        // SAFETY: the pointer came from the allocator paired with `release`
        // and this is the only place it is released.
        unsafe { (self.release)(self.ptr, self.len) }
    }
}

impl fmt::Debug for NativeWideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeWideString")
            .field("text", &String::from_utf16_lossy(self.as_units()))
            .field("len", &self.len)
            .finish()
    }
}

/// Copy a native string into host memory and release the native buffer.
pub fn from_native(native: NativeWideString) -> WideString {
    native.to_wide()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static RELEASED: Cell<usize> = const { Cell::new(0) };
    }

    unsafe fn release_boxed(ptr: NonNull<u16>, len: usize) {
        RELEASED.with(|count| count.set(count.get() + 1));
        drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
            ptr.as_ptr(),
            len + 1,
        )));
    }

    fn allocate(units: &[u16]) -> NativeWideString {
        let mut buffer = units.to_vec();
        buffer.push(0);
        let raw = Box::into_raw(buffer.into_boxed_slice()) as *mut u16;
        unsafe { NativeWideString::from_raw_parts(raw, units.len(), release_boxed) }.unwrap()
    }

    // -- WideString --

    #[test]
    fn unpaired_surrogates_survive() {
        let units = vec![0x0041, 0xD800, 0x0042, 0xDC00];
        let wide = WideString::from_units(units.clone());
        assert_eq!(wide.as_units(), &units[..]);
        assert_eq!(wide.to_string_lossy(), "A\u{FFFD}B\u{FFFD}");
    }

    #[test]
    fn from_str_encodes_utf16() {
        let wide = WideString::from("héllo 😀");
        assert_eq!(wide.len(), 8);
        assert_eq!(wide.to_string_lossy(), "héllo 😀");
        assert_eq!(wide, "héllo 😀");
    }

    #[test]
    fn empty_string() {
        let wide = WideString::new();
        assert!(wide.is_empty());
        assert_eq!(wide, "");
        assert!(wide.to_native().is_empty());
    }

    // -- WideCString --

    #[test]
    fn to_native_appends_terminator() {
        let native = to_native(&[0x61, 0x62]);
        assert_eq!(native.as_units(), &[0x61, 0x62]);
        assert_eq!(native.as_units_with_nul(), &[0x61, 0x62, 0]);
        assert_eq!(native.len(), 2);
    }

    #[test]
    fn to_native_keeps_embedded_nul() {
        let native = WideString::from("a\0b").to_native();
        assert_eq!(native.len(), 3);
        assert!(native.has_interior_nul());
        assert_eq!(native.to_wide(), "a\0b");
    }

    #[test]
    fn checked_rejects_embedded_nul() {
        let native = WideString::from("a\0b").to_native();
        assert_eq!(native.checked().unwrap_err(), Status::E_INVALIDARG);

        let native = WideString::from("ab").to_native();
        assert_eq!(native.checked().unwrap().as_units(), &[0x61, 0x62]);
    }

    // -- NativeWideString --

    #[test]
    fn null_pointer_is_not_owned() {
        let native = unsafe { NativeWideString::from_raw_terminated(std::ptr::null_mut(), release_boxed) };
        assert!(native.is_none());
    }

    #[test]
    fn from_native_releases_exactly_once() {
        RELEASED.with(|count| count.set(0));
        let native = allocate(&[0x68, 0x69]);
        let host = from_native(native);
        assert_eq!(host, "hi");
        assert_eq!(RELEASED.with(Cell::get), 1);
    }

    #[test]
    fn explicit_length_keeps_embedded_nul() {
        let units = [0x61, 0x00, 0x62];
        let native = allocate(&units);
        assert_eq!(native.as_units(), &units);
        assert_eq!(from_native(native).as_units(), &units);
    }

    #[test]
    fn terminated_scan_stops_at_first_nul() {
        RELEASED.with(|count| count.set(0));
        let mut buffer = vec![0x61_u16, 0x62, 0, 0x63, 0];
        let raw = buffer.as_mut_ptr();
        let len = buffer.len();
        std::mem::forget(buffer);

        unsafe fn release_vec(ptr: NonNull<u16>, _len: usize) {
            RELEASED.with(|count| count.set(count.get() + 1));
            drop(Vec::from_raw_parts(ptr.as_ptr(), 5, 5));
        }

        assert_eq!(len, 5);
        let native = unsafe { NativeWideString::from_raw_terminated(raw, release_vec) }.unwrap();
        assert_eq!(native.len(), 2);
        drop(native);
        assert_eq!(RELEASED.with(Cell::get), 1);
    }
}
