//! Native status codes.
//!
//! Every native entry point reports a 32-bit status. Zero is the only
//! success value; everything else is a failure, including the positive
//! "success with information" codes COM sometimes returns.

use std::fmt;

/// A 32-bit native status code (an `HRESULT` on Windows).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

/// Result of a raw native call. The error side carries the failing status.
pub type NativeResult<T> = std::result::Result<T, Status>;

impl Status {
    pub const S_OK: Self = Self(0);
    pub const E_NOTIMPL: Self = Self(0x8000_4001_u32 as i32);
    pub const E_NOINTERFACE: Self = Self(0x8000_4002_u32 as i32);
    pub const E_POINTER: Self = Self(0x8000_4003_u32 as i32);
    pub const E_ABORT: Self = Self(0x8000_4004_u32 as i32);
    pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
    pub const E_UNEXPECTED: Self = Self(0x8000_FFFF_u32 as i32);
    pub const E_INVALIDARG: Self = Self(0x8007_0057_u32 as i32);
    /// `HRESULT_FROM_WIN32(ERROR_FILE_NOT_FOUND)`, reported when no runtime is installed.
    pub const E_FILE_NOT_FOUND: Self = Self(0x8007_0002_u32 as i32);
    /// `HRESULT_FROM_WIN32(ERROR_INVALID_STATE)`.
    pub const E_INVALID_STATE: Self = Self(0x8007_139F_u32 as i32);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Convert into a `NativeResult`, mapping success to `Ok(())`.
    pub fn ok(self) -> NativeResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// The status as an unsigned 32-bit value, the way native docs print it.
    pub fn code(self) -> u32 {
        self.0 as u32
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::S_OK
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.code())
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status(0x{:08x})", self.code())
    }
}

impl From<i32> for Status {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_zero_is_success() {
        assert!(Status::S_OK.is_success());
        assert!(!Status::E_FAIL.is_success());
        // S_FALSE is a "success" for COM's SUCCEEDED macro but not for the bridge.
        assert!(!Status(1).is_success());
    }

    #[test]
    fn ok_maps_to_result() {
        assert_eq!(Status::S_OK.ok(), Ok(()));
        assert_eq!(Status::E_POINTER.ok(), Err(Status::E_POINTER));
    }

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(Status::E_FAIL.to_string(), "0x80004005");
        assert_eq!(Status::S_OK.to_string(), "0x00000000");
        assert_eq!(Status(0x1f).to_string(), "0x0000001f");
        assert_eq!(format!("{:?}", Status::E_ABORT), "Status(0x80004004)");
    }

    #[test]
    fn code_is_unsigned_view() {
        assert_eq!(Status::E_FILE_NOT_FOUND.code(), 0x8007_0002);
        assert_eq!(Status::from(-2147467259).code(), 0x8000_4005);
    }
}
