//! COM apartment for the probe's thread.

use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use wv2_common::{BridgeError, Status};

/// Keeps COM initialized on the current thread until dropped.
pub struct ComApartment {
    _private: (),
}

impl ComApartment {
    pub fn enter() -> Result<Self, BridgeError> {
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
            .ok()
            .map_err(|e| BridgeError::native("CoInitializeEx", Status(e.code().0)))?;
        tracing::debug!("COM initialized (single-threaded apartment)");
        Ok(Self { _private: () })
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}
