pub mod errors;
pub mod status;
pub mod types;
pub mod wide;

pub use errors::{BridgeError, ConfigError, NativeResultExt, Wv2Error};
pub use status::{NativeResult, Status};
pub use types::{Bounds, EnvironmentOptions, ParentWindow, Settings};
pub use wide::{from_native, to_native, NativeWideString, WideCString, WideString};

pub type Result<T> = std::result::Result<T, Wv2Error>;
