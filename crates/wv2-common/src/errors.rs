use std::path::PathBuf;

use crate::status::{NativeResult, Status};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The native object was never constructed, or has been closed/released.
    #[error("{object} not created")]
    NotCreated { object: &'static str },

    #[error("{operation} failed: {status}")]
    NativeCallFailed {
        operation: &'static str,
        status: Status,
    },

    /// A completion was dropped without ever being invoked.
    #[error("completion abandoned before it was invoked")]
    Abandoned,

    #[error("not supported: {0}")]
    Unsupported(String),
}

impl BridgeError {
    pub fn not_created(object: &'static str) -> Self {
        Self::NotCreated { object }
    }

    pub fn native(operation: &'static str, status: Status) -> Self {
        Self::NativeCallFailed { operation, status }
    }

    /// The native status, when the failure came from the native layer.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::NativeCallFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_created(&self) -> bool {
        matches!(self, Self::NotCreated { .. })
    }
}

/// Attach the failing operation's name to a raw native result.
pub trait NativeResultExt<T> {
    fn for_operation(self, operation: &'static str) -> Result<T, BridgeError>;
}

impl<T> NativeResultExt<T> for NativeResult<T> {
    fn for_operation(self, operation: &'static str) -> Result<T, BridgeError> {
        self.map_err(|status| {
            tracing::warn!(operation, %status, "native call failed");
            BridgeError::native(operation, status)
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Wv2Error {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_error_display() {
        let err = BridgeError::not_created("ICoreWebView2Controller");
        assert_eq!(err.to_string(), "ICoreWebView2Controller not created");

        let err = BridgeError::native("ICoreWebView2::Navigate", Status::E_INVALIDARG);
        assert_eq!(
            err.to_string(),
            "ICoreWebView2::Navigate failed: 0x80070057"
        );

        let err = BridgeError::Abandoned;
        assert_eq!(err.to_string(), "completion abandoned before it was invoked");

        let err = BridgeError::Unsupported("webview2 backend on linux".into());
        assert_eq!(err.to_string(), "not supported: webview2 backend on linux");
    }

    #[test]
    fn bridge_error_status_accessor() {
        let err = BridgeError::native("ICoreWebView2::Reload", Status::E_FAIL);
        assert_eq!(err.status(), Some(Status::E_FAIL));
        assert!(!err.is_not_created());

        let err = BridgeError::not_created("ICoreWebView2");
        assert_eq!(err.status(), None);
        assert!(err.is_not_created());
    }

    #[test]
    fn for_operation_names_the_call() {
        let result: NativeResult<u32> = Err(Status::E_ABORT);
        let err = result.for_operation("ICoreWebView2::Stop").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::NativeCallFailed {
                operation: "ICoreWebView2::Stop",
                status: Status::E_ABORT,
            }
        ));

        let result: NativeResult<u32> = Ok(7);
        assert_eq!(result.for_operation("ICoreWebView2::Stop").unwrap(), 7);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("environment.language: bad tag".into());
        assert_eq!(
            err.to_string(),
            "config validation error: environment.language: bad tag"
        );
    }

    #[test]
    fn wv2_error_from_bridge() {
        let bridge_err = BridgeError::native("CompareBrowserVersions", Status::E_INVALIDARG);
        let err: Wv2Error = bridge_err.into();
        assert!(matches!(err, Wv2Error::Bridge(_)));
        assert!(err.to_string().contains("0x80070057"));
    }

    #[test]
    fn wv2_error_from_config_and_io() {
        let err: Wv2Error = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, Wv2Error::Config(_)));
        assert!(err.to_string().contains("bad toml"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: Wv2Error = io_err.into();
        assert!(matches!(err, Wv2Error::Io(_)));
        assert!(err.to_string().contains("file missing"));

        let err = Wv2Error::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
