//! Error handling for gpbind

use std::os::raw::c_int;
use std::path::PathBuf;

use crate::sys;

/// Error types for gpbind operations
#[derive(thiserror::Error, Debug)]
pub enum GphotoError {
    /// A libgphoto2 call returned a negative status
    #[error("{message} ({code})")]
    Gphoto {
        /// Native status code
        code: c_int,
        /// Text from `gp_result_as_string`
        message: String,
    },

    /// The binding never mapped this operation
    #[error("{operation} is not implemented")]
    NotImplemented {
        /// Name of the unmapped operation
        operation: &'static str,
    },

    /// Native widget type integer outside the known tags
    #[error("unknown widget type {0}")]
    UnknownWidgetType(c_int),

    /// Value representation does not match the widget's type tag
    #[error("{widget_type} widget cannot take a {given} value")]
    ValueMismatch {
        /// Type tag of the widget
        widget_type: &'static str,
        /// Kind of value that was supplied
        given: &'static str,
    },

    /// Argument cannot be passed to C (interior NUL byte)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The shared library could not be opened
    #[error("loading libgphoto2 from {path}")]
    LibLoading {
        /// Path or soname that was tried last
        path: PathBuf,
        /// Loader error
        source: libloading::Error,
    },

    /// A required entry point is missing from the loaded library
    #[error("libgphoto2 is missing symbol {symbol}")]
    MissingSymbol {
        /// Symbol name
        symbol: &'static str,
        /// Loader error
        source: libloading::Error,
    },

    /// Reading or writing a local file failed
    #[error("file operation failed on {path}")]
    Io {
        /// Local path involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl GphotoError {
    /// Native status code, if this error came from libgphoto2.
    pub fn code(&self) -> Option<c_int> {
        match self {
            GphotoError::Gphoto { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for "could not lock the device", the status that triggers
    /// unmount-and-retry in [`Camera::init`](crate::Camera::init).
    pub fn is_lock_error(&self) -> bool {
        self.code() == Some(sys::GP_ERROR_IO_LOCK)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GphotoError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::ffi::NulError> for GphotoError {
    fn from(err: std::ffi::NulError) -> Self {
        GphotoError::InvalidArgument(format!(
            "string contains a NUL byte at position {}",
            err.nul_position()
        ))
    }
}

/// Result type for gpbind operations
pub type Result<T> = std::result::Result<T, GphotoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_error_display() {
        let error = GphotoError::Gphoto {
            code: -60,
            message: "Could not lock the device".to_string(),
        };
        assert_eq!(error.to_string(), "Could not lock the device (-60)");
        assert!(error.is_lock_error());
        assert_eq!(error.code(), Some(-60));
    }

    #[test]
    fn test_not_implemented_has_no_code() {
        let error = GphotoError::NotImplemented {
            operation: "wait_for_event",
        };
        assert_eq!(error.code(), None);
        assert!(!error.is_lock_error());
        assert!(error.to_string().contains("wait_for_event"));
    }

    #[test]
    fn test_nul_conversion() {
        let error: GphotoError = std::ffi::CString::new("a\0b").unwrap_err().into();
        match error {
            GphotoError::InvalidArgument(msg) => assert!(msg.contains('1')),
            _ => panic!("Unexpected error type"),
        }
    }
}
