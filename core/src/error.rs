//! # Kernel Errors
//!
//! Every failure in the execution-control core is a violated invariant. The
//! core reports it as a [`KernelError`] so the logic stays testable; the
//! kernel-facing entry points turn it into a halt through [`crate::fatal`].
//!
//! | Kind                   | Raised when                                         |
//! |------------------------|-----------------------------------------------------|
//! | `IllegalState`         | unbalanced interrupt nesting, early memory used      |
//! |                        | after boot, no usable memory, no reserved heap block |
//! | `InvalidArgument`      | duplicate service id, wrong service type             |
//! | `UnsupportedOperation` | a facility the platform does not provide             |

use alloc::string::String;
use core::fmt;

// =============================================================================
// ERROR KIND
// =============================================================================

/// Classification of kernel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorKind {
    /// The operation is not valid in the current state
    IllegalState         = 1,
    /// An argument violates the operation's contract
    InvalidArgument      = 2,
    /// The operation is not available on this platform
    UnsupportedOperation = 3,
}

impl ErrorKind {
    /// Short name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::IllegalState => "Illegal State",
            ErrorKind::InvalidArgument => "Invalid Argument",
            ErrorKind::UnsupportedOperation => "Unsupported Operation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// KERNEL ERROR
// =============================================================================

/// A kernel invariant violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelError {
    kind: ErrorKind,
    message: &'static str,
    details: Option<String>,
}

impl KernelError {
    /// Create an error with a static message
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            details: None,
        }
    }

    /// Attach formatted details
    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Static message
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Formatted details, if any
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

/// Result type for kernel core operations
pub type KernelResult<T> = Result<T, KernelError>;

// =============================================================================
// MACROS
// =============================================================================

/// Build a [`KernelError`]
#[macro_export]
macro_rules! kernel_error {
    ($kind:expr, $msg:literal) => {
        $crate::error::KernelError::new($kind, $msg)
    };
    ($kind:expr, $msg:literal, $($arg:tt)*) => {
        $crate::error::KernelError::new($kind, $msg)
            .with_details($crate::__format!($($arg)*))
    };
}

/// Return early with a [`KernelError`]
#[macro_export]
macro_rules! kernel_bail {
    ($kind:expr, $msg:literal) => {
        return Err($crate::kernel_error!($kind, $msg))
    };
    ($kind:expr, $msg:literal, $($arg:tt)*) => {
        return Err($crate::kernel_error!($kind, $msg, $($arg)*))
    };
}

/// Return early with a [`KernelError`] unless a condition holds
#[macro_export]
macro_rules! kernel_ensure {
    ($cond:expr, $kind:expr, $msg:literal) => {
        if !$cond {
            $crate::kernel_bail!($kind, $msg);
        }
    };
    ($cond:expr, $kind:expr, $msg:literal, $($arg:tt)*) => {
        if !$cond {
            $crate::kernel_bail!($kind, $msg, $($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(value: i32) -> KernelResult<i32> {
        kernel_ensure!(value >= 0, ErrorKind::InvalidArgument, "negative value", "got {}", value);
        Ok(value)
    }

    #[test]
    fn test_display() {
        let error = KernelError::new(ErrorKind::IllegalState, "no heap block");
        assert_eq!(alloc::format!("{}", error), "[Illegal State] no heap block");
    }

    #[test]
    fn test_ensure_with_details() {
        assert_eq!(checked(3), Ok(3));
        let error = checked(-2).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(error.details(), Some("got -2"));
        assert_eq!(alloc::format!("{}", error), "[Invalid Argument] negative value: got -2");
    }
}
