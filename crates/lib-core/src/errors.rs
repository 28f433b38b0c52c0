use std::path::PathBuf;

use crate::value::TypeCode;

pub type Result<T> = std::result::Result<T, Error>;

/// Kernel error taxonomy.
///
/// Low-level I/O failures are wrapped in [`Error::Library`] with the OS error
/// number preserved; everything else is its own kind so callers can match on
/// what happened rather than parse messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authorization failed")]
    AuthorizationFailed,
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user name is required")]
    UserRequired,
    #[error("too long user name: {0}")]
    TooLongUserName(String),
    #[error("invalid character in user name: {0}")]
    InvalidUserName(String),
    #[error("bad password file")]
    BadPasswordFile,
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("incompatible value type: expected {expected:?}, found {found:?}")]
    NotCompatible {
        expected: TypeCode,
        found: TypeCode,
    },
    #[error("unexpected value type {found:?} for {context}")]
    UnexpectedType {
        context: &'static str,
        found: TypeCode,
    },
    #[error("feature is not supported: {0}")]
    NotSupported(&'static str),
    #[error("internal invariant broken: {0}")]
    Unexpected(String),
    #[error("statement canceled")]
    Canceled,
    #[error("memory exhausted")]
    MemoryExhaust,
    #[error("server is not available")]
    ServerNotAvailable,
    #[error("server is going to shut down")]
    GoingShutdown,
    #[error("no server connection is available")]
    ConnectionRanOut,
    #[error("bad argument: {0}")]
    BadArgument(String),
    #[error("duplicate user name: {0}")]
    DuplicateName(String),
    #[error("duplicate user id: {0}")]
    DuplicateId(i32),
    #[error("library error (os error {errno:?}): {source}")]
    Library {
        errno: Option<i32>,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an OS-level failure, keeping the raw error number.
    pub fn library(source: std::io::Error) -> Error {
        Error::Library {
            errno: source.raw_os_error(),
            source,
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Error {
        Error::Unexpected(message.into())
    }

    /// Authentication-class errors are the only ones the admission loop
    /// retries on.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Error::AuthorizationFailed | Error::UserNotFound(_) | Error::UserRequired
        )
    }

    /// Fatal errors poison process-wide availability.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MemoryExhaust | Error::Unexpected(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Error {
        Error::library(source)
    }
}
