use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for Folio operations
///
/// Each kind names a category of failure so callers (for example a server
/// layer mapping errors to response statuses) can branch on it without
/// parsing messages.
///
/// # Examples
///
/// ```rust
/// use folio::errors::{ErrorKind, FolioError, FolioResult};
///
/// fn example() -> FolioResult<()> {
///     Err(FolioError::new("Document already exists", ErrorKind::AlreadyExists))
/// }
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::AlreadyExists);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Caller input errors, rejected before any mutation
    /// Bad caller input (non-object body, empty id, invalid collection name)
    ValidationError,
    /// A document with the same id already exists in the collection
    AlreadyExists,
    /// A lookup missed; document reads report this as `None` instead
    NotFound,
    /// Rejected pipeline or a configuration change after the store opened
    InvalidOperation,

    // IO and storage errors
    /// Reading, writing, renaming or deleting a store file failed
    IOError,
    /// A backup or store file does not exist
    FileNotFound,
    /// The storage folder or a file is not accessible
    PermissionDenied,
    /// A collection, manifest or backup file is not the expected JSON
    FileCorrupted,

    // Data encoding errors
    /// Error encoding or decoding JSON
    EncodingError,

    // Store lifecycle errors
    /// Store bootstrap has not completed
    StoreNotInitialized,
    /// The store was closed; every later call fails with this kind
    StoreAlreadyClosed,

    /// Subscribing, unsubscribing or delivering an event failed
    EventError,

    /// Anything else, raised from plain string messages
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::AlreadyExists => write!(f, "Already exists"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::FileCorrupted => write!(f, "File corrupted"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::StoreNotInitialized => write!(f, "Store not initialized"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom Folio error type.
///
/// `FolioError` carries a message, an [ErrorKind], an optional cause and the
/// backtrace captured at construction time.
///
/// # Examples
///
/// ```rust
/// use folio::errors::{ErrorKind, FolioError};
///
/// let cause = FolioError::new("disk unplugged", ErrorKind::IOError);
/// let err = FolioError::new_with_cause("Failed to persist collection", ErrorKind::IOError, cause);
/// assert!(err.cause().is_some());
/// ```
#[derive(Clone)]
pub struct FolioError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<FolioError>>,
    backtrace: Atomic<Backtrace>,
}

impl FolioError {
    /// Creates a new `FolioError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        FolioError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `FolioError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: FolioError) -> Self {
        FolioError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&FolioError> {
        self.cause.as_deref()
    }
}

impl Display for FolioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for FolioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for FolioError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Folio operations.
pub type FolioResult<T> = Result<T, FolioError>;

impl From<std::io::Error> for FolioError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        FolioError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<String> for FolioError {
    fn from(msg: String) -> Self {
        FolioError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for FolioError {
    fn from(msg: &str) -> Self {
        FolioError::new(msg, ErrorKind::InternalError)
    }
}
