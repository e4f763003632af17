//! A dedicated error type for everything that can go wrong building, encoding,
//! decoding or serving mDNS/DNS-SD traffic.
use std::fmt;
use std::io;
use std::str;

#[derive(Debug)]
pub enum DnsSdError {
    /// Underlying socket or I/O failure.
    Io(io::Error),
    FromUtf8(std::string::FromUtf8Error),
    Utf8(str::Utf8Error),
    LoggerError(log::SetLoggerError),
    /// A name failed construction: empty label, over-long label, or
    /// over-long total name.
    InvalidName(String),
    /// A message or record could not be decoded from wire bytes.
    InvalidMessage(String),
    /// A question or record carried a type code this library does not
    /// recognize where recognition was required.
    UnsupportedRecordType(u16),
    /// `update`/`unregister` referenced a service that was never registered.
    ServiceNotFound(String),
    /// Any other internal invariant violation, kept as a free-form string the
    /// way the rest of this taxonomy does.
    Internal(String),
}

impl fmt::Display for DnsSdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsSdError::Io(e) => write!(f, "I/O error: {}", e),
            DnsSdError::FromUtf8(e) => write!(f, "invalid UTF-8: {}", e),
            DnsSdError::Utf8(e) => write!(f, "invalid UTF-8: {}", e),
            DnsSdError::LoggerError(e) => write!(f, "logger error: {}", e),
            DnsSdError::InvalidName(s) => write!(f, "invalid DNS name: {}", s),
            DnsSdError::InvalidMessage(s) => write!(f, "invalid DNS message: {}", s),
            DnsSdError::UnsupportedRecordType(t) => write!(f, "unsupported record type: {}", t),
            DnsSdError::ServiceNotFound(s) => write!(f, "service not found: {}", s),
            DnsSdError::Internal(s) => write!(f, "internal error: {}", s),
        }
    }
}

impl std::error::Error for DnsSdError {}

impl DnsSdError {
    /// Helper to build an `InvalidMessage` variant from a formatted string.
    pub fn invalid_message(s: impl Into<String>) -> Self {
        DnsSdError::InvalidMessage(s.into())
    }

    pub fn invalid_name(s: impl Into<String>) -> Self {
        DnsSdError::InvalidName(s.into())
    }
}

/// The `Result` alias used by every fallible function in this crate.
pub type DnsSdResult<T> = Result<T, DnsSdError>;

impl From<io::Error> for DnsSdError {
    fn from(err: io::Error) -> Self {
        DnsSdError::Io(err)
    }
}

impl From<String> for DnsSdError {
    fn from(err: String) -> Self {
        DnsSdError::Internal(err)
    }
}

impl From<std::string::FromUtf8Error> for DnsSdError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DnsSdError::FromUtf8(err)
    }
}

impl From<str::Utf8Error> for DnsSdError {
    fn from(err: str::Utf8Error) -> Self {
        DnsSdError::Utf8(err)
    }
}

impl From<log::SetLoggerError> for DnsSdError {
    fn from(err: log::SetLoggerError) -> Self {
        DnsSdError::LoggerError(err)
    }
}
