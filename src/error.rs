//! Unified error types for the node core.
//!
//! Port-level errors ([`StorageError`], [`TransportError`]) are defined next
//! to their port traits; everything the node API can fail with funnels into
//! [`Error`] so setup code handles a single type. All variants are `Copy`.

use core::fmt;

use crate::app::ports::{StorageError, TransportError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persistent storage could not be read or written.
    Storage(StorageError),
    /// The broker session failed.
    Transport(TransportError),
    /// A topic or hook registration was refused.
    Registration(RegistrationError),
    /// A configuration value is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Registration(e) => write!(f, "registration: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        Self::Registration(e)
    }
}

// ---------------------------------------------------------------------------
// Registration errors
// ---------------------------------------------------------------------------

/// Setup-time failures. These are program-construction bugs, not runtime
/// faults: the integrator is expected to fix the registration code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    /// The short name is already registered.
    Duplicate,
    /// Registration attempted after the first connect attempt.
    Closed,
    /// Empty name, wildcard character, or leading/trailing separator.
    InvalidName,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => write!(f, "topic already registered"),
            Self::Closed => write!(f, "registration is closed once the node has started"),
            Self::InvalidName => write!(f, "invalid topic short name"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
