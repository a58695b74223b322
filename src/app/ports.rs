//! Port traits — the hexagonal boundary between the node core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Node (core)
//! ```
//!
//! Adapters in [`crate::adapters`] implement these for ESP-IDF and for the
//! host simulation; integration tests plug in mocks.

use core::fmt;
use core::time::Duration;

// ───────────────────────────────────────────────────────────────
// Storage port (config record ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed persistent memory with EEPROM semantics.
///
/// A `write` must land as a whole: either every byte of `data` is persisted
/// or none is. Flash-backed implementations erase and rewrite the full
/// sector/blob to guarantee this.
pub trait StoragePort {
    /// Total addressable bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Persist `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Transport port (broker session)
// ───────────────────────────────────────────────────────────────

/// Last-will message registered with the broker at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Everything the transport needs to open a session.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    pub host: &'a str,
    pub port: u16,
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub will: Option<&'a Will>,
}

/// One message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// A single broker session, exclusively owned by the connection manager.
pub trait Transport {
    /// Open a session. Blocks at most for the transport's own connect timeout.
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), TransportError>;

    /// Liveness of the current session.
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Service the session (keep-alive, socket reads) and hand out the next
    /// inbound message, if any.
    fn poll(&mut self) -> Option<InboundMessage>;

    /// Close the session. Idempotent.
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and blocking delay. Injected so tests never really sleep.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the calling thread of control.
    fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// System port
// ───────────────────────────────────────────────────────────────

/// Whole-device actions. On hardware `restart` does not return.
pub trait SystemPort {
    /// Drop the Wi-Fi association (and forget it, so the portal runs next boot).
    fn disconnect_network(&mut self);

    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Button input port
// ───────────────────────────────────────────────────────────────

/// The input-polling collaborator. Debouncing happens behind this trait.
pub trait ButtonInput {
    /// Sample the input. Called once per loop iteration before the queries.
    fn read(&mut self);

    /// The button went from pressed to released since the previous `read`.
    fn was_released(&self) -> bool;

    /// The button is down and has been for at least `threshold`.
    fn pressed_for(&self, threshold: Duration) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// `offset + len` is beyond [`StoragePort::capacity`].
    OutOfRange,
    /// Generic I/O error from the storage backend.
    IoError,
    /// The record does not encode into its slot.
    Encode,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "access out of range"),
            Self::IoError => write!(f, "I/O error"),
            Self::Encode => write!(f, "record does not fit its slot"),
        }
    }
}

/// Errors from [`Transport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// TCP/TLS could not reach the broker.
    Unreachable,
    /// The broker answered CONNECT with a non-zero return code.
    Refused(i32),
    /// The connect did not complete within the transport timeout.
    Timeout,
    /// Operation requires a live session.
    NotConnected,
    /// The client library rejected the operation.
    Client(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "broker unreachable"),
            Self::Refused(rc) => write!(f, "connection refused, rc={rc}"),
            Self::Timeout => write!(f, "connect timed out"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Client(code) => write!(f, "client error {code}"),
        }
    }
}
