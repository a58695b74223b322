//! Application core — node logic with no direct I/O.
//!
//! Config persistence, the broker session, topic dispatch, event hooks and
//! the button policy live here. All interaction with flash, network, clock
//! and restart goes through the **port traits** in [`ports`], so the whole
//! layer runs on the host against mocks.

pub mod connection;
pub mod hooks;
pub mod input;
pub mod node;
pub mod outbox;
pub mod ports;
pub mod router;
pub mod store;
