//! homenode library.
//!
//! Connectivity core for small single-purpose ESP32 nodes on MQTT: a
//! persisted broker config, a device-scoped topic namespace, a
//! self-healing broker session, event hooks and a button reset policy.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; on the host the adapters fall back to simulations.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod provisioning;

pub use app::hooks::HookKind;
pub use app::node::Node;
pub use app::outbox::Outbox;
pub use error::{Error, Result};
