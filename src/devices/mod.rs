//! Device variants built on the node core.
//!
//! Each variant only registers topics and hooks on a [`Node`](crate::app::node::Node)
//! and publishes by short name; none of them touches the transport.

pub mod relay;
pub mod sensor;
