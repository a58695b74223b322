//! Peripheral drivers.

pub mod button;
pub mod led;
