//! Polled, debounced push button.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up (GPIO0 on the Sonoff boards).
//! The pin is sampled once per loop iteration through
//! [`ButtonInput::read`]; a level must hold for [`DEBOUNCE_MS`] before it
//! counts as a press.
//!
//! ## States
//!
//! | State        | Leaves when                         | Next          |
//! |--------------|-------------------------------------|---------------|
//! | Idle         | pin goes low                        | DebounceWait  |
//! | DebounceWait | low for ≥ 20 ms / high again        | Pressed / Idle|
//! | Pressed      | pin goes high (reports release)     | Idle          |

use core::time::Duration;

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::{ButtonInput, Clock};

pub const DEBOUNCE_MS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Idle,
    DebounceWait { since_ms: u64 },
    Pressed { since_ms: u64 },
}

pub struct PinButton<P: InputPin, C: Clock> {
    pin: P,
    clock: C,
    state: PressState,
    now_ms: u64,
    released: bool,
}

impl<P: InputPin, C: Clock> PinButton<P, C> {
    pub fn new(pin: P, clock: C) -> Self {
        Self {
            pin,
            clock,
            state: PressState::Idle,
            now_ms: 0,
            released: false,
        }
    }

    /// Debounced level as of the last `read`.
    pub fn is_pressed(&self) -> bool {
        matches!(self.state, PressState::Pressed { .. })
    }

    fn raw_pressed(&mut self) -> bool {
        match self.pin.is_low() {
            Ok(low) => low,
            Err(_) => {
                warn!("Button: pin read failed");
                false
            }
        }
    }
}

impl<P: InputPin, C: Clock> ButtonInput for PinButton<P, C> {
    fn read(&mut self) {
        self.now_ms = self.clock.now_ms();
        self.released = false;
        let down = self.raw_pressed();

        self.state = match self.state {
            PressState::Idle if down => PressState::DebounceWait {
                since_ms: self.now_ms,
            },
            PressState::Idle => PressState::Idle,
            PressState::DebounceWait { .. } if !down => PressState::Idle,
            PressState::DebounceWait { since_ms } => {
                if self.now_ms.saturating_sub(since_ms) >= DEBOUNCE_MS {
                    PressState::Pressed { since_ms }
                } else {
                    PressState::DebounceWait { since_ms }
                }
            }
            PressState::Pressed { .. } if !down => {
                self.released = true;
                PressState::Idle
            }
            pressed @ PressState::Pressed { .. } => pressed,
        };
    }

    fn was_released(&self) -> bool {
        self.released
    }

    fn pressed_for(&self, threshold: Duration) -> bool {
        match self.state {
            PressState::Pressed { since_ms } => {
                self.now_ms.saturating_sub(since_ms) >= threshold.as_millis() as u64
            }
            _ => false,
        }
    }
}
