//! Button policy: short press vs. factory-reset hold.
//!
//! | Gesture      | Condition                          | Result         |
//! |--------------|------------------------------------|----------------|
//! | Short press  | released before the hold threshold | `Press`        |
//! | Reset hold   | held continuously ≥ threshold      | `FactoryReset` |
//!
//! The hold check wins over the release check within one poll. Once a reset
//! has fired, the release that ends that hold is swallowed.

use core::time::Duration;

use super::ports::ButtonInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press,
    FactoryReset,
}

#[derive(Debug)]
pub struct InputPolicy {
    reset_hold: Duration,
    reset_fired: bool,
}

impl InputPolicy {
    pub fn new(reset_hold: Duration) -> Self {
        Self {
            reset_hold,
            reset_fired: false,
        }
    }

    pub fn reset_hold(&self) -> Duration {
        self.reset_hold
    }

    /// Sample `input` once and classify.
    pub fn poll(&mut self, input: &mut impl ButtonInput) -> Option<InputEvent> {
        input.read();

        if input.pressed_for(self.reset_hold) {
            if self.reset_fired {
                return None;
            }
            self.reset_fired = true;
            return Some(InputEvent::FactoryReset);
        }

        if input.was_released() {
            if self.reset_fired {
                self.reset_fired = false;
                return None;
            }
            return Some(InputEvent::Press);
        }

        None
    }
}
