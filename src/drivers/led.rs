//! Single-colour status LED.
//!
//! The loop calls [`StatusLed::tick`] with the clock's current time and the
//! driver works out the level for the active pattern.
//!
//! | Pattern   | Output                                   |
//! |-----------|------------------------------------------|
//! | Off       | dark                                     |
//! | Solid     | lit                                      |
//! | FastBlink | toggles every [`FAST_BLINK_HALF_MS`]     |
//!
//! FastBlink is shown while the node waits in the setup portal.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::Clock;

pub const FAST_BLINK_HALF_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Off,
    Solid,
    FastBlink,
}

pub struct StatusLed<P: OutputPin> {
    pin: P,
    active_low: bool,
    pattern: LedPattern,
    started_ms: Option<u64>,
    lit: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take `pin` and switch the LED off.
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self {
            pin,
            active_low,
            pattern: LedPattern::Off,
            started_ms: None,
            lit: false,
        };
        led.drive(false);
        led
    }

    pub fn pattern(&self) -> LedPattern {
        self.pattern
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Off and Solid apply at once; a blink starts lit on the next tick.
    pub fn set_pattern(&mut self, pattern: LedPattern) {
        if pattern == self.pattern {
            return;
        }
        self.pattern = pattern;
        self.started_ms = None;
        match pattern {
            LedPattern::Off => self.drive(false),
            LedPattern::Solid => self.drive(true),
            LedPattern::FastBlink => {}
        }
    }

    /// Update the output for `now_ms`. Returns whether the LED is lit.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.pattern == LedPattern::FastBlink {
            let start = *self.started_ms.get_or_insert(now_ms);
            let half_periods = now_ms.saturating_sub(start) / FAST_BLINK_HALF_MS;
            self.drive(half_periods % 2 == 0);
        }
        self.lit
    }

    /// Drive the current pattern for `duration`, blocking on `clock`.
    pub fn run_for(&mut self, clock: &impl Clock, duration: Duration) {
        let start = clock.now_ms();
        let until = start.saturating_add(duration.as_millis() as u64);
        loop {
            let now = clock.now_ms();
            if now >= until {
                break;
            }
            self.tick(now);
            clock.sleep(Duration::from_millis(FAST_BLINK_HALF_MS.min(until - now)));
        }
    }

    fn drive(&mut self, lit: bool) {
        let high = lit != self.active_low;
        let written = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if written.is_err() {
            warn!("Led: pin write failed");
        }
        self.lit = lit;
    }
}
