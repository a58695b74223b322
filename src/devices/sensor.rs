//! Climate sensor node (Sonoff TH10 with an AM2301 probe).
//!
//! Samples humidity and temperature at a fixed interval and publishes
//! `humidity`, `temperature` and `heatindex` (°C), one decimal each.
//! A reading with a NaN field is logged and dropped. `republish` re-sends
//! the last good reading.

use core::time::Duration;
use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};

use crate::app::node::Node;
use crate::app::outbox::Outbox;
use crate::app::ports::{Clock, StoragePort, SystemPort, Transport};
use crate::error::Result;

pub const TOPIC_HUMIDITY: &str = "humidity";
pub const TOPIC_TEMPERATURE: &str = "temperature";
pub const TOPIC_HEAT_INDEX: &str = "heatindex";

/// The probe needs about two seconds between conversions.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

/// One raw sample. Either field may be NaN when the probe misread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub humidity: f32,
    pub temperature_c: f32,
}

impl Reading {
    pub fn is_valid(&self) -> bool {
        !self.humidity.is_nan() && !self.temperature_c.is_nan()
    }

    pub fn heat_index_c(&self) -> f32 {
        heat_index_c(self.temperature_c, self.humidity)
    }

    fn publish_to(&self, out: &mut Outbox) {
        for (topic, value) in self.fields() {
            out.publish(topic, format!("{value:.1}"));
        }
    }

    fn fields(&self) -> [(&'static str, f32); 3] {
        [
            (TOPIC_HUMIDITY, self.humidity),
            (TOPIC_TEMPERATURE, self.temperature_c),
            (TOPIC_HEAT_INDEX, self.heat_index_c()),
        ]
    }
}

pub trait ClimateSensor {
    fn read(&mut self) -> Reading;
}

/// Apparent temperature in °C (NWS Rothfusz regression).
pub fn heat_index_c(temperature_c: f32, humidity: f32) -> f32 {
    let t = temperature_c * 1.8 + 32.0;
    let rh = humidity;

    let mut hi = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);
    if hi > 79.0 {
        hi = -42.379 + 2.049_015_2 * t + 10.143_331 * rh
            - 0.224_755_4 * t * rh
            - 0.006_837_83 * t * t
            - 0.054_817_17 * rh * rh
            + 0.001_228_74 * t * t * rh
            + 0.000_852_82 * t * rh * rh
            - 0.000_001_99 * t * t * rh * rh;

        if rh < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= (13.0 - rh) * 0.25 * ((17.0 - (t - 95.0).abs()) * 0.058_82).sqrt();
        } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
            hi += (rh - 85.0) * 0.1 * ((87.0 - t) * 0.2);
        }
    }

    (hi - 32.0) / 1.8
}

struct Climate<P: ClimateSensor> {
    probe: P,
    last: Option<Reading>,
    last_sample_ms: Option<u64>,
}

pub struct SensorDevice<P: ClimateSensor> {
    climate: Rc<RefCell<Climate<P>>>,
    interval: Duration,
}

impl<P: ClimateSensor + 'static> SensorDevice<P> {
    pub fn new(probe: P) -> Self {
        Self::with_interval(probe, SAMPLE_INTERVAL)
    }

    pub fn with_interval(probe: P, interval: Duration) -> Self {
        Self {
            climate: Rc::new(RefCell::new(Climate {
                probe,
                last: None,
                last_sample_ms: None,
            })),
            interval,
        }
    }

    pub fn last_reading(&self) -> Option<Reading> {
        self.climate.borrow().last
    }

    pub fn install<S, T, C, Y>(&self, node: &mut Node<S, T, C, Y>) -> Result<()>
    where
        S: StoragePort,
        T: Transport,
        C: Clock,
        Y: SystemPort,
    {
        let climate = Rc::clone(&self.climate);
        node.on_republish(move |out| match climate.borrow().last {
            Some(reading) => reading.publish_to(out),
            None => info!("Sensor: nothing to republish yet"),
        })
    }

    /// Sample if the interval has elapsed at `now_ms`, publishing a good
    /// reading. Returns the reading that was published.
    pub fn poll<S, T, C, Y>(&self, node: &mut Node<S, T, C, Y>, now_ms: u64) -> Option<Reading>
    where
        S: StoragePort,
        T: Transport,
        C: Clock,
        Y: SystemPort,
    {
        let reading = {
            let mut climate = self.climate.borrow_mut();
            if climate
                .last_sample_ms
                .is_some_and(|at| now_ms.saturating_sub(at) < self.interval.as_millis() as u64)
            {
                return None;
            }
            climate.last_sample_ms = Some(now_ms);

            let reading = climate.probe.read();
            if !reading.is_valid() {
                warn!("Sensor: failed to read from probe");
                return None;
            }
            climate.last = Some(reading);
            reading
        };

        info!(
            "Sensor: humidity {:.1} %, temperature {:.1} °C, heat index {:.1} °C",
            reading.humidity,
            reading.temperature_c,
            reading.heat_index_c()
        );
        for (topic, value) in reading.fields() {
            node.publish(topic, format!("{value:.1}"));
        }
        Some(reading)
    }
}
