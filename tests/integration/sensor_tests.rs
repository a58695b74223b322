//! Climate sensor variant on a mocked node.

use std::collections::VecDeque;
use std::time::Duration;

use homenode::devices::sensor::{ClimateSensor, Reading, SensorDevice};

use crate::mock_hw::{Rig, ScriptedButton, rig, topic};

struct Probe(VecDeque<Reading>);

impl ClimateSensor for Probe {
    fn read(&mut self) -> Reading {
        self.0.pop_front().unwrap_or(Reading {
            humidity: f32::NAN,
            temperature_c: f32::NAN,
        })
    }
}

fn reading(humidity: f32, temperature_c: f32) -> Reading {
    Reading {
        humidity,
        temperature_c,
    }
}

fn climate_rig(samples: &[Reading]) -> (Rig, SensorDevice<Probe>) {
    let mut r = rig();
    let sensor = SensorDevice::with_interval(
        Probe(samples.iter().copied().collect()),
        Duration::from_secs(2),
    );
    sensor.install(&mut r.node).unwrap();
    r.node.tick(&mut ScriptedButton::idle());
    (r, sensor)
}

fn payload_on(r: &Rig, short: &str) -> Vec<Vec<u8>> {
    r.transport
        .published()
        .into_iter()
        .filter(|(t, _)| *t == topic(short))
        .map(|(_, p)| p)
        .collect()
}

#[test]
fn good_reading_publishes_three_values() {
    let (mut r, sensor) = climate_rig(&[reading(45.0, 21.5)]);

    assert!(sensor.poll(&mut r.node, 0).is_some());

    assert_eq!(payload_on(&r, "humidity"), vec![b"45.0".to_vec()]);
    assert_eq!(payload_on(&r, "temperature"), vec![b"21.5".to_vec()]);
    assert_eq!(payload_on(&r, "heatindex").len(), 1);
}

#[test]
fn nan_reading_is_skipped() {
    let (mut r, sensor) = climate_rig(&[reading(f32::NAN, 21.5)]);

    assert!(sensor.poll(&mut r.node, 0).is_none());

    assert!(payload_on(&r, "temperature").is_empty());
    assert_eq!(sensor.last_reading(), None);
}

#[test]
fn samples_are_paced_by_interval() {
    let (mut r, sensor) = climate_rig(&[reading(40.0, 20.0), reading(41.0, 20.0)]);

    assert!(sensor.poll(&mut r.node, 1_000).is_some());
    assert!(sensor.poll(&mut r.node, 2_500).is_none());
    assert!(sensor.poll(&mut r.node, 3_000).is_some());

    assert_eq!(
        payload_on(&r, "humidity"),
        vec![b"40.0".to_vec(), b"41.0".to_vec()]
    );
}

#[test]
fn republish_resends_last_good_reading() {
    let (mut r, sensor) = climate_rig(&[reading(50.0, 22.0), reading(f32::NAN, f32::NAN)]);
    sensor.poll(&mut r.node, 0);
    sensor.poll(&mut r.node, 2_000);

    r.transport.inject(&topic("republish"), b"1");
    r.node.tick(&mut ScriptedButton::idle());

    assert_eq!(
        payload_on(&r, "temperature"),
        vec![b"22.0".to_vec(), b"22.0".to_vec()]
    );
}

#[test]
fn republish_before_any_reading_publishes_nothing() {
    let (mut r, _sensor) = climate_rig(&[]);
    r.transport.inject(&topic("republish"), b"1");
    r.node.tick(&mut ScriptedButton::idle());
    assert!(payload_on(&r, "humidity").is_empty());
}
