//! Relay and climate sensor installed side by side on one node.

use std::time::Duration;

use homenode::devices::relay::{RelayDevice, RelayOutput};
use homenode::devices::sensor::{ClimateSensor, Reading, SensorDevice};

use crate::mock_hw::{Op, Rig, ScriptedButton, rig, topic};

struct Coil;

impl RelayOutput for Coil {
    fn set(&mut self, _on: bool) {}
}

struct Steady(Reading);

impl ClimateSensor for Steady {
    fn read(&mut self) -> Reading {
        self.0
    }
}

fn combined_rig() -> (Rig, RelayDevice<Coil>, SensorDevice<Steady>) {
    let mut r = rig();
    let relay = RelayDevice::new(Coil);
    let sensor = SensorDevice::with_interval(
        Steady(Reading {
            humidity: 55.0,
            temperature_c: 23.0,
        }),
        Duration::from_secs(2),
    );
    relay.install(&mut r.node).unwrap();
    sensor.install(&mut r.node).unwrap();
    r.node.tick(&mut ScriptedButton::idle());
    (r, relay, sensor)
}

fn published_on(r: &Rig, short: &str) -> usize {
    r.transport
        .published()
        .into_iter()
        .filter(|(t, _)| *t == topic(short))
        .count()
}

#[test]
fn republish_is_subscribed_once() {
    let (r, _relay, _sensor) = combined_rig();
    let subscribes = r
        .transport
        .ops()
        .into_iter()
        .filter(|op| *op == Op::Subscribe(topic("republish")))
        .count();
    assert_eq!(subscribes, 1);
}

#[test]
fn republish_fans_out_to_every_device() {
    let (mut r, _relay, sensor) = combined_rig();
    sensor.poll(&mut r.node, 0);
    r.transport.clear_ops();

    r.transport.inject(&topic("republish"), b"1");
    r.node.tick(&mut ScriptedButton::idle());

    let sent: Vec<String> = r
        .transport
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            Op::Publish(t, _) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(
        sent,
        vec![
            topic("relay"),
            topic("humidity"),
            topic("temperature"),
            topic("heatindex"),
        ]
    );
}

#[test]
fn each_device_keeps_its_own_behavior() {
    let (mut r, relay, sensor) = combined_rig();
    sensor.poll(&mut r.node, 0);

    r.transport.inject(&topic("relay/set"), b"0");
    r.node.tick(&mut ScriptedButton::idle());

    assert!(!relay.is_on());
    assert_eq!(published_on(&r, "relay"), 2);
    assert_eq!(published_on(&r, "humidity"), 1);
    assert!(r.system.calls().is_empty());
}
