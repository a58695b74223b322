//! Restart and factory reset: control topics and the button hold.

use std::cell::RefCell;
use std::rc::Rc;

use homenode::app::input::InputEvent;
use homenode::app::store::ConfigStore;
use homenode::config::{DeviceConfig, StoreLayout};

use crate::mock_hw::{MockStorage, ScriptedButton, SysCall, provisioned, rig, topic};

fn reload(storage: &MockStorage) -> DeviceConfig {
    ConfigStore::open(storage.clone(), StoreLayout::default())
        .unwrap()
        .snapshot()
        .clone()
}

#[test]
fn reboot_one_restarts_without_touching_config() {
    let mut r = rig();
    r.node.tick(&mut ScriptedButton::idle());

    r.transport.inject(&topic("reboot"), b"1");
    r.node.tick(&mut ScriptedButton::idle());

    assert_eq!(r.system.calls(), vec![SysCall::Restart]);
    assert_eq!(reload(&r.storage), provisioned());
}

#[test]
fn reset_one_restores_defaults_then_disconnects_then_restarts() {
    let mut r = rig();
    r.node.tick(&mut ScriptedButton::idle());

    r.transport.inject(&topic("reset"), b"1");
    r.node.tick(&mut ScriptedButton::idle());

    assert_eq!(
        r.system.calls(),
        vec![SysCall::DisconnectNetwork, SysCall::Restart]
    );
    assert_eq!(reload(&r.storage), DeviceConfig::default());
    assert_eq!(*r.node.config(), DeviceConfig::default());
}

#[test]
fn zero_and_garbage_payloads_do_nothing() {
    let mut r = rig();
    r.node.tick(&mut ScriptedButton::idle());

    for payload in [&b"0"[..], b"", b"yes", b"10", b"1 "] {
        r.transport.inject(&topic("reboot"), payload);
        r.transport.inject(&topic("reset"), payload);
    }
    r.node.tick(&mut ScriptedButton::idle());
    r.node.tick(&mut ScriptedButton::idle());

    assert!(r.system.calls().is_empty());
    assert_eq!(reload(&r.storage), provisioned());
}

#[test]
fn dispatch_stops_once_a_restart_is_requested() {
    let mut r = rig();
    let hits = Rc::new(RefCell::new(0));
    let h = hits.clone();
    r.node.subscribe("relay/set", move |_, _| *h.borrow_mut() += 1).unwrap();
    r.node.tick(&mut ScriptedButton::idle());

    r.transport.inject(&topic("reboot"), b"1");
    r.transport.inject(&topic("relay/set"), b"1");
    assert_eq!(r.node.pump(), 1);

    assert_eq!(r.system.restarts(), 1);
    assert_eq!(*hits.borrow(), 0);
}

#[test]
fn holding_the_button_ten_seconds_factory_resets() {
    let mut r = rig();
    let mut button = ScriptedButton::idle();
    button
        .push(Some(0), false)
        .push(Some(9_999), false)
        .push(Some(10_000), false)
        .push(Some(11_000), false)
        .push(None, true);

    let events: Vec<_> = (0..5).filter_map(|_| r.node.poll_input(&mut button)).collect();

    assert_eq!(events, vec![InputEvent::FactoryReset]);
    assert_eq!(
        r.system.calls(),
        vec![SysCall::DisconnectNetwork, SysCall::Restart]
    );
    assert_eq!(reload(&r.storage), DeviceConfig::default());
}

#[test]
fn short_press_does_not_reset() {
    let mut r = rig();
    let pressed = Rc::new(RefCell::new(0));
    let p = pressed.clone();
    r.node.on_button_press(move |_| *p.borrow_mut() += 1);

    let mut button = ScriptedButton::idle();
    button.tap();
    r.node.tick(&mut button);
    r.node.tick(&mut button);

    assert_eq!(*pressed.borrow(), 1);
    assert!(r.system.calls().is_empty());
}

#[test]
fn reset_still_restarts_when_storage_write_fails() {
    let mut r = rig();
    r.node.tick(&mut ScriptedButton::idle());
    r.storage.fail_writes(true);

    r.node.factory_reset();

    assert_eq!(
        r.system.calls(),
        vec![SysCall::DisconnectNetwork, SysCall::Restart]
    );
    r.storage.fail_writes(false);
    assert_eq!(reload(&r.storage), provisioned());
}

#[test]
fn reset_writes_the_record_once() {
    let mut r = rig();
    let before = r.storage.writes();
    r.node.factory_reset();
    assert_eq!(r.storage.writes(), before + 1);
}
