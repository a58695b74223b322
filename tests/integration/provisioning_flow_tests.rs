//! Provisioning flow: first boot → portal form → persisted record → node
//! connects with the new broker settings.

use homenode::app::store::ConfigStore;
use homenode::config::{CONFIG_SALT, DeviceConfig, NodeOptions, StoreLayout};
use homenode::provisioning::{PortalForm, Provisioning};

use crate::mock_hw::{MockStorage, Op, ScriptedButton, rig_with};

fn options() -> NodeOptions {
    NodeOptions {
        topic_prefix: "device".into(),
        ..NodeOptions::default()
    }
}

#[test]
fn erased_flash_requires_portal() {
    let store = ConfigStore::open(MockStorage::erased(), StoreLayout::default()).unwrap();
    assert!(Provisioning::required(store.snapshot()));
    assert_eq!(*store.snapshot(), DeviceConfig::default());
}

#[test]
fn committed_form_survives_a_reboot() {
    let storage = MockStorage::erased();
    let mut store = ConfigStore::open(storage.clone(), StoreLayout::default()).unwrap();

    let mut portal = Provisioning::new();
    let mut form = PortalForm::prefill(store.snapshot());
    form.address = "broker.lan".into();
    form.user = "th10".into();
    portal.on_save_config();
    portal.commit(&form, &mut store).unwrap();

    // Power cycle: a fresh store over the same flash.
    let reopened = ConfigStore::open(storage, StoreLayout::default()).unwrap();
    let cfg = reopened.snapshot();
    assert_eq!(cfg.broker_address.as_str(), "broker.lan");
    assert_eq!(cfg.broker_port, 8883);
    assert_eq!(cfg.salt, CONFIG_SALT);
    assert!(!Provisioning::required(cfg));
}

#[test]
fn provisioned_node_connects_with_portal_settings() {
    let form = PortalForm {
        address: "broker.lan".into(),
        port: "1883".into(),
        user: "th10".into(),
        password: "pw".into(),
    };
    let mut r = rig_with(Some(form.to_config().unwrap()), &options());
    r.node.tick(&mut ScriptedButton::idle());

    assert!(matches!(r.transport.ops()[0], Op::Connect { .. }));
    assert_eq!(r.transport.0.borrow().username.as_deref(), Some("th10"));
    assert_eq!(r.node.config().broker_port, 1883);
}

#[test]
fn unreadable_storage_is_fatal_at_open() {
    let storage = MockStorage::erased();
    storage.fail_reads(true);
    assert!(ConfigStore::open(storage, StoreLayout::default()).is_err());
}

#[test]
fn oversized_address_is_refused() {
    let form = PortalForm {
        address: "a-really-long-broker-hostname.example.org".into(),
        port: "8883".into(),
        ..PortalForm::default()
    };
    let storage = MockStorage::erased();
    let mut store = ConfigStore::open(storage.clone(), StoreLayout::default()).unwrap();
    let mut portal = Provisioning::new();
    portal.on_save_config();

    assert!(portal.commit(&form, &mut store).is_err());
    assert_eq!(storage.writes(), 0);
}
