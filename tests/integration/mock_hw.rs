//! Mock adapters for integration tests.
//!
//! Every mock is a cheap handle over shared state, so a test keeps one
//! clone for assertions after moving the other into the node. The
//! transport records every call in order.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use homenode::adapters::device_id::DeviceIdentity;
use homenode::app::ports::{
    ButtonInput, Clock, ConnectOptions, InboundMessage, StorageError, StoragePort, SystemPort,
    Transport, TransportError, Will,
};
use homenode::app::store::ConfigStore;
use homenode::config::{DeviceConfig, EEPROM_SIZE, NodeOptions, StoreLayout};
use homenode::Node;

// ── Transport ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect { client_id: String },
    Subscribe(String),
    Publish(String, Vec<u8>),
    Disconnect,
}

#[derive(Debug, Default)]
pub struct BrokerState {
    pub connected: bool,
    pub ops: Vec<Op>,
    pub refuse_connects: u32,
    pub fail_subscribes: u32,
    pub inbound: VecDeque<InboundMessage>,
    pub will: Option<Will>,
    pub username: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockTransport(pub Rc<RefCell<BrokerState>>);

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an inbound message; delivered on the next pump.
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        self.0.borrow_mut().inbound.push_back(InboundMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
        });
    }

    pub fn refuse_connects(&self, n: u32) {
        self.0.borrow_mut().refuse_connects = n;
    }

    pub fn fail_subscribes(&self, n: u32) {
        self.0.borrow_mut().fail_subscribes = n;
    }

    /// Broker side closes the session.
    pub fn drop_session(&self) {
        self.0.borrow_mut().connected = false;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.0.borrow_mut().ops.clear();
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.0
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Publish(t, p) => Some((t.clone(), p.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        self.0
            .borrow()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Connect { .. }))
            .count()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.0
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Subscribe(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn will(&self) -> Option<Will> {
        self.0.borrow().will.clone()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), TransportError> {
        let mut s = self.0.borrow_mut();
        s.ops.push(Op::Connect {
            client_id: options.client_id.to_owned(),
        });
        if s.refuse_connects > 0 {
            s.refuse_connects -= 1;
            return Err(TransportError::Refused(5));
        }
        s.connected = true;
        s.will = options.will.cloned();
        s.username = options.username.map(str::to_owned);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let mut s = self.0.borrow_mut();
        if !s.connected {
            return Err(TransportError::NotConnected);
        }
        if s.fail_subscribes > 0 {
            s.fail_subscribes -= 1;
            return Err(TransportError::Client(-1));
        }
        s.ops.push(Op::Subscribe(topic.to_owned()));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut s = self.0.borrow_mut();
        if !s.connected {
            return Err(TransportError::NotConnected);
        }
        s.ops.push(Op::Publish(topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        let mut s = self.0.borrow_mut();
        if !s.connected {
            return None;
        }
        s.inbound.pop_front()
    }

    fn disconnect(&mut self) {
        let mut s = self.0.borrow_mut();
        s.connected = false;
        s.ops.push(Op::Disconnect);
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct StorageState {
    pub bytes: Vec<u8>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: u32,
}

#[derive(Clone)]
pub struct MockStorage(pub Rc<RefCell<StorageState>>);

impl MockStorage {
    pub fn erased() -> Self {
        Self(Rc::new(RefCell::new(StorageState {
            bytes: vec![0xFF; EEPROM_SIZE],
            fail_reads: false,
            fail_writes: false,
            writes: 0,
        })))
    }

    pub fn fail_reads(&self, on: bool) {
        self.0.borrow_mut().fail_reads = on;
    }

    pub fn fail_writes(&self, on: bool) {
        self.0.borrow_mut().fail_writes = on;
    }

    pub fn writes(&self) -> u32 {
        self.0.borrow().writes
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().bytes.clone()
    }
}

impl StoragePort for MockStorage {
    fn capacity(&self) -> usize {
        self.0.borrow().bytes.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let s = self.0.borrow();
        if s.fail_reads {
            return Err(StorageError::IoError);
        }
        let src = s
            .bytes
            .get(offset..offset + buf.len())
            .ok_or(StorageError::OutOfRange)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let mut s = self.0.borrow_mut();
        if s.fail_writes {
            return Err(StorageError::IoError);
        }
        let dst = s
            .bytes
            .get_mut(offset..offset + data.len())
            .ok_or(StorageError::OutOfRange)?;
        dst.copy_from_slice(data);
        s.writes += 1;
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Time only moves when something sleeps or a test advances it.
#[derive(Clone, Default)]
pub struct FakeClock {
    now_ms: Rc<Cell<u64>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl FakeClock {
    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration.as_millis() as u64);
    }
}

// ── System ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysCall {
    DisconnectNetwork,
    Restart,
}

#[derive(Clone, Default)]
pub struct MockSystem(pub Rc<RefCell<Vec<SysCall>>>);

impl MockSystem {
    pub fn calls(&self) -> Vec<SysCall> {
        self.0.borrow().clone()
    }

    pub fn restarts(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|c| **c == SysCall::Restart)
            .count()
    }
}

impl SystemPort for MockSystem {
    fn disconnect_network(&mut self) {
        self.0.borrow_mut().push(SysCall::DisconnectNetwork);
    }

    fn restart(&mut self) {
        self.0.borrow_mut().push(SysCall::Restart);
    }
}

// ── Button ────────────────────────────────────────────────────

/// One poll's worth of button state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sample {
    pub held_ms: Option<u64>,
    pub released: bool,
}

#[derive(Default)]
pub struct ScriptedButton {
    script: VecDeque<Sample>,
    current: Sample,
}

impl ScriptedButton {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn push(&mut self, held_ms: Option<u64>, released: bool) -> &mut Self {
        self.script.push_back(Sample { held_ms, released });
        self
    }

    /// A quick tap: pressed for 100 ms, then released.
    pub fn tap(&mut self) -> &mut Self {
        self.push(Some(100), false).push(None, true)
    }
}

impl ButtonInput for ScriptedButton {
    fn read(&mut self) {
        self.current = self.script.pop_front().unwrap_or_default();
    }

    fn was_released(&self) -> bool {
        self.current.released
    }

    fn pressed_for(&self, threshold: Duration) -> bool {
        self.current
            .held_ms
            .is_some_and(|ms| ms >= threshold.as_millis() as u64)
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestNode = Node<MockStorage, MockTransport, FakeClock, MockSystem>;

pub const MAC: [u8; 6] = [0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6];
pub const ID: &str = "a1b2c3d4e5f6";

pub struct Rig {
    pub node: TestNode,
    pub transport: MockTransport,
    pub storage: MockStorage,
    pub clock: FakeClock,
    pub system: MockSystem,
}

pub fn provisioned() -> DeviceConfig {
    DeviceConfig::with_broker("mqtt.local", 8883, "node", "secret").unwrap()
}

/// Node over mocks, with `config` already persisted when given.
pub fn rig_with(config: Option<DeviceConfig>, options: &NodeOptions) -> Rig {
    let storage = MockStorage::erased();
    let mut store = ConfigStore::new(storage.clone(), StoreLayout::default());
    if let Some(cfg) = config {
        store.save(&cfg).unwrap();
    }
    store.load().unwrap();

    let transport = MockTransport::new();
    let clock = FakeClock::default();
    let system = MockSystem::default();
    let node = Node::new(
        DeviceIdentity::from_mac(&MAC),
        store,
        transport.clone(),
        clock.clone(),
        system.clone(),
        options,
    )
    .unwrap();

    Rig {
        node,
        transport,
        storage,
        clock,
        system,
    }
}

pub fn rig() -> Rig {
    let options = NodeOptions {
        topic_prefix: "device".into(),
        ..NodeOptions::default()
    };
    rig_with(Some(provisioned()), &options)
}

pub fn topic(short: &str) -> String {
    format!("device/{ID}/{short}")
}
