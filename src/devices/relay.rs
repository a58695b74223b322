//! Single-relay switch (Sonoff Basic style).
//!
//! | Topic (short)  | Direction | Payload                             |
//! |----------------|-----------|-------------------------------------|
//! | `relay/set`    | in        | `1` on, `0` off                     |
//! | `republish`    | in        | anything; node-wide state re-send   |
//! | `relay`        | out       | `1` / `0` after every change        |
//!
//! The relay is switched on at boot without a state publish, so a node
//! that loses power comes back powering its load. The broker publishes
//! `relay` = `0` as last will when the node drops off.

use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};

use crate::app::node::Node;
use crate::app::outbox::Outbox;
use crate::app::ports::{Clock, StoragePort, SystemPort, Transport};
use crate::app::router::{parse_switch, switch_payload};
use crate::error::Result;

pub const TOPIC_STATE: &str = "relay";
pub const TOPIC_SET: &str = "relay/set";

/// The coil (and, on most boards, the LED that mirrors it).
pub trait RelayOutput {
    fn set(&mut self, on: bool);
}

struct Relay<R: RelayOutput> {
    output: R,
    on: bool,
}

impl<R: RelayOutput> Relay<R> {
    fn apply(&mut self, on: bool, out: Option<&mut Outbox>) {
        info!("Relay: state is {}", if on { "on" } else { "off" });
        self.on = on;
        self.output.set(on);
        if let Some(out) = out {
            out.publish(TOPIC_STATE, switch_payload(on));
        }
    }
}

/// Cheap handle; clones share one relay.
pub struct RelayDevice<R: RelayOutput> {
    relay: Rc<RefCell<Relay<R>>>,
}

impl<R: RelayOutput> Clone for RelayDevice<R> {
    fn clone(&self) -> Self {
        Self {
            relay: Rc::clone(&self.relay),
        }
    }
}

impl<R: RelayOutput + 'static> RelayDevice<R> {
    /// Take the output and switch it on, silently.
    pub fn new(output: R) -> Self {
        let mut relay = Relay { output, on: false };
        relay.apply(true, None);
        Self {
            relay: Rc::new(RefCell::new(relay)),
        }
    }

    pub fn is_on(&self) -> bool {
        self.relay.borrow().on
    }

    /// Register topics, hooks and the last will on `node`.
    pub fn install<S, T, C, Y>(&self, node: &mut Node<S, T, C, Y>) -> Result<()>
    where
        S: StoragePort,
        T: Transport,
        C: Clock,
        Y: SystemPort,
    {
        let relay = Rc::clone(&self.relay);
        node.subscribe(TOPIC_SET, move |payload, out| match parse_switch(payload) {
            Some(on) => relay.borrow_mut().apply(on, Some(out)),
            None => warn!("Relay: ignoring payload {:?}", payload),
        })?;

        let relay = Rc::clone(&self.relay);
        node.on_republish(move |out| {
            out.publish(TOPIC_STATE, switch_payload(relay.borrow().on));
        })?;

        let relay = Rc::clone(&self.relay);
        node.on_connect(move |out| {
            out.publish(TOPIC_STATE, switch_payload(relay.borrow().on));
        });

        let relay = Rc::clone(&self.relay);
        node.on_button_press(move |out| {
            let mut relay = relay.borrow_mut();
            let next = !relay.on;
            relay.apply(next, Some(out));
        });

        node.set_will(TOPIC_STATE, switch_payload(false))
    }
}
