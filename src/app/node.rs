//! The node — one object wiring config, session, dispatch, hooks and input.
//!
//! ```text
//!  ButtonInput ──▶ ┌─────────────────────────────┐ ──▶ SystemPort
//!                  │            Node             │
//!  StoragePort ◀──▶│ ConfigStore · Connection    │◀──▶ Transport
//!                  │ TopicRouter · EventHooks    │
//!                  └─────────────────────────────┘
//! ```
//!
//! Device variants never touch the transport: they register topic
//! handlers and hooks, and publish by short name. Everything runs on the
//! caller's thread from [`Node::tick`].

use log::{debug, error, info, warn};

use crate::adapters::device_id::DeviceIdentity;
use crate::config::{DeviceConfig, NodeOptions};
use crate::error::{Error, RegistrationError, Result};

use super::connection::{ConnectionManager, ConnectionState};
use super::hooks::{EventHooks, HookKind, RepublishHooks};
use super::input::{InputEvent, InputPolicy};
use super::outbox::{Outbox, SystemRequest};
use super::ports::{ButtonInput, Clock, StoragePort, SystemPort, Transport};
use super::router::{TopicRouter, parse_switch};
use super::store::ConfigStore;

/// `'1'` restarts the node.
pub const TOPIC_REBOOT: &str = "reboot";
/// `'1'` restores default config and restarts.
pub const TOPIC_RESET: &str = "reset";
/// Any payload: every installed device re-sends its current state.
pub const TOPIC_REPUBLISH: &str = "republish";

pub struct Node<S, T, C, Y>
where
    S: StoragePort,
    T: Transport,
    C: Clock,
    Y: SystemPort,
{
    store: ConfigStore<S>,
    conn: ConnectionManager<T, C>,
    hooks: EventHooks,
    republish: RepublishHooks,
    input: InputPolicy,
    system: Y,
    outbox: Outbox,
}

impl<S, T, C, Y> Node<S, T, C, Y>
where
    S: StoragePort,
    T: Transport,
    C: Clock,
    Y: SystemPort,
{
    /// Assemble a node around an already loaded store.
    pub fn new(
        identity: DeviceIdentity,
        store: ConfigStore<S>,
        transport: T,
        clock: C,
        system: Y,
        options: &NodeOptions,
    ) -> Result<Self> {
        validate_prefix(&options.topic_prefix)?;

        let router = TopicRouter::new(&options.topic_prefix, identity, options.duplicate_policy);
        let mut node = Self {
            store,
            conn: ConnectionManager::new(transport, clock, router, options),
            hooks: EventHooks::new(),
            republish: RepublishHooks::new(),
            input: InputPolicy::new(options.reset_hold),
            system,
            outbox: Outbox::new(),
        };
        if options.control_topics {
            node.install_control_topics()?;
        }
        info!("Node: {} ready", node.identity().hostname());
        Ok(node)
    }

    fn install_control_topics(&mut self) -> core::result::Result<(), RegistrationError> {
        let router = self.conn.router_mut();
        router.register(TOPIC_REBOOT, |payload, out| match parse_switch(payload) {
            Some(true) => {
                info!("Node: reboot was requested");
                out.request_restart();
            }
            Some(false) => debug!("Node: reboot '0', nothing to do"),
            None => warn!("Node: invalid reboot payload"),
        })?;
        router.register(TOPIC_RESET, |payload, out| match parse_switch(payload) {
            Some(true) => {
                info!("Node: reset was requested");
                out.request_factory_reset();
            }
            Some(false) => debug!("Node: reset '0', nothing to do"),
            None => warn!("Node: invalid reset payload"),
        })?;
        Ok(())
    }

    // ── Registration (before the first tick) ─────────────────

    /// Route `<prefix>/<id>/<short_name>` to `handler`.
    pub fn subscribe(
        &mut self,
        short_name: &str,
        handler: impl FnMut(&[u8], &mut Outbox) + 'static,
    ) -> Result<()> {
        self.conn
            .router_mut()
            .register(short_name, handler)
            .map_err(|e| {
                error!("Node: cannot register '{}': {}", short_name, e);
                Error::from(e)
            })
    }

    /// Install `hook` for `kind`, replacing any previous one.
    pub fn register_hook(&mut self, kind: HookKind, hook: impl FnMut(&mut Outbox) + 'static) {
        self.hooks.register(kind, hook);
    }

    pub fn on_connect(&mut self, hook: impl FnMut(&mut Outbox) + 'static) {
        self.register_hook(HookKind::Connect, hook);
    }

    pub fn on_button_press(&mut self, hook: impl FnMut(&mut Outbox) + 'static) {
        self.register_hook(HookKind::ButtonPress, hook);
    }

    /// Add a callback to the shared `republish` topic. The topic itself is
    /// subscribed on the first call.
    pub fn on_republish(&mut self, hook: impl FnMut(&mut Outbox) + 'static) -> Result<()> {
        if self.republish.is_empty() {
            let hooks = self.republish.clone();
            self.subscribe(TOPIC_REPUBLISH, move |_, out| {
                let ran = hooks.fire_all(out);
                debug!("Node: republish ran {} callback(s)", ran);
            })?;
        }
        self.republish.add(hook);
        Ok(())
    }

    /// Message the broker publishes on `short_name` if we vanish.
    pub fn set_will(&mut self, short_name: &str, payload: impl AsRef<[u8]>) -> Result<()> {
        Ok(self.conn.set_will(short_name, payload.as_ref())?)
    }

    // ── Run loop ──────────────────────────────────────────────

    /// One loop iteration: connect if needed, service the session, read
    /// the button, then carry out any restart or reset a handler asked for.
    pub fn tick(&mut self, input: &mut impl ButtonInput) {
        self.ensure_connected();
        self.pump();
        self.poll_input(input);
    }

    /// Block until connected. `true` if a new session was established.
    pub fn ensure_connected(&mut self) -> bool {
        let fresh = self
            .conn
            .ensure_connected(self.store.snapshot(), &mut self.hooks, &mut self.outbox);
        self.apply_request();
        fresh
    }

    /// Dispatch pending inbound messages. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let handled = self.conn.pump(&mut self.outbox);
        self.apply_request();
        handled
    }

    /// Sample the button and act on the gesture.
    pub fn poll_input(&mut self, input: &mut impl ButtonInput) -> Option<InputEvent> {
        let event = self.input.poll(input)?;
        match event {
            InputEvent::Press => {
                if self.hooks.fire(HookKind::ButtonPress, &mut self.outbox) {
                    self.conn.flush(&mut self.outbox);
                } else {
                    debug!("Node: button press with no hook");
                }
            }
            InputEvent::FactoryReset => {
                info!(
                    "Node: button held {} s, resetting settings",
                    self.input.reset_hold().as_secs()
                );
                self.outbox.request_factory_reset();
            }
        }
        self.apply_request();
        Some(event)
    }

    /// Publish on `<prefix>/<id>/<short_name>`; dropped while offline.
    pub fn publish(&mut self, short_name: &str, payload: impl AsRef<[u8]>) -> bool {
        self.conn.publish(short_name, payload.as_ref())
    }

    // ── Device actions ────────────────────────────────────────

    pub fn reboot(&mut self) {
        info!("Node: rebooting");
        self.system.restart();
    }

    /// Restore defaults, drop the network and restart. No confirmation.
    pub fn factory_reset(&mut self) {
        warn!("Node: factory reset");
        if let Err(e) = self.store.reset_to_defaults() {
            // Unknown config state: restarting is the only way forward.
            error!("Node: could not restore defaults: {}", e);
        }
        self.system.disconnect_network();
        self.system.restart();
    }

    fn apply_request(&mut self) {
        match self.outbox.take_request() {
            Some(SystemRequest::Restart) => self.reboot(),
            Some(SystemRequest::FactoryReset) => self.factory_reset(),
            None => {}
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn identity(&self) -> &DeviceIdentity {
        self.conn.router().identity()
    }

    pub fn qualify(&self, short_name: &str) -> String {
        self.conn.router().qualify(short_name)
    }

    /// Read-only snapshot of the persisted config.
    pub fn config(&self) -> &DeviceConfig {
        self.store.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn connection(&self) -> &ConnectionManager<T, C> {
        &self.conn
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn system(&self) -> &Y {
        &self.system
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains(['+', '#']) {
        return Err(Error::Config("topic prefix must be non-empty and wildcard-free"));
    }
    Ok(())
}
