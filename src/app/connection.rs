//! Broker session owner.
//!
//! ```text
//!   Disconnected ──▶ Connecting ──▶ Connected
//!        ▲               │ ▲            │
//!        │               └─┘ retry      │ session lost
//!        └──────────────────────────────┘
//! ```
//!
//! [`ensure_connected`](ConnectionManager::ensure_connected) blocks the
//! caller until a session is up, sleeping a fixed interval between attempts
//! through the injected [`Clock`]. Once connected it resubscribes every
//! registered topic and only then fires the on-connect hook, so a state
//! publish from the hook can never race an inbound command on a topic that
//! is not yet subscribed.

use core::time::Duration;

use log::{debug, info, warn};

use crate::config::{DeviceConfig, NodeOptions};
use crate::error::RegistrationError;

use super::hooks::{EventHooks, HookKind};
use super::outbox::Outbox;
use super::ports::{Clock, ConnectOptions, Transport, TransportError, Will};
use super::router::TopicRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct ConnectionManager<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    router: TopicRouter,
    client_id: String,
    will: Option<Will>,
    retry_interval: Duration,
    max_messages_per_pump: usize,
    state: ConnectionState,
    failed_attempts: u32,
    sessions: u32,
}

impl<T: Transport, C: Clock> ConnectionManager<T, C> {
    pub fn new(transport: T, clock: C, router: TopicRouter, options: &NodeOptions) -> Self {
        let client_id = router.identity().hostname().as_str().to_owned();
        Self {
            transport,
            clock,
            router,
            client_id,
            will: None,
            retry_interval: options.retry_interval,
            max_messages_per_pump: options.max_messages_per_pump.max(1),
            state: ConnectionState::Disconnected,
            failed_attempts: 0,
            sessions: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// `Connected` and the transport agrees.
    pub fn is_live(&self) -> bool {
        self.state == ConnectionState::Connected && self.transport.is_connected()
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut TopicRouter {
        &mut self.router
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn will(&self) -> Option<&Will> {
        self.will.as_ref()
    }

    /// Successful connection transitions so far.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Consecutive failed attempts in the current `Connecting` phase.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Last-will sent with every connect. Setup-time only, like subscriptions.
    pub fn set_will(&mut self, short_name: &str, payload: &[u8]) -> Result<(), RegistrationError> {
        if self.router.is_sealed() {
            return Err(RegistrationError::Closed);
        }
        self.will = Some(Will {
            topic: self.router.qualify(short_name),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    // ── Connection lifecycle ─────────────────────────────────

    /// Block until a session is live.
    ///
    /// Returns `true` when this call established a new session (and fired
    /// the on-connect hook), `false` when the existing one was still alive.
    pub fn ensure_connected(
        &mut self,
        config: &DeviceConfig,
        hooks: &mut EventHooks,
        outbox: &mut Outbox,
    ) -> bool {
        if self.is_live() {
            return false;
        }
        if self.state == ConnectionState::Connected {
            warn!("MQTT: session lost");
            self.transport.disconnect();
            self.state = ConnectionState::Disconnected;
        }
        self.router.seal();

        loop {
            match self.step(config).and_then(|()| self.resubscribe()) {
                Ok(()) => break,
                Err(e) => {
                    warn!(
                        "MQTT: failed ({}), try again in {} s",
                        e,
                        self.retry_interval.as_secs()
                    );
                    self.clock.sleep(self.retry_interval);
                }
            }
        }

        if hooks.fire(HookKind::Connect, outbox) {
            debug!("MQTT: on-connect hook done");
        }
        self.flush(outbox);
        true
    }

    /// One connection attempt. Leaves the state `Connected` on success and
    /// `Connecting` on failure.
    pub fn step(&mut self, config: &DeviceConfig) -> Result<(), TransportError> {
        self.state = ConnectionState::Connecting;
        info!(
            "MQTT: attempting connection to {}:{} as {}",
            config.broker_address, config.broker_port, self.client_id
        );

        let options = ConnectOptions {
            host: &config.broker_address,
            port: config.broker_port,
            client_id: &self.client_id,
            username: non_empty(&config.broker_user),
            password: non_empty(&config.broker_password),
            will: self.will.as_ref(),
        };

        match self.transport.connect(&options) {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.failed_attempts = 0;
                self.sessions += 1;
                info!("MQTT: connected (session {})", self.sessions);
                Ok(())
            }
            Err(e) => {
                self.failed_attempts += 1;
                Err(e)
            }
        }
    }

    /// Subscribe every registered topic. A failure drops the session so the
    /// retry loop starts over with a clean connect.
    fn resubscribe(&mut self) -> Result<(), TransportError> {
        for topic in self.router.topics() {
            if let Err(e) = self.transport.subscribe(topic) {
                warn!("MQTT: subscribe '{}' failed", topic);
                self.transport.disconnect();
                self.state = ConnectionState::Connecting;
                self.failed_attempts += 1;
                return Err(e);
            }
            debug!("MQTT: subscribed to '{}'", topic);
        }
        info!("MQTT: subscribed to {} topics", self.router.topics().count());
        Ok(())
    }

    /// Service the session and dispatch inbound messages.
    ///
    /// Publishes queued by a handler go out before the next message is
    /// dispatched. Stops early once a handler asks for a restart or reset.
    /// Returns the number of messages dispatched.
    pub fn pump(&mut self, outbox: &mut Outbox) -> usize {
        if self.state != ConnectionState::Connected {
            return 0;
        }

        let mut handled = 0;
        while handled < self.max_messages_per_pump {
            let Some(msg) = self.transport.poll() else {
                break;
            };
            handled += 1;
            info!("MQTT: message arrived [{}]", msg.topic);
            self.router.dispatch(&msg.topic, &msg.payload, outbox);
            self.flush(outbox);
            if outbox.pending_request().is_some() {
                break;
            }
        }
        handled
    }

    /// Qualify and send. Dropped when there is no live session.
    pub fn publish(&mut self, short_name: &str, payload: &[u8]) -> bool {
        let topic = self.router.qualify(short_name);
        if !self.is_live() {
            debug!("MQTT: offline, dropping publish to '{}'", topic);
            return false;
        }
        match self.transport.publish(&topic, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("MQTT: publish to '{}' failed: {}", topic, e);
                false
            }
        }
    }

    /// Send every publish queued in `outbox`, in order.
    pub fn flush(&mut self, outbox: &mut Outbox) {
        for msg in outbox.take_publishes() {
            self.publish(&msg.short_name, &msg.payload);
        }
    }

    /// Close the session.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.state = ConnectionState::Disconnected;
        info!("MQTT: disconnected");
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}
