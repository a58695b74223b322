//! MQTT transport adapter.
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` over TLS (`mqtts://`,
//!   certificate bundle). Client events arrive on the MQTT task and are
//!   forwarded through an `mpsc` channel, so [`Transport::poll`] never
//!   blocks and handlers run on the caller's thread.
//! - **all other targets**: an in-process loopback broker. Publishes to a
//!   subscribed topic come back as inbound messages, and tests can inject
//!   traffic, refuse connects or drop the session.

use std::collections::VecDeque;

use log::{info, warn};

use crate::app::ports::{ConnectOptions, InboundMessage, Transport, TransportError};

#[cfg(not(target_os = "espidf"))]
use crate::app::ports::Will;
#[cfg(not(target_os = "espidf"))]
use log::debug;

#[cfg(target_os = "espidf")]
use core::time::Duration;
#[cfg(target_os = "espidf")]
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError},
};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};

/// How long `connect` waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(target_os = "espidf")]
enum LinkEvent {
    Connected,
    Disconnected,
    Received(InboundMessage),
}

pub struct MqttTransport {
    inbox: VecDeque<InboundMessage>,

    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    events: Option<Receiver<LinkEvent>>,
    #[cfg(target_os = "espidf")]
    online: Arc<AtomicBool>,

    #[cfg(not(target_os = "espidf"))]
    connected: bool,
    #[cfg(not(target_os = "espidf"))]
    subscriptions: Vec<String>,
    #[cfg(not(target_os = "espidf"))]
    published: Vec<InboundMessage>,
    #[cfg(not(target_os = "espidf"))]
    refuse_next: u32,
    #[cfg(not(target_os = "espidf"))]
    client_id: Option<String>,
    #[cfg(not(target_os = "espidf"))]
    will: Option<Will>,
}

impl Default for MqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttTransport {
    pub fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            events: None,
            #[cfg(target_os = "espidf")]
            online: Arc::new(AtomicBool::new(false)),
            #[cfg(not(target_os = "espidf"))]
            connected: false,
            #[cfg(not(target_os = "espidf"))]
            subscriptions: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            published: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            refuse_next: 0,
            #[cfg(not(target_os = "espidf"))]
            client_id: None,
            #[cfg(not(target_os = "espidf"))]
            will: None,
        }
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl MqttTransport {
    fn drain_events(&mut self) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        while let Ok(event) = events.try_recv() {
            if let LinkEvent::Received(msg) = event {
                self.inbox.push_back(msg);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
impl Transport for MqttTransport {
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), TransportError> {
        self.disconnect();

        let url = format!("mqtts://{}:{}", options.host, options.port);
        let conf = MqttClientConfiguration {
            client_id: Some(options.client_id),
            username: options.username,
            password: options.password,
            lwt: options.will.map(|w| LwtConfiguration {
                topic: &w.topic,
                payload: &w.payload,
                qos: QoS::AtMostOnce,
                retain: false,
            }),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            // Reconnects go through the connection manager so it can resubscribe.
            disable_auto_reconnect: true,
            ..Default::default()
        };

        let (tx, rx) = mpsc::channel();
        let online = Arc::clone(&self.online);
        let client = EspMqttClient::new_cb(&url, &conf, move |event| {
            let link = match event.payload() {
                EventPayload::Connected(_) => {
                    online.store(true, Ordering::Release);
                    LinkEvent::Connected
                }
                EventPayload::Disconnected => {
                    online.store(false, Ordering::Release);
                    LinkEvent::Disconnected
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => LinkEvent::Received(InboundMessage {
                    topic: topic.to_owned(),
                    payload: data.to_vec(),
                }),
                _ => return,
            };
            // Receiver gone means the client is being torn down.
            let _ = tx.send(link);
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            TransportError::Client(e.code())
        })?;

        let outcome = match rx.recv_timeout(CONNECT_TIMEOUT) {
            Ok(LinkEvent::Connected) => Ok(()),
            Ok(LinkEvent::Disconnected) => Err(TransportError::Refused(-1)),
            Ok(LinkEvent::Received(_)) => Err(TransportError::Client(-1)),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Unreachable),
        };

        self.client = Some(client);
        self.events = Some(rx);
        if outcome.is_err() {
            self.disconnect();
        }
        outcome
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.online.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| TransportError::Client(e.code()))
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| TransportError::Client(e.code()))
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.drain_events();
        self.inbox.pop_front()
    }

    fn disconnect(&mut self) {
        if self.client.take().is_some() {
            info!("MQTT: client closed");
        }
        self.events = None;
        self.inbox.clear();
        self.online.store(false, Ordering::Release);
    }
}

// ── Loopback backend ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl MqttTransport {
    /// Refuse the next `n` connect attempts.
    pub fn refuse_next(&mut self, n: u32) {
        self.refuse_next = n;
    }

    /// Deliver a message as if another client published it. Dropped unless
    /// the session is up and subscribed to `topic`.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected || !self.is_subscribed(topic) {
            debug!("MQTT(sim): nobody listens on '{}'", topic);
            return false;
        }
        self.inbox.push_back(InboundMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
        });
        true
    }

    /// Lose the session without a clean disconnect.
    pub fn drop_session(&mut self) {
        self.connected = false;
        self.subscriptions.clear();
        self.inbox.clear();
        warn!("MQTT(sim): session dropped");
    }

    pub fn published(&self) -> &[InboundMessage] {
        &self.published
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn will(&self) -> Option<&Will> {
        self.will.as_ref()
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Transport for MqttTransport {
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), TransportError> {
        if options.host.is_empty() {
            return Err(TransportError::Unreachable);
        }
        if self.refuse_next > 0 {
            self.refuse_next -= 1;
            return Err(TransportError::Refused(5));
        }
        self.connected = true;
        self.subscriptions.clear();
        self.inbox.clear();
        self.client_id = Some(options.client_id.to_owned());
        self.will = options.will.cloned();
        info!(
            "MQTT(sim): {} connected to {}:{}",
            options.client_id, options.host, options.port
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if !self.is_subscribed(topic) {
            self.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let msg = InboundMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
        };
        if self.is_subscribed(topic) {
            self.inbox.push_back(msg.clone());
        }
        self.published.push(msg);
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        if !self.connected {
            return None;
        }
        self.inbox.pop_front()
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.subscriptions.clear();
        self.inbox.clear();
    }
}
