//! Topic namespace and inbound dispatch.
//!
//! Every topic the node touches is `<prefix>/<identity>/<short name>`.
//! Subscriptions are registered by short name during setup, then the
//! router is sealed on the first connect attempt and never changes again.

use log::{debug, info};

use crate::adapters::device_id::DeviceIdentity;
use crate::error::RegistrationError;

use super::outbox::Outbox;

/// Handler invoked with the raw payload of a matching inbound message.
pub type TopicHandler = Box<dyn FnMut(&[u8], &mut Outbox)>;

/// What to do when the same short name is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Refuse the second registration.
    #[default]
    Reject,
    /// Keep both; only the first registered handler is ever dispatched.
    FirstMatchWins,
}

struct Subscription {
    topic: String,
    handler: TopicHandler,
}

pub struct TopicRouter {
    prefix: String,
    identity: DeviceIdentity,
    policy: DuplicatePolicy,
    subscriptions: Vec<Subscription>,
    sealed: bool,
}

impl TopicRouter {
    pub fn new(prefix: &str, identity: DeviceIdentity, policy: DuplicatePolicy) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_owned(),
            identity,
            policy,
            subscriptions: Vec::new(),
            sealed: false,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// `<prefix>/<identity>/<short_name>`.
    pub fn qualify(&self, short_name: &str) -> String {
        format!("{}/{}/{}", self.prefix, self.identity, short_name)
    }

    /// Add a subscription. Only legal before [`seal`](Self::seal).
    pub fn register(
        &mut self,
        short_name: &str,
        handler: impl FnMut(&[u8], &mut Outbox) + 'static,
    ) -> Result<(), RegistrationError> {
        if self.sealed {
            return Err(RegistrationError::Closed);
        }
        validate_short_name(short_name)?;

        let topic = self.qualify(short_name);
        if self.is_registered(&topic) {
            match self.policy {
                DuplicatePolicy::Reject => return Err(RegistrationError::Duplicate),
                DuplicatePolicy::FirstMatchWins => {
                    debug!("Router: '{}' registered twice, later handler is shadowed", topic);
                }
            }
        }

        info!("Router: registered '{}'", topic);
        self.subscriptions.push(Subscription {
            topic,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// Close registration. Called by the connection manager before dialing.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Qualified topics in registration order, each listed once.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.subscriptions
            .iter()
            .enumerate()
            .filter(|(i, sub)| {
                !self.subscriptions[..*i]
                    .iter()
                    .any(|earlier| earlier.topic == sub.topic)
            })
            .map(|(_, sub)| sub.topic.as_str())
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Invoke the first handler whose topic equals `topic` exactly.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8], outbox: &mut Outbox) -> bool {
        match self.subscriptions.iter_mut().find(|sub| sub.topic == topic) {
            Some(sub) => {
                debug!("Router: '{}' ({} bytes)", topic, payload.len());
                (sub.handler)(payload, outbox);
                true
            }
            None => {
                debug!("Router: no handler for '{}'", topic);
                false
            }
        }
    }

    fn is_registered(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|sub| sub.topic == topic)
    }
}

fn validate_short_name(name: &str) -> Result<(), RegistrationError> {
    if name.is_empty()
        || name.starts_with('/')
        || name.ends_with('/')
        || name.contains(['+', '#', '\0'])
    {
        return Err(RegistrationError::InvalidName);
    }
    Ok(())
}

/// Decode a boolean control payload: exactly `b"1"` or `b"0"`.
pub fn parse_switch(payload: &[u8]) -> Option<bool> {
    match payload {
        b"1" => Some(true),
        b"0" => Some(false),
        _ => None,
    }
}

/// Encode a boolean as a control payload.
pub fn switch_payload(on: bool) -> &'static [u8] {
    if on { b"1" } else { b"0" }
}
