//! Deferred side effects requested by handlers and hooks.
//!
//! Handlers run while the node is dispatching, so they cannot borrow it.
//! Instead they receive an [`Outbox`] and queue what they want done; the
//! node drains it as soon as the handler returns.

/// A publish queued by a handler, addressed by short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub short_name: String,
    pub payload: Vec<u8>,
}

/// Device-level actions a handler may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRequest {
    Restart,
    /// Restore default config, drop the network and restart.
    FactoryReset,
}

#[derive(Debug, Default)]
pub struct Outbox {
    publishes: Vec<OutboundMessage>,
    request: Option<SystemRequest>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a publish on `short_name`. Dropped later if the node is offline.
    pub fn publish(&mut self, short_name: &str, payload: impl AsRef<[u8]>) {
        self.publishes.push(OutboundMessage {
            short_name: short_name.to_owned(),
            payload: payload.as_ref().to_vec(),
        });
    }

    /// Ask for a restart. Never downgrades a pending factory reset.
    pub fn request_restart(&mut self) {
        if self.request.is_none() {
            self.request = Some(SystemRequest::Restart);
        }
    }

    pub fn request_factory_reset(&mut self) {
        self.request = Some(SystemRequest::FactoryReset);
    }

    pub fn pending_request(&self) -> Option<SystemRequest> {
        self.request
    }

    pub fn take_publishes(&mut self) -> Vec<OutboundMessage> {
        core::mem::take(&mut self.publishes)
    }

    pub fn take_request(&mut self) -> Option<SystemRequest> {
        self.request.take()
    }

    pub fn is_empty(&self) -> bool {
        self.publishes.is_empty() && self.request.is_none()
    }
}
