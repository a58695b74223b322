//! Single-slot event hooks.
//!
//! Exactly one device-behavior owner per event: registering a hook for a
//! kind replaces whatever was there before. Hooks run synchronously on the
//! caller's thread and must not block, or they stall the transport pump.
//!
//! Republish is the exception: every installed device contributes its own
//! callback, and [`RepublishHooks::fire_all`] runs them in install order.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use super::outbox::Outbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// After every successful (re)connection, once subscriptions are active.
    Connect,
    /// Short button press.
    ButtonPress,
}

pub type Hook = Box<dyn FnMut(&mut Outbox)>;

#[derive(Default)]
pub struct EventHooks {
    on_connect: Option<Hook>,
    on_button_press: Option<Hook>,
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: HookKind, hook: impl FnMut(&mut Outbox) + 'static) {
        let slot = self.slot(kind);
        if slot.is_some() {
            debug!("Hooks: replacing {:?} hook", kind);
        }
        *slot = Some(Box::new(hook));
    }

    pub fn is_registered(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::Connect => self.on_connect.is_some(),
            HookKind::ButtonPress => self.on_button_press.is_some(),
        }
    }

    /// Run the hook for `kind`. Returns `false` when the slot is empty.
    pub fn fire(&mut self, kind: HookKind, outbox: &mut Outbox) -> bool {
        match self.slot(kind) {
            Some(hook) => {
                hook(outbox);
                true
            }
            None => false,
        }
    }

    fn slot(&mut self, kind: HookKind) -> &mut Option<Hook> {
        match kind {
            HookKind::Connect => &mut self.on_connect,
            HookKind::ButtonPress => &mut self.on_button_press,
        }
    }
}

/// Shared list of republish callbacks. Clones see the same list, so the
/// topic handler can hold one while devices keep adding to the node's.
#[derive(Clone, Default)]
pub struct RepublishHooks(Rc<RefCell<Vec<Hook>>>);

impl RepublishHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, hook: impl FnMut(&mut Outbox) + 'static) {
        self.0.borrow_mut().push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every callback. Returns how many ran.
    pub fn fire_all(&self, outbox: &mut Outbox) -> usize {
        let mut hooks = self.0.borrow_mut();
        for hook in hooks.iter_mut() {
            hook(outbox);
        }
        hooks.len()
    }
}
