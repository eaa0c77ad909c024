//! # Event Bus
//!
//! Named events with ordered subscriber lists. Emission is synchronous and subscriptions live as
//! long as the bus.

use crate::codegen::BoundInput;
use crate::error::RuntimeError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type Subscriber = Rc<dyn Fn(&[BoundInput]) -> Result<(), RuntimeError>>;

#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<HashMap<String, Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        event: impl Into<String>,
        subscriber: impl Fn(&[BoundInput]) -> Result<(), RuntimeError> + 'static,
    ) {
        let event = event.into();
        tracing::debug!("[RUNTIME] Subscribed to '{}'", event);
        self.subscribers
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Rc::new(subscriber));
    }

    /// Invoke every current subscriber of `event` in registration order and return how many ran.
    ///
    /// Subscribers added while the event is being delivered do not see it. A failing subscriber
    /// is logged and does not stop the others.
    pub fn emit(&self, event: &str, args: &[BoundInput]) -> usize {
        let subscribers = match self.subscribers.borrow().get(event) {
            Some(subscribers) => subscribers.clone(),
            None => return 0,
        };

        tracing::debug!("[RUNTIME] Emitting '{}' to {} subscribers", event, subscribers.len());
        for subscriber in &subscribers {
            if let Err(e) = subscriber(args) {
                tracing::warn!("[RUNTIME] Subscriber of '{}' failed: {}", event, e);
            }
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .borrow()
            .get(event)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.borrow();
        let mut events: Vec<_> = subscribers
            .iter()
            .map(|(event, list)| (event.clone(), list.len()))
            .collect();
        events.sort();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}
