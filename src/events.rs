/*!

Create/change/delete notifications for external subscribers (UI and API
layers). Events are queued as operations run and delivered in order on
[`Registry::flush_notifications`](crate::registry::Registry::flush_notifications);
queued `Changed` events coalesce per identifier and `Reload` events per event
name, so a burst of writes to one object costs subscribers a single wake-up.

Per-entity events address one object by identifier. Classes flagged
[`ClassFlags::RELOAD`](crate::class::ClassFlags) have no per-entity address
from the outside; their create/change/delete all collapse into a
whole-collection `Reload` carrying the class chain's event name.

*/

use std::cell::RefCell;

use serde::Serialize;

use crate::registry::Registry;
use crate::uuid::Uuid;

/// One notification, as delivered to subscribers (and as serialized towards
/// protocol layers).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ObjectEvent {
    Created { uuid: Uuid, class: &'static str },
    Changed { uuid: Uuid },
    Deleted { uuid: Uuid },
    TitleChanged { uuid: Uuid, title: String },
    /// Whole-collection reload signal, keyed by class event name.
    Reload {
        #[serde(rename = "reload_event")]
        event: &'static str,
    },
}

pub type Subscriber = Box<dyn Fn(&Registry, &ObjectEvent)>;

#[derive(Default)]
pub(crate) struct NotificationQueue {
    pending: RefCell<Vec<ObjectEvent>>,
    subscribers: RefCell<Vec<Subscriber>>,
}

impl NotificationQueue {
    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers.borrow_mut().push(subscriber);
    }

    /// Queues an event for the next flush. `Changed` and `Reload` coalesce
    /// against an already-pending equal event.
    pub fn push(&self, event: ObjectEvent) {
        let mut pending = self.pending.borrow_mut();
        match &event {
            ObjectEvent::Changed { .. } | ObjectEvent::Reload { .. } => {
                if pending.contains(&event) {
                    return;
                }
            }
            _ => {}
        }
        pending.push(event);
    }

    /// Delivers every pending event in order. Events queued by handlers
    /// during delivery are delivered in the same flush.
    pub fn flush(&self, registry: &Registry) {
        loop {
            let batch = std::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                return;
            }
            let subscribers = self.subscribers.borrow();
            for event in &batch {
                for subscriber in subscribers.iter() {
                    subscriber(registry, event);
                }
            }
        }
    }
}
