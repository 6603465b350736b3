use std::fmt;

use contracts::shared::field_path::FieldPath;
use contracts::shared::metadata::ValidationErrors;
use serde_json::Value;

use crate::transport::RequestMethod;

/// Why a save did not land
#[derive(Debug, Clone, PartialEq)]
pub enum SaveFailure {
    /// Nothing usable came back
    Transport(String),
    /// Non-2xx; per-path messages parsed from the body
    Rejected { status: u16, errors: ValidationErrors },
    /// 2xx, but the body lacks some of the saved paths
    Shape { missing: Vec<FieldPath> },
}

/// Сигналы хранилища для подписчиков
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Record and snapshot were replaced wholesale
    Reloaded,
    PathChanged {
        path: FieldPath,
    },
    /// A `set` could not be applied; the record is unchanged
    PathRejected {
        path: FieldPath,
        reason: String,
    },
    ValidationChanged {
        errors: ValidationErrors,
    },
    Saved {
        paths: Vec<FieldPath>,
        response: Value,
    },
    SaveFailed {
        payload: Value,
        failure: SaveFailure,
    },
    /// The record was deleted on the server and the store emptied
    Deleted {
        id: Value,
    },
    /// A reload or delete did not land
    RequestFailed {
        method: RequestMethod,
        failure: SaveFailure,
    },
}

impl StoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reloaded => "reloaded",
            Self::PathChanged { .. } => "path_changed",
            Self::PathRejected { .. } => "path_rejected",
            Self::ValidationChanged { .. } => "validation_changed",
            Self::Saved { .. } => "saved",
            Self::SaveFailed { .. } => "save_failed",
            Self::Deleted { .. } => "deleted",
            Self::RequestFailed { .. } => "request_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Subscribers, notified synchronously in subscription order
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: StoreEvent) {
        tracing::trace!(event = event.name(), listeners = self.listeners.len(), "emit");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_order_and_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();

        let first = {
            let seen = Rc::clone(&seen);
            bus.subscribe(move |e| seen.borrow_mut().push(format!("1:{}", e.name())))
        };
        {
            let seen = Rc::clone(&seen);
            bus.subscribe(move |e| seen.borrow_mut().push(format!("2:{}", e.name())));
        }

        bus.emit(StoreEvent::Reloaded);
        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        bus.emit(StoreEvent::PathChanged {
            path: FieldPath::key("title"),
        });

        assert_eq!(
            *seen.borrow(),
            vec!["1:reloaded", "2:reloaded", "2:path_changed"]
        );
        assert_eq!(bus.len(), 1);
    }
}
