use parking_lot::Mutex;

use crate::traits::interruption::{
    InterruptionEvent, InterruptionObserver, InterruptionSource, SubscriptionId,
};

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, InterruptionObserver)>,
}

/// In-process interruption broadcaster.
///
/// Platform glue posts events here; subscribers are notified in
/// subscription order on the posting thread, outside the registry lock.
#[derive(Default)]
pub struct InterruptionCenter {
    observers: Mutex<Observers>,
}

impl InterruptionCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, event: InterruptionEvent) {
        let observers: Vec<InterruptionObserver> = self
            .observers
            .lock()
            .entries
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        log::debug!(
            "Posting interruption {:?} to {} observer(s)",
            event,
            observers.len()
        );
        for observer in observers {
            observer(&event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().entries.len()
    }
}

impl InterruptionSource for InterruptionCenter {
    fn subscribe(&self, observer: InterruptionObserver) -> SubscriptionId {
        let mut observers = self.observers.lock();
        observers.next_id += 1;
        let id = SubscriptionId(observers.next_id);
        observers.entries.push((id, observer));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .entries
            .retain(|(entry_id, _)| *entry_id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn notifies_until_unsubscribed() {
        let center = InterruptionCenter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = center.subscribe(Arc::new(move |event: &InterruptionEvent| {
            sink.lock().push(*event);
        }));

        center.post(InterruptionEvent::Began);
        center.unsubscribe(id);
        center.post(InterruptionEvent::Ended {
            should_resume: true,
        });

        assert_eq!(*seen.lock(), vec![InterruptionEvent::Began]);
        assert_eq!(center.observer_count(), 0);

        // Unknown ids are ignored.
        center.unsubscribe(id);
    }

    #[test]
    fn observers_may_unsubscribe_while_notified() {
        let center = Arc::new(InterruptionCenter::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&center);
        let own_id = Arc::clone(&slot);
        let id = center.subscribe(Arc::new(move |_event: &InterruptionEvent| {
            if let (Some(center), Some(id)) = (weak.upgrade(), *own_id.lock()) {
                center.unsubscribe(id);
            }
        }));
        *slot.lock() = Some(id);

        center.post(InterruptionEvent::Began);
        assert_eq!(center.observer_count(), 0);
    }
}
