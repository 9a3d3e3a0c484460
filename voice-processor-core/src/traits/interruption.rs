use std::sync::Arc;

/// Audio-session interruption raised by the platform, e.g. a phone call
/// taking over the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptionEvent {
    Began,
    Ended { should_resume: bool },
}

pub type InterruptionObserver = Arc<dyn Fn(&InterruptionEvent) + Send + Sync + 'static>;

/// Handle returned by [`InterruptionSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Source of interruption notifications.
///
/// Observers may be called from any thread.
pub trait InterruptionSource: Send + Sync {
    fn subscribe(&self, observer: InterruptionObserver) -> SubscriptionId;

    /// Remove an observer. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
