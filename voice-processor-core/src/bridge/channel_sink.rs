use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

use crate::traits::frame_sink::FrameSink;

/// Frame sink backed by a crossbeam channel.
///
/// The sink only holds the sending end. Frames the consumer cannot take
/// are dropped and counted, never queued: a bounded sink drops the newest
/// frame when full, and any sink drops everything once every receiver is
/// gone. The capture thread never blocks.
#[derive(Clone)]
pub struct ChannelSink {
    sender: Sender<Vec<i16>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    pub fn unbounded() -> (Self, Receiver<Vec<i16>>) {
        let (sender, receiver) = unbounded();
        (Self::with_sender(sender), receiver)
    }

    /// Hold at most `capacity` undelivered frames.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Vec<i16>>) {
        let (sender, receiver) = bounded(capacity);
        (Self::with_sender(sender), receiver)
    }

    fn with_sender(sender: Sender<Vec<i16>>) -> Self {
        Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Frames dropped because the consumer was full or gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames sent and not yet received.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

impl FrameSink for ChannelSink {
    fn on_frame(&self, frame: Vec<i16>) {
        if let Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) =
            self.sender.try_send(frame)
        {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_sink_drops_when_full() {
        let (sink, frames) = ChannelSink::bounded(2);

        sink.on_frame(vec![1]);
        sink.on_frame(vec![2]);
        sink.on_frame(vec![3]);

        assert_eq!(frames.try_recv().unwrap(), vec![1]);
        assert_eq!(frames.try_recv().unwrap(), vec![2]);
        assert!(frames.try_recv().is_err());
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn nothing_queues_after_the_consumer_is_gone() {
        let (sink, frames) = ChannelSink::unbounded();
        sink.on_frame(vec![0; 512]);
        assert_eq!(sink.pending(), 1);
        assert_eq!(frames.recv().unwrap().len(), 512);

        drop(frames);
        for _ in 0..1000 {
            sink.on_frame(vec![0; 512]);
        }

        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.dropped(), 1000);
    }

    #[test]
    fn clones_share_the_channel() {
        let (sink, frames) = ChannelSink::unbounded();
        let other = sink.clone();
        sink.on_frame(vec![1]);
        other.on_frame(vec![2]);

        assert_eq!(frames.try_recv().unwrap(), vec![1]);
        assert_eq!(frames.try_recv().unwrap(), vec![2]);
    }

    #[test]
    fn closures_are_sinks() {
        let (sender, receiver) = unbounded();
        let sink = move |frame: Vec<i16>| {
            sender.send(frame.len()).unwrap();
        };
        sink.on_frame(vec![0; 512]);
        assert_eq!(receiver.recv().unwrap(), 512);
    }
}
