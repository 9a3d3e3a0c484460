use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::CaptureDiagnostics;
use crate::models::config::{MAX_FRAME_LENGTH, POOL_SIZE};
use crate::models::error::CaptureError;
use crate::models::format::StreamFormat;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Called on the device thread for every filled buffer.
///
/// The handler receives the buffer by value and is expected to hand it back
/// with [`InputQueue::enqueue`] once it has read the samples. A buffer that
/// is not returned is gone from the pool for the rest of the session.
pub type BufferHandler = Box<dyn FnMut(PcmBuffer, &InputQueue) + Send + 'static>;

/// One pool region holding exactly one frame of 16-bit samples.
///
/// Not `Clone`: ownership moves between the hardware queue and the buffer
/// handler, so a region is never aliased.
#[derive(Debug)]
pub struct PcmBuffer {
    owner: u64,
    index: usize,
    samples: Box<[i16]>,
}

impl PcmBuffer {
    /// Position of this buffer in the pool (0..POOL_SIZE).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Counters shared between the device thread and the control side.
#[derive(Debug, Default)]
pub struct CaptureCounters {
    pub(crate) frames_delivered: AtomicU64,
    pub(crate) frames_without_callback: AtomicU64,
    pub(crate) samples_overrun: AtomicU64,
    pub(crate) samples_discarded: AtomicU64,
}

impl CaptureCounters {
    pub fn reset(&self) {
        self.frames_delivered.store(0, Ordering::Relaxed);
        self.frames_without_callback.store(0, Ordering::Relaxed);
        self.samples_overrun.store(0, Ordering::Relaxed);
        self.samples_discarded.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self, buffers_allocated: usize) -> CaptureDiagnostics {
        CaptureDiagnostics {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_without_callback: self.frames_without_callback.load(Ordering::Relaxed),
            samples_overrun: self.samples_overrun.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            buffers_allocated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueStatus {
    Created,
    Running,
    Paused,
    Stopped,
}

struct QueueState {
    status: QueueStatus,
    enqueued: VecDeque<PcmBuffer>,
    // Samples already written into the head of `enqueued`.
    fill: usize,
    allocated: usize,
    stale_since_pause: u64,
}

/// Hardware input queue: buffers awaiting fill, in FIFO order.
///
/// The device thread pushes raw samples with [`ingest`](Self::ingest). The
/// head buffer is filled first; once full it leaves the queue and is handed
/// to the buffer handler, which resubmits it at the tail. Deliveries are
/// serialized through the handler mutex, which also lets [`stop`](Self::stop)
/// wait out an in-flight delivery.
pub struct InputQueue {
    id: u64,
    format: StreamFormat,
    frame_length: usize,
    state: Mutex<QueueState>,
    handler: Mutex<BufferHandler>,
    counters: Arc<CaptureCounters>,
}

impl InputQueue {
    pub fn new(
        format: StreamFormat,
        frame_length: usize,
        handler: BufferHandler,
        counters: Arc<CaptureCounters>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
            format,
            frame_length,
            state: Mutex::new(QueueState {
                status: QueueStatus::Created,
                enqueued: VecDeque::with_capacity(POOL_SIZE),
                fill: 0,
                allocated: 0,
                stale_since_pause: 0,
            }),
            handler: Mutex::new(handler),
            counters,
        })
    }

    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Buffers allocated by this queue. Never exceeds [`POOL_SIZE`].
    pub fn allocated(&self) -> usize {
        self.state.lock().allocated
    }

    /// Buffers currently waiting to be filled.
    pub fn enqueued(&self) -> usize {
        self.state.lock().enqueued.len()
    }

    /// Allocate one zeroed pool buffer sized for a full frame.
    pub fn allocate_buffer(&self) -> Result<PcmBuffer, CaptureError> {
        let mut state = self.state.lock();
        if state.status == QueueStatus::Stopped {
            return Err(CaptureError::hardware("queue is stopped"));
        }
        if state.allocated >= POOL_SIZE {
            return Err(CaptureError::hardware(format!(
                "buffer pool exhausted ({POOL_SIZE} buffers)"
            )));
        }
        if self.frame_length > MAX_FRAME_LENGTH as usize {
            return Err(CaptureError::hardware(format!(
                "frame of {} samples exceeds the pool buffer limit",
                self.frame_length
            )));
        }

        let mut samples = Vec::new();
        samples.try_reserve_exact(self.frame_length).map_err(|e| {
            CaptureError::hardware(format!(
                "failed to allocate {} byte buffer: {}",
                self.frame_length * StreamFormat::BYTES_PER_SAMPLE,
                e
            ))
        })?;
        samples.resize(self.frame_length, 0);

        let index = state.allocated;
        state.allocated += 1;
        Ok(PcmBuffer {
            owner: self.id,
            index,
            samples: samples.into_boxed_slice(),
        })
    }

    /// Submit a buffer for filling. Buffers from another queue are refused.
    ///
    /// After [`stop`](Self::stop) the buffer is accepted and released.
    pub fn enqueue(&self, buffer: PcmBuffer) -> Result<(), CaptureError> {
        if buffer.owner != self.id {
            return Err(CaptureError::hardware(format!(
                "buffer {} does not belong to this queue",
                buffer.index
            )));
        }
        let mut state = self.state.lock();
        if state.status != QueueStatus::Stopped {
            state.enqueued.push_back(buffer);
        }
        Ok(())
    }

    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.status == QueueStatus::Created {
            state.status = QueueStatus::Running;
        }
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        if state.status == QueueStatus::Running {
            state.status = QueueStatus::Paused;
            state.stale_since_pause = 0;
        }
    }

    /// Resume filling. Returns the number of stale samples discarded while
    /// paused. A partially filled head buffer is kept.
    pub fn resume(&self) -> u64 {
        let mut state = self.state.lock();
        if state.status != QueueStatus::Paused {
            return 0;
        }
        state.status = QueueStatus::Running;
        std::mem::take(&mut state.stale_since_pause)
    }

    /// Drop the partial fill of the head buffer. Returns the samples lost.
    pub fn flush(&self) -> usize {
        std::mem::take(&mut self.state.lock().fill)
    }

    /// Stop accepting samples, wait for an in-flight delivery to return, then
    /// release every enqueued buffer. Returns the number released.
    ///
    /// Must not be called from inside the buffer handler.
    pub fn stop(&self) -> usize {
        {
            let mut state = self.state.lock();
            state.status = QueueStatus::Stopped;
            state.fill = 0;
        }
        drop(self.handler.lock());

        let mut state = self.state.lock();
        let released = state.enqueued.len();
        state.enqueued.clear();
        released
    }

    /// Copy raw samples from the device into the pool, delivering every
    /// buffer that fills up. Called on the device thread.
    pub fn ingest(&self, mut samples: &[i16]) {
        let mut handler = self.handler.lock();

        while !samples.is_empty() {
            let filled = {
                let mut guard = self.state.lock();
                let state = &mut *guard;

                match state.status {
                    QueueStatus::Running => {}
                    QueueStatus::Paused => {
                        state.stale_since_pause += samples.len() as u64;
                        self.discard(samples.len());
                        return;
                    }
                    QueueStatus::Created | QueueStatus::Stopped => {
                        self.discard(samples.len());
                        return;
                    }
                }

                let Some(head) = state.enqueued.front_mut() else {
                    self.counters
                        .samples_overrun
                        .fetch_add(samples.len() as u64, Ordering::Relaxed);
                    return;
                };

                let take = (self.frame_length - state.fill).min(samples.len());
                head.samples[state.fill..state.fill + take].copy_from_slice(&samples[..take]);
                samples = &samples[take..];
                state.fill += take;

                if state.fill == self.frame_length {
                    state.fill = 0;
                    state.enqueued.pop_front()
                } else {
                    None
                }
            };

            if let Some(buffer) = filled {
                (&mut *handler)(buffer, self);
            }
        }
    }

    fn discard(&self, count: usize) {
        self.counters
            .samples_discarded
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for InputQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InputQueue")
            .field("format", &self.format)
            .field("frame_length", &self.frame_length)
            .field("status", &state.status)
            .field("enqueued", &state.enqueued.len())
            .field("allocated", &state.allocated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_queue(frame_length: usize) -> (Arc<InputQueue>, Arc<Mutex<Vec<(usize, Vec<i16>)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: BufferHandler = Box::new(move |buffer: PcmBuffer, queue: &InputQueue| {
            sink.lock().push((buffer.index(), buffer.samples().to_vec()));
            queue.enqueue(buffer).unwrap();
        });
        let queue = InputQueue::new(
            StreamFormat::mono_pcm16(16000),
            frame_length,
            handler,
            Arc::new(CaptureCounters::default()),
        );
        for _ in 0..POOL_SIZE {
            let buffer = queue.allocate_buffer().unwrap();
            queue.enqueue(buffer).unwrap();
        }
        (queue, seen)
    }

    #[test]
    fn pool_is_bounded() {
        let (queue, _) = recording_queue(4);
        assert_eq!(queue.allocated(), POOL_SIZE);
        assert!(queue.allocate_buffer().unwrap_err().is_hardware());
    }

    #[test]
    fn oversized_frames_are_never_allocated() {
        let handler: BufferHandler = Box::new(|_buffer: PcmBuffer, _queue: &InputQueue| {});
        let queue = InputQueue::new(
            StreamFormat::mono_pcm16(16000),
            MAX_FRAME_LENGTH as usize + 1,
            handler,
            Arc::new(CaptureCounters::default()),
        );
        assert!(queue.allocate_buffer().unwrap_err().is_hardware());
        assert_eq!(queue.allocated(), 0);
    }

    #[test]
    fn ignores_samples_before_start() {
        let (queue, seen) = recording_queue(2);
        queue.ingest(&[1, 2, 3, 4]);
        assert!(seen.lock().is_empty());
        assert_eq!(queue.counters.samples_discarded.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn frames_split_across_ingests() {
        let (queue, seen) = recording_queue(3);
        queue.start();

        queue.ingest(&[1, 2]);
        assert!(seen.lock().is_empty());
        queue.ingest(&[3, 4, 5, 6, 7]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, vec![1, 2, 3]);
        assert_eq!(seen[1].1, vec![4, 5, 6]);
        assert_eq!(queue.enqueued(), POOL_SIZE);
    }

    #[test]
    fn buffers_cycle_in_fifo_order() {
        let (queue, seen) = recording_queue(1);
        queue.start();
        queue.ingest(&[10, 11, 12, 13, 14, 15, 16]);

        let indices: Vec<usize> = seen.lock().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(queue.allocated(), POOL_SIZE);
    }

    #[test]
    fn overrun_when_handler_keeps_buffers() {
        let handler: BufferHandler = Box::new(|_buffer: PcmBuffer, _queue: &InputQueue| {});
        let counters = Arc::new(CaptureCounters::default());
        let queue = InputQueue::new(
            StreamFormat::mono_pcm16(8000),
            2,
            handler,
            Arc::clone(&counters),
        );
        let buffer = queue.allocate_buffer().unwrap();
        queue.enqueue(buffer).unwrap();
        queue.start();

        queue.ingest(&[1, 2, 3, 4, 5]);
        assert_eq!(queue.enqueued(), 0);
        assert_eq!(counters.samples_overrun.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn paused_samples_are_stale_and_partial_fill_survives() {
        let (queue, seen) = recording_queue(4);
        queue.start();
        queue.ingest(&[1, 2]);

        queue.pause();
        queue.ingest(&[90, 91, 92]);
        assert_eq!(queue.resume(), 3);

        queue.ingest(&[3, 4]);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, vec![1, 2, 3, 4]);
    }

    #[test]
    fn flush_drops_partial_fill() {
        let (queue, seen) = recording_queue(4);
        queue.start();
        queue.ingest(&[1, 2, 3]);
        assert_eq!(queue.flush(), 3);

        queue.ingest(&[5, 6, 7, 8]);
        assert_eq!(seen.lock()[0].1, vec![5, 6, 7, 8]);
    }

    #[test]
    fn stop_releases_buffers_and_blocks_delivery() {
        let (queue, seen) = recording_queue(2);
        queue.start();
        queue.ingest(&[1, 2]);

        assert_eq!(queue.stop(), POOL_SIZE);
        assert_eq!(queue.enqueued(), 0);

        queue.ingest(&[3, 4, 5, 6]);
        assert_eq!(seen.lock().len(), 1);
        assert!(queue.allocate_buffer().is_err());
    }

    #[test]
    fn refuses_foreign_buffers() {
        let (queue, _) = recording_queue(2);

        let handler: BufferHandler = Box::new(|_buffer: PcmBuffer, _queue: &InputQueue| {});
        let other = InputQueue::new(
            StreamFormat::mono_pcm16(8000),
            2,
            handler,
            Arc::new(CaptureCounters::default()),
        );
        let foreign = other.allocate_buffer().unwrap();
        assert!(queue.enqueue(foreign).unwrap_err().is_hardware());
        assert_eq!(queue.enqueued(), POOL_SIZE);
    }
}
