/// External consumer of captured frames (the event channel).
///
/// Called on the device thread with an owned copy of each frame.
/// Implementations should hand the frame off quickly. Querying the
/// processor (`state`, `session`, `diagnostics`) is fine; starting or
/// stopping it from here deadlocks.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: Vec<i16>);
}

impl<F> FrameSink for F
where
    F: Fn(Vec<i16>) + Send + Sync,
{
    fn on_frame(&self, frame: Vec<i16>) {
        self(frame)
    }
}
