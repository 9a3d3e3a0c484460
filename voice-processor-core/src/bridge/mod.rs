//! Host-facing plumbing around the voice processor: method-call dispatch,
//! the frame event sink and the interruption broadcaster.

pub mod channel_sink;
pub mod dispatch;
pub mod interruption_center;
