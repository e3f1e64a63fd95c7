//! FIFO buffer of subscription intent produced while the connection is down

use std::collections::VecDeque;

use crate::frame::OutgoingFrame;

/// Unbounded outbound queue.
///
/// Frames are flushed in insertion order on the next Open. A frame that is
/// lost after draining is not retried on its own; active-channel replay
/// re-derives subscription state on the following Open.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<OutgoingFrame>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, frame: OutgoingFrame) {
        self.frames.push_back(frame);
    }

    /// Remove and return every queued frame, oldest first
    pub fn drain(&mut self) -> Vec<OutgoingFrame> {
        self.frames.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
