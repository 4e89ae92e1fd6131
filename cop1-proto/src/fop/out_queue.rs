use std::{collections::VecDeque, sync::Arc};

use crate::{FrameType, TcTransferFrame};

/// Bounded queue of frames waiting for the transmission channel
#[derive(Debug)]
pub(super) struct OutQueue {
    frames: VecDeque<Arc<TcTransferFrame>>,
    capacity: usize,
}

impl OutQueue {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, handing it back if the queue is full
    pub(super) fn push(
        &mut self,
        frame: Arc<TcTransferFrame>,
    ) -> Result<(), Arc<TcTransferFrame>> {
        if self.is_full() {
            return Err(frame);
        }
        self.frames.push_back(frame);
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Option<Arc<TcTransferFrame>> {
        self.frames.pop_front()
    }

    pub(super) fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    pub(super) fn len(&self) -> usize {
        self.frames.len()
    }

    /// Drop every queued frame of the given type, returning whether any was found
    pub(super) fn remove_type(&mut self, frame_type: FrameType) -> bool {
        let before = self.frames.len();
        self.frames.retain(|f| f.frame_type() != frame_type);
        before != self.frames.len()
    }
}
