use std::sync::Arc;

use crate::TcTransferFrame;

/// AD frames sent but not yet acknowledged, indexed by their sequence number
///
/// Outstanding frames occupy the slots from NN(R), the expected acknowledgement number, up to
/// but excluding V(S), the sequence number of the next new frame. Both wrap modulo 256.
#[derive(Debug)]
pub(super) struct SentQueue {
    slots: Box<[Option<SentFrame>; 256]>,
    /// NN(R)
    nn_r: u8,
    /// V(S)
    v_s: u8,
}

#[derive(Debug)]
struct SentFrame {
    frame: Arc<TcTransferFrame>,
    to_be_retransmitted: bool,
}

impl SentQueue {
    pub(super) fn new() -> Self {
        Self {
            slots: Box::new([const { None }; 256]),
            nn_r: 0,
            v_s: 0,
        }
    }

    pub(super) fn v_s(&self) -> u8 {
        self.v_s
    }

    pub(super) fn nn_r(&self) -> u8 {
        self.nn_r
    }

    pub(super) fn len(&self) -> usize {
        usize::from(self.v_s.wrapping_sub(self.nn_r))
    }

    pub(super) fn is_empty(&self) -> bool {
        self.nn_r == self.v_s
    }

    /// Whether `n_r` lies in the closed interval [NN(R), V(S)], modulo 256
    pub(super) fn is_valid_ack(&self, n_r: u8) -> bool {
        n_r.wrapping_sub(self.nn_r) <= self.v_s.wrapping_sub(self.nn_r)
    }

    /// Whether `seq` is an outstanding frame
    pub(super) fn is_outstanding(&self, seq: u8) -> bool {
        seq.wrapping_sub(self.nn_r) < self.v_s.wrapping_sub(self.nn_r)
    }

    /// Restart numbering at `v_s`, dropping every outstanding frame
    pub(super) fn reset(&mut self, v_s: u8) -> Vec<Arc<TcTransferFrame>> {
        let purged = self.drain();
        self.v_s = v_s;
        self.nn_r = v_s;
        purged
    }

    /// Append a frame built with sequence number V(S) and advance V(S)
    pub(super) fn push(&mut self, frame: Arc<TcTransferFrame>) {
        debug_assert_eq!(frame.seq(), self.v_s);
        debug_assert!(self.len() < 255, "sent queue overflow");
        self.slots[usize::from(self.v_s)] = Some(SentFrame {
            frame,
            to_be_retransmitted: false,
        });
        self.v_s = self.v_s.wrapping_add(1);
    }

    /// Remove the frames acknowledged by `n_r`, oldest first
    ///
    /// `n_r` must satisfy [`is_valid_ack`](Self::is_valid_ack).
    pub(super) fn acknowledge(&mut self, n_r: u8) -> Vec<Arc<TcTransferFrame>> {
        let mut acked = Vec::new();
        while self.nn_r != n_r {
            if let Some(sent) = self.slots[usize::from(self.nn_r)].take() {
                acked.push(sent.frame);
            }
            self.nn_r = self.nn_r.wrapping_add(1);
        }
        acked
    }

    /// Remove every outstanding frame, oldest first, leaving V(S) untouched
    pub(super) fn drain(&mut self) -> Vec<Arc<TcTransferFrame>> {
        let v_s = self.v_s;
        self.acknowledge(v_s)
    }

    /// Flag every outstanding frame for retransmission
    pub(super) fn mark_for_retransmission(&mut self) {
        let mut seq = self.nn_r;
        while seq != self.v_s {
            if let Some(sent) = &mut self.slots[usize::from(seq)] {
                sent.to_be_retransmitted = true;
            }
            seq = seq.wrapping_add(1);
        }
    }

    /// Take the oldest frame flagged for retransmission, clearing its flag
    pub(super) fn next_retransmission(&mut self) -> Option<Arc<TcTransferFrame>> {
        let mut seq = self.nn_r;
        while seq != self.v_s {
            if let Some(sent) = &mut self.slots[usize::from(seq)] {
                if sent.to_be_retransmitted {
                    sent.to_be_retransmitted = false;
                    return Some(sent.frame.clone());
                }
            }
            seq = seq.wrapping_add(1);
        }
        None
    }
}
