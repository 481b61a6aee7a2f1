use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Bounded multi-producer queue where a push never blocks: when full, the
/// oldest entry is discarded to make room for the newest.
#[derive(Debug)]
pub struct DropOldestQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> Clone for DropOldestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);

        Self { tx, rx, capacity }
    }

    /// Enqueues `item`, returning whatever was dropped to make room.
    pub fn push(&self, item: T) -> Option<T> {
        let mut item = item;
        let mut dropped = None;

        loop {
            match self.tx.try_send(item) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(back)) => {
                    item = back;
                    // a concurrent consumer may have drained it already
                    if let Ok(old) = self.rx.try_recv() {
                        dropped = Some(old);
                    }
                }
                // both ends are owned here, the channel cannot disconnect
                Err(TrySendError::Disconnected(back)) => return Some(back),
            }
        }
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discards everything queued, returning how many entries were dropped.
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }
}
