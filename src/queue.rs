//! Shared work queue.
//!
//! A multi-producer, multi-consumer queue backed by an `mpsc` channel whose
//! receiving end sits behind a mutex. `try_pop` takes the lock only for the
//! test-and-take itself, so each item is handed to exactly one caller and
//! nothing long-running ever happens under the lock.
//!
//! The queue is populated before any worker starts. `try_pop` returning
//! `None` is then the terminal "drained" state: nothing will be pushed later.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

pub struct WorkQueue<T> {
    sender: Sender<T>,
    receiver: Mutex<Receiver<T>>,
    pending: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, item: T) {
        // Counted before sending so a concurrent pop never sees the item
        // without its count. The receiver lives as long as `self`, so the
        // send cannot fail in practice.
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(item).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Take the next item, or `None` once the queue is drained.
    pub fn try_pop(&self) -> Option<T> {
        let receiver = match self.receiver.lock() {
            Ok(guard) => guard,
            // A worker panicked while popping; the channel itself is intact.
            Err(poisoned) => poisoned.into_inner(),
        };
        match receiver.try_recv() {
            Ok(item) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Some(item)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Number of items not yet popped.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let queue = Self::new();
        for item in iter {
            queue.push(item);
        }
        queue
    }
}
