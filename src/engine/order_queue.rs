use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::models::Order;

#[derive(Debug, Default)]
struct QueueInner {
    buf: VecDeque<Order>,
    closed: bool,
}

/// Thread-safe FIFO queue for pending orders
///
/// Producer-consumer hand-off between submitters and worker threads.
/// Shutdown is modeled as a closed flag: consumers drain whatever is still
/// buffered, then `pop` returns `None` instead of blocking forever.
#[derive(Debug, Default)]
pub struct OrderQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl OrderQueue {
    pub fn new() -> Self {
        OrderQueue {
            inner: Mutex::new(QueueInner::default()),
            available: Condvar::new(),
        }
    }

    /// Enqueue an order and wake one blocked consumer.
    ///
    /// Returns `false` (dropping the order) when the queue has been shut
    /// down; the engine's running flag normally prevents that path.
    pub fn push(&self, order: Order) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            inner.buf.push_back(order);
        }
        self.available.notify_one();
        true
    }

    /// Dequeue the next order, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is shut down and drained — the
    /// termination signal for worker loops.
    pub fn pop(&self) -> Option<Order> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(order) = inner.buf.pop_front() {
                return Some(order);
            }
            if inner.closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Non-blocking dequeue; `None` when nothing is buffered.
    pub fn try_pop(&self) -> Option<Order> {
        self.inner.lock().buf.pop_front()
    }

    /// Close the queue and wake every blocked consumer. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
        }
        self.available.notify_all();
    }

    /// Reactivate a queue that was shut down. Buffered orders, if any,
    /// are kept. Used by the engine when it is started again after a stop.
    pub(crate) fn reopen(&self) {
        self.inner.lock().closed = false;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().buf.is_empty()
    }
}
