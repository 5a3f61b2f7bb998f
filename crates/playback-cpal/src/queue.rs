//! Bounded sample handoff between `play` and the device callback.
//!
//! `play` pushes without blocking (backpressure is the caller's signal),
//! the CPAL callback pops without blocking, and `drain` waits until the
//! callback has taken everything. The bound caps memory and latency; it is
//! adjusted when a stream opens with a new format.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Bounded queue of interleaved `f32` samples.
pub struct SampleQueue {
    inner: Mutex<VecDeque<f32>>,
    emptied: Condvar,
    max_samples: AtomicUsize,
}

impl SampleQueue {
    pub fn new(max_samples: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            emptied: Condvar::new(),
            max_samples: AtomicUsize::new(max_samples),
        }
    }

    /// Resize the bound. Already-queued samples are kept even if they exceed
    /// the new bound; only future pushes are constrained.
    pub fn set_max_samples(&self, max_samples: usize) {
        self.max_samples.store(max_samples.max(1), Ordering::Relaxed);
    }

    /// Append all of `samples`, or nothing if the bound would be exceeded.
    pub fn try_push(&self, samples: &[f32]) -> bool {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() + samples.len() > self.max_samples.load(Ordering::Relaxed) {
            return false;
        }
        queue.extend(samples.iter().copied());
        true
    }

    /// Move up to `max` samples into `out`. Never blocks; returns the number
    /// taken (0 when empty).
    pub fn pop_up_to(&self, max: usize, out: &mut Vec<f32>) -> usize {
        let mut queue = self.inner.lock().unwrap();
        let take = max.min(queue.len());
        out.extend(queue.drain(..take));
        if queue.is_empty() {
            self.emptied.notify_all();
        }
        take
    }

    /// Buffered sample count (best-effort snapshot).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Discard everything and wake drain waiters.
    pub fn clear(&self) {
        let mut queue = self.inner.lock().unwrap();
        queue.clear();
        self.emptied.notify_all();
    }

    /// Wait until the queue is empty, up to `timeout`. Returns whether it
    /// emptied in time.
    pub fn wait_empty(&self, timeout: Duration) -> bool {
        let queue = self.inner.lock().unwrap();
        let (queue, _result) = self
            .emptied
            .wait_timeout_while(queue, timeout, |queue| !queue.is_empty())
            .unwrap();
        queue.is_empty()
    }
}
