//! Admission control for generation requests.
//!
//! Every generation passes through one shared [`GenerationGate`]. The gate
//! admits at most `capacity` requests at a time, in arrival order, and
//! keeps waiting and in-flight gauges for diagnostics.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

/// FIFO-fair bounded concurrency around the generation backend.
#[derive(Debug)]
pub struct GenerationGate {
    permits: Semaphore,
    capacity: usize,
    waiting: AtomicUsize,
    in_flight: AtomicUsize,
}

impl GenerationGate {
    /// A gate admitting `capacity` generations at once (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            waiting: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Wait for a turn. The returned pass frees the slot when dropped.
    pub async fn admit(&self, model: &str) -> GatePass<'_> {
        let permit = {
            let _waiting = Gauge::raise(&self.waiting);
            debug!(
                model,
                waiting = self.waiting(),
                in_flight = self.in_flight(),
                "generation queued"
            );
            self.permits.acquire().await.ok()
        };
        let pass = GatePass {
            _permit: permit,
            _in_flight: Gauge::raise(&self.in_flight),
        };
        debug!(
            model,
            waiting = self.waiting(),
            in_flight = self.in_flight(),
            "generation started"
        );
        pass
    }

    /// Generations allowed at once.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Requests currently generating.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

/// A held generation slot.
#[derive(Debug)]
pub struct GatePass<'a> {
    _permit: Option<SemaphorePermit<'a>>,
    _in_flight: Gauge<'a>,
}

/// Counter raised for as long as the guard lives.
#[derive(Debug)]
struct Gauge<'a>(&'a AtomicUsize);

impl<'a> Gauge<'a> {
    fn raise(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for Gauge<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn single_slot_serializes_in_arrival_order() {
        let gate = Arc::new(GenerationGate::new(1));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = gate.admit("first").await;
        let mut tasks = Vec::new();
        for name in ["second", "third"] {
            let gate = Arc::clone(&gate);
            let order = Arc::clone(&order);
            tasks.push(tokio::spawn(async move {
                let _pass = gate.admit(name).await;
                order.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(name);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }));
            tokio::task::yield_now().await;
        }

        assert_eq!(gate.waiting(), 2);
        assert_eq!(gate.in_flight(), 1);
        drop(first);

        for task in tasks {
            let _ = task.await;
        }
        assert_eq!(
            *order.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            vec!["second", "third"]
        );
        assert_eq!(gate.waiting(), 0);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancelled_wait_lowers_the_gauge() {
        let gate = GenerationGate::new(1);
        let held = gate.admit("held").await;
        let attempt = tokio::time::timeout(Duration::from_millis(5), gate.admit("late")).await;
        assert!(attempt.is_err());
        assert_eq!(gate.waiting(), 0);
        drop(held);
        assert_eq!(gate.capacity(), 1);
    }
}
