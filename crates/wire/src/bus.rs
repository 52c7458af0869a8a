// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed pub/sub event bus (spec §4.H).
//!
//! Delivery is at-least-once to local subscribers; subscribers must be
//! idempotent. Ordering is preserved per routing key (scan id or finding
//! id). Slow subscribers apply backpressure by shedding the oldest queued
//! message rather than ever blocking the publisher.

use crate::envelope::Envelope;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use warden_core::KernelEvent;

/// Default bound on a subscriber's pending-message queue before the bus
/// starts shedding the oldest entries (spec §4.H "Slow subscribers apply
/// backpressure by shedding (drop-oldest)").
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

/// A subscriber's handle; `recv`/`try_recv` pull envelopes in publish
/// order. Dropping the handle unregisters it from the bus on its next
/// publish (lazily, via a dead `Weak` upgrade failing).
pub struct Subscription {
    mailbox: Arc<Mailbox>,
}

impl Subscription {
    pub async fn recv(&self) -> Envelope {
        loop {
            if let Some(env) = self.mailbox.queue.lock().pop_front() {
                return env;
            }
            self.mailbox.notify.notified().await;
        }
    }

    pub fn try_recv(&self) -> Option<Envelope> {
        self.mailbox.queue.lock().pop_front()
    }

    /// Count of messages shed for this subscriber due to backpressure,
    /// exposed so callers can surface the "warning metric" spec §4.H asks
    /// for without the bus itself depending on a metrics crate.
    pub fn dropped_count(&self) -> u64 {
        self.mailbox.dropped.load(Ordering::Relaxed)
    }
}

pub trait EventBus: Send + Sync {
    fn publish(&self, system_id: &str, event: KernelEvent) -> Envelope;
    fn subscribe(&self) -> Subscription;
}

/// In-process implementation: each subscriber owns a bounded ring buffer;
/// publishing pushes to every live subscriber under its own lock (so one
/// slow subscriber's lock contention never affects another's delivery
/// order — only its own queue sheds).
pub struct InMemoryEventBus {
    seq: AtomicU64,
    subscribers: Mutex<Vec<std::sync::Weak<Mailbox>>>,
    capacity: usize,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seq: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
            capacity,
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, system_id: &str, event: KernelEvent) -> Envelope {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = Envelope::new(seq, system_id, event, chrono::Utc::now());

        let mut subs = self.subscribers.lock();
        subs.retain(|weak| {
            let Some(mailbox) = weak.upgrade() else {
                return false;
            };
            let mut queue = mailbox.queue.lock();
            if queue.len() >= mailbox.capacity {
                queue.pop_front();
                let dropped = mailbox.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(capacity = mailbox.capacity, dropped, "subscriber queue full, dropping oldest envelope");
            }
            queue.push_back(envelope.clone());
            drop(queue);
            mailbox.notify.notify_waiters();
            true
        });
        envelope
    }

    fn subscribe(&self) -> Subscription {
        let mailbox = Arc::new(Mailbox {
            queue: Mutex::new(VecDeque::new()),
            capacity: self.capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        });
        self.subscribers.lock().push(Arc::downgrade(&mailbox));
        Subscription { mailbox }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ScanId;

    fn ev() -> KernelEvent {
        KernelEvent::ScanCancelled {
            scan_id: ScanId::new(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_events_in_order() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe();
        let e1 = bus.publish("sys-1", ev());
        let e2 = bus.publish("sys-1", ev());

        let r1 = sub.recv().await;
        let r2 = sub.recv().await;
        assert_eq!(r1.seq, e1.seq);
        assert_eq!(r2.seq, e2.seq);
        assert!(r1.seq < r2.seq);
    }

    #[test]
    fn full_queue_drops_oldest_not_newest() {
        let bus = InMemoryEventBus::with_capacity(2);
        let sub = bus.subscribe();
        bus.publish("sys-1", ev());
        bus.publish("sys-1", ev());
        bus.publish("sys-1", ev());

        assert_eq!(sub.dropped_count(), 1);
        let first = sub.try_recv().unwrap();
        let second = sub.try_recv().unwrap();
        assert!(sub.try_recv().is_none());
        assert!(first.seq < second.seq);
    }

    #[test]
    fn publish_never_blocks_on_a_dropped_subscriber() {
        let bus = InMemoryEventBus::new();
        {
            let _sub = bus.subscribe();
        }
        // subscriber handle dropped; publish should simply prune it
        bus.publish("sys-1", ev());
        assert_eq!(bus.subscribers.lock().len(), 0);
    }
}
