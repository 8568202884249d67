/// Bounded per-observer outbound queue
///
/// The hub pushes envelopes without waiting; the connection task drains
/// them onto the socket. When the queue is full the configured
/// `OverflowPolicy` decides between evicting the oldest envelope and
/// refusing the push (the hub then closes that observer).
use super::message::BroadcastEnvelope;
use crate::config::OverflowPolicy;
use crate::errors::ConnectionError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use super::hub::ConnectionId;

/// Result of a successful push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the oldest pending envelope
    DroppedOldest,
}

struct QueueShared {
    conn_id: ConnectionId,
    capacity: usize,
    policy: OverflowPolicy,
    queue: Mutex<VecDeque<BroadcastEnvelope>>,
    notify: Notify,
    closed: AtomicBool,
}

/// Producer half, held by the hub
pub struct OutboundSender {
    shared: Arc<QueueShared>,
}

/// Consumer half, owned by the connection task
///
/// Dropping it closes the queue so later pushes fail.
pub struct OutboundReceiver {
    shared: Arc<QueueShared>,
}

/// Create a queue for one observer
pub fn outbound_queue(
    conn_id: ConnectionId,
    capacity: usize,
    policy: OverflowPolicy,
) -> (OutboundSender, OutboundReceiver) {
    let shared = Arc::new(QueueShared {
        conn_id,
        capacity: capacity.max(1),
        policy,
        queue: Mutex::new(VecDeque::new()),
        notify: Notify::new(),
        closed: AtomicBool::new(false),
    });

    (
        OutboundSender {
            shared: Arc::clone(&shared),
        },
        OutboundReceiver { shared },
    )
}

impl OutboundSender {
    pub fn push(&self, envelope: BroadcastEnvelope) -> Result<PushOutcome, ConnectionError> {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed(shared.conn_id));
        }

        let outcome = {
            let mut queue = shared.queue.lock();
            if queue.len() >= shared.capacity {
                match shared.policy {
                    OverflowPolicy::DropOldest => {
                        queue.pop_front();
                        queue.push_back(envelope);
                        PushOutcome::DroppedOldest
                    }
                    OverflowPolicy::Disconnect => {
                        drop(queue);
                        self.close();
                        return Err(ConnectionError::Overflow(shared.conn_id));
                    }
                }
            } else {
                queue.push_back(envelope);
                PushOutcome::Queued
            }
        };

        shared.notify.notify_one();
        Ok(outcome)
    }

    /// Stop the queue; the receiver yields `None` from now on
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Envelopes waiting to be written
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutboundReceiver {
    /// Wait for the next envelope, `None` once the queue is closed
    pub async fn recv(&mut self) -> Option<BroadcastEnvelope> {
        loop {
            if self.shared.closed.load(Ordering::Acquire) {
                return None;
            }
            if let Some(envelope) = self.try_recv() {
                return Some(envelope);
            }
            self.shared.notify.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<BroadcastEnvelope> {
        self.shared.queue.lock().pop_front()
    }
}

impl Drop for OutboundReceiver {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(n: u64) -> BroadcastEnvelope {
        BroadcastEnvelope::iot(format!("[{}]", n))
    }

    #[tokio::test]
    async fn test_fifo_delivery() {
        let (tx, mut rx) = outbound_queue(1, 4, OverflowPolicy::DropOldest);
        tx.push(envelope(1)).unwrap();
        tx.push(envelope(2)).unwrap();
        assert_eq!(rx.recv().await, Some(envelope(1)));
        assert_eq!(rx.recv().await, Some(envelope(2)));
    }

    #[tokio::test]
    async fn test_drop_oldest_keeps_newest() {
        let (tx, mut rx) = outbound_queue(1, 2, OverflowPolicy::DropOldest);
        assert_eq!(tx.push(envelope(1)).unwrap(), PushOutcome::Queued);
        assert_eq!(tx.push(envelope(2)).unwrap(), PushOutcome::Queued);
        assert_eq!(tx.push(envelope(3)).unwrap(), PushOutcome::DroppedOldest);
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.try_recv(), Some(envelope(2)));
        assert_eq!(rx.try_recv(), Some(envelope(3)));
    }

    #[tokio::test]
    async fn test_disconnect_policy_closes_queue() {
        let (tx, mut rx) = outbound_queue(7, 1, OverflowPolicy::Disconnect);
        tx.push(envelope(1)).unwrap();
        assert_eq!(tx.push(envelope(2)), Err(ConnectionError::Overflow(7)));
        assert!(tx.is_closed());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_receiver_rejects_pushes() {
        let (tx, rx) = outbound_queue(3, 4, OverflowPolicy::DropOldest);
        drop(rx);
        assert_eq!(tx.push(envelope(1)), Err(ConnectionError::Closed(3)));
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let (tx, mut rx) = outbound_queue(1, 4, OverflowPolicy::DropOldest);
        let reader = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        tx.push(envelope(9)).unwrap();
        assert_eq!(reader.await.unwrap(), Some(envelope(9)));
    }
}
