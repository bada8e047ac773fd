//! Queue module: the repair queue port and its store-backed implementation.

mod store_queue;

pub use store_queue::StoreQueue;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::InjuredSegment;
use crate::error::QueueError;

/// Repair queue port (interface).
///
/// Design intent:
/// - Producer (checker) calls `enqueue`, workers call `dequeue`.
/// - No peek / length / bulk operations.
/// - Delivery is at-least-once: a failed delete after a successful read hands the
///   segment back inside [`QueueError::Delete`] and the entry stays queued.
#[async_trait]
pub trait RepairQueue: Send + Sync {
    /// Durably add a segment to the queue.
    async fn enqueue(&self, segment: &InjuredSegment) -> Result<(), QueueError>;

    /// Remove and return the oldest segment (best-effort time order).
    async fn dequeue(&self) -> Result<InjuredSegment, QueueError>;
}

#[async_trait]
impl<Q: RepairQueue + ?Sized> RepairQueue for Arc<Q> {
    async fn enqueue(&self, segment: &InjuredSegment) -> Result<(), QueueError> {
        (**self).enqueue(segment).await
    }

    async fn dequeue(&self) -> Result<InjuredSegment, QueueError> {
        (**self).dequeue().await
    }
}
