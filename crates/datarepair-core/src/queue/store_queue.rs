//! Store-backed repair queue.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::RepairQueue;
use crate::codec::SegmentCodec;
use crate::domain::InjuredSegment;
use crate::error::QueueError;
use crate::ports::{
    KeyGenerator, KeyValueStore, ListItem, ListOptions, SystemClock, TimestampKeyGenerator,
};

/// Repair queue on top of any ordered key-value store.
///
/// Design:
/// - Entries live only in the store (key = [`crate::domain::QueueKey`], value = encoded segment).
/// - One lock per instance serializes enqueue/dequeue made through *this* instance.
///   Separate instances (or processes) on the same store only get the store's
///   per-key atomicity, so two of them may dequeue the same entry.
/// - The lock is held across store I/O, hence the async mutex.
pub struct StoreQueue<S, G = TimestampKeyGenerator<SystemClock>> {
    lock: Mutex<()>,
    store: S,
    keys: G,
}

impl<S: KeyValueStore> StoreQueue<S> {
    pub fn new(store: S) -> Self {
        Self::with_key_generator(store, TimestampKeyGenerator::new(SystemClock))
    }
}

impl<S: KeyValueStore, G: KeyGenerator> StoreQueue<S, G> {
    pub fn with_key_generator(store: S, keys: G) -> Self {
        Self {
            lock: Mutex::new(()),
            store,
            keys,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: KeyValueStore, G: KeyGenerator> RepairQueue for StoreQueue<S, G> {
    async fn enqueue(&self, segment: &InjuredSegment) -> Result<(), QueueError> {
        let _guard = self.lock.lock().await;

        // Nothing is written unless key and value are both ready.
        let key = self.keys.generate()?;
        let value = SegmentCodec::encode(segment).map_err(QueueError::Encode)?;

        self.store
            .put(key.as_bytes(), &value)
            .await
            .map_err(QueueError::Put)?;

        tracing::debug!(%key, path = %segment.path(), "enqueued injured segment");
        Ok(())
    }

    async fn dequeue(&self) -> Result<InjuredSegment, QueueError> {
        let _guard = self.lock.lock().await;

        let items = self
            .store
            .list(ListOptions::first())
            .await
            .map_err(QueueError::List)?;
        let Some(ListItem { key, value }) = items.into_iter().next() else {
            return Err(QueueError::Empty);
        };

        let segment = match SegmentCodec::decode(value.as_deref().unwrap_or_default()) {
            Ok(segment) => segment,
            Err(source) => {
                // Left in place for inspection.
                let key = hex::encode(&key);
                tracing::warn!(%key, error = %source, "undecodable queue entry");
                return Err(QueueError::Decode { key, source });
            }
        };

        if let Err(source) = self.store.delete(&key).await {
            tracing::warn!(
                key = %hex::encode(&key),
                path = %segment.path(),
                error = %source,
                "dequeued segment could not be removed; it will be delivered again"
            );
            return Err(QueueError::Delete {
                segment: Box::new(segment),
                source,
            });
        }

        tracing::debug!(key = %hex::encode(&key), path = %segment.path(), "dequeued injured segment");
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, QueueKey};
    use crate::impls::{MemoryStore, RocksStore};
    use crate::ports::{Clock, FixedClock, KeyError, StoreError, StoreOp};
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Advances by one nanosecond on every reading.
    struct SteppingClock {
        next: AtomicI64,
    }

    impl SteppingClock {
        fn starting_at(nanos: i64) -> Self {
            Self {
                next: AtomicI64::new(nanos),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::<Utc>::from_timestamp_nanos(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    struct BrokenEntropy;

    impl KeyGenerator for BrokenEntropy {
        fn generate(&self) -> Result<QueueKey, KeyError> {
            Err(KeyError::Entropy(rand::Error::new(std::io::Error::other(
                "entropy source unavailable",
            ))))
        }
    }

    fn segment(i: i32) -> InjuredSegment {
        InjuredSegment::new(i.to_string(), vec![i])
    }

    #[rstest]
    #[case(InjuredSegment::new("abc", vec![]))]
    #[case(InjuredSegment::new("l/bucket/s3/object", vec![0, 5, 17, 29]))]
    #[case(InjuredSegment::new("パス/セグメント", vec![-1, i32::MAX]))]
    #[tokio::test]
    async fn enqueue_then_dequeue_returns_same_segment(#[case] seg: InjuredSegment) {
        let queue = StoreQueue::new(MemoryStore::new());

        queue.enqueue(&seg).await.unwrap();
        let got = queue.dequeue().await.unwrap();

        assert_eq!(got, seg);
        assert!(queue.store().is_empty());
    }

    #[tokio::test]
    async fn dequeue_on_empty_queue_is_empty_error() {
        let queue = StoreQueue::new(MemoryStore::new());

        let err = queue.dequeue().await.unwrap_err();
        assert!(err.is_empty_queue());
        assert_eq!(err.kind(), ErrorKind::EmptyQueue);
        assert!(err.recovered_segment().is_none());
    }

    #[tokio::test]
    async fn store_failure_on_dequeue_returns_no_segment() {
        let queue = StoreQueue::new(MemoryStore::new());
        queue
            .enqueue(&InjuredSegment::new("abc", vec![]))
            .await
            .unwrap();

        queue.store().force_error(1);
        let err = queue.dequeue().await.unwrap_err();

        assert!(matches!(err, QueueError::List(StoreError::Forced(StoreOp::List))));
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.recovered_segment().is_none());
        // Nothing fabricated, nothing lost.
        assert_eq!(queue.store().len(), 1);
        assert_eq!(
            queue.dequeue().await.unwrap(),
            InjuredSegment::new("abc", vec![])
        );
    }

    #[tokio::test]
    async fn store_failure_on_enqueue_publishes_nothing() {
        let queue = StoreQueue::new(MemoryStore::new());
        queue.store().fail_next(StoreOp::Put);

        let err = queue.enqueue(&segment(1)).await.unwrap_err();
        assert!(matches!(err, QueueError::Put(_)));
        assert!(queue.store().is_empty());
        assert!(queue.dequeue().await.unwrap_err().is_empty_queue());
    }

    #[tokio::test]
    async fn entropy_failure_aborts_before_write() {
        let queue = StoreQueue::with_key_generator(MemoryStore::new(), BrokenEntropy);

        let err = queue.enqueue(&segment(1)).await.unwrap_err();
        assert!(matches!(err, QueueError::KeyGeneration(KeyError::Entropy(_))));
        assert_eq!(err.kind(), ErrorKind::Randomness);
        assert!(queue.store().is_empty());
    }

    #[tokio::test]
    async fn sequential_dequeue_is_fifo() {
        const N: i32 = 100;
        let queue = StoreQueue::with_key_generator(
            MemoryStore::new(),
            TimestampKeyGenerator::new(SteppingClock::starting_at(1_700_000_000_000_000_000)),
        );

        for i in 0..N {
            queue.enqueue(&segment(i)).await.unwrap();
        }
        for i in 0..N {
            assert_eq!(queue.dequeue().await.unwrap(), segment(i));
        }
        assert!(queue.dequeue().await.unwrap_err().is_empty_queue());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_enqueue_and_dequeue_lose_nothing() {
        const N: i32 = 100;
        let queue = Arc::new(StoreQueue::new(MemoryStore::new()));

        let enqueues: Vec<_> = (0..N)
            .map(|i| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.enqueue(&segment(i)).await })
            })
            .collect();
        for handle in enqueues {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(queue.store().len(), N as usize);

        let dequeues: Vec<_> = (0..N)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.dequeue().await })
            })
            .collect();
        let mut markers = Vec::with_capacity(N as usize);
        for handle in dequeues {
            let seg = handle.await.unwrap().unwrap();
            markers.push(seg.lost_pieces()[0]);
        }

        markers.sort_unstable();
        assert_eq!(markers, (0..N).collect::<Vec<_>>());
        assert!(queue.store().is_empty());
    }

    #[tokio::test]
    async fn delete_failure_returns_segment_and_redelivers() {
        let queue = StoreQueue::new(MemoryStore::new());
        let seg = InjuredSegment::new("abc", vec![1, 2]);
        queue.enqueue(&seg).await.unwrap();

        queue.store().fail_next(StoreOp::Delete);
        let err = queue.dequeue().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        let first = err.into_recovered_segment().unwrap();
        assert_eq!(first, seg);
        assert_eq!(queue.store().len(), 1);

        let second = queue.dequeue().await.unwrap();
        assert_eq!(second, first);
        assert!(queue.store().is_empty());
    }

    #[tokio::test]
    async fn undecodable_entry_is_left_in_store() {
        let queue = StoreQueue::new(MemoryStore::new());
        let bad_key = QueueKey::new(0, [0; 4]);
        queue
            .store()
            .put(bad_key.as_bytes(), b"\x09garbage")
            .await
            .unwrap();
        queue.enqueue(&segment(1)).await.unwrap();

        let err = queue.dequeue().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(matches!(&err, QueueError::Decode { key, .. } if *key == bad_key.to_string()));
        assert!(queue.store().contains_key(bad_key.as_bytes()));
        assert_eq!(queue.store().len(), 2);
    }

    #[tokio::test]
    async fn stored_key_uses_timestamp_and_token_layout() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let queue = StoreQueue::with_key_generator(
            MemoryStore::new(),
            TimestampKeyGenerator::new(FixedClock::new(at)),
        );
        queue.enqueue(&segment(1)).await.unwrap();

        let keys = queue.store().keys();
        assert_eq!(keys.len(), 1);
        let key = QueueKey::try_from(keys[0].as_slice()).unwrap();
        assert_eq!(key.timestamp_nanos(), at.timestamp_nanos_opt().unwrap() as u64);
    }

    #[tokio::test]
    async fn instances_sharing_a_store_see_each_other() {
        let store = Arc::new(MemoryStore::new());
        let producer = StoreQueue::new(Arc::clone(&store));
        let worker = StoreQueue::new(Arc::clone(&store));

        producer.enqueue(&segment(7)).await.unwrap();
        assert_eq!(worker.dequeue().await.unwrap(), segment(7));
        assert!(producer.dequeue().await.unwrap_err().is_empty_queue());
    }

    #[tokio::test]
    async fn segments_survive_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue");
        let seg = InjuredSegment::new("l/bucket/s7", vec![2, 9]);

        {
            let queue = StoreQueue::new(RocksStore::open(&path).unwrap());
            queue.enqueue(&seg).await.unwrap();
        }

        let queue = StoreQueue::new(RocksStore::open(&path).unwrap());
        assert_eq!(queue.dequeue().await.unwrap(), seg);
        drop(queue);

        let queue = StoreQueue::new(RocksStore::open(&path).unwrap());
        assert!(queue.dequeue().await.unwrap_err().is_empty_queue());
    }

    #[tokio::test]
    async fn producer_and_worker_on_one_durable_store_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue");
        let store = RocksStore::open(&path).unwrap();
        let worker = StoreQueue::new(store.clone());
        let producer = StoreQueue::new(store.clone());

        // A second opener of the same directory is refused rather than
        // working from its own stale view.
        assert!(matches!(RocksStore::open(&path), Err(StoreError::Rocks(_))));

        worker.enqueue(&segment(1)).await.unwrap();
        producer.enqueue(&segment(2)).await.unwrap();

        let mut got = vec![
            worker.dequeue().await.unwrap(),
            worker.dequeue().await.unwrap(),
        ];
        got.sort_by_key(|s| s.lost_pieces()[0]);
        assert_eq!(got, vec![segment(1), segment(2)]);
        assert!(worker.dequeue().await.unwrap_err().is_empty_queue());

        producer.enqueue(&segment(3)).await.unwrap();
        drop((worker, producer, store));

        let reopened = StoreQueue::new(RocksStore::open(&path).unwrap());
        assert_eq!(reopened.dequeue().await.unwrap(), segment(3));
    }
}
