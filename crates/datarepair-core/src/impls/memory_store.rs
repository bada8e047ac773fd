//! MemoryStore - テスト・開発用の順序付き KV ストア
//!
//! # 実装詳細
//! - BTreeMap<Vec<u8>, Vec<u8>> でバイト順を保証
//! - Mutex で排他制御（ロック中に await しない）
//! - fault injection: 次の n 回の操作、または特定操作の次の 1 回を失敗させる

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{KeyValueStore, ListItem, ListOptions, StoreError, StoreOp};

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Fail this many upcoming operations, whatever they are.
    force_error: usize,
    /// Fail this many upcoming operations of a given kind.
    op_faults: HashMap<StoreOp, usize>,
}

impl MemoryState {
    fn check(&mut self, op: StoreOp) -> Result<(), StoreError> {
        if self.force_error > 0 {
            self.force_error -= 1;
            return Err(StoreError::Forced(op));
        }
        if let Some(remaining) = self.op_faults.get_mut(&op)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(StoreError::Forced(op));
        }
        Ok(())
    }
}

/// In-memory ordered store.
///
/// # 使用例
/// ```ignore
/// let store = MemoryStore::new();
/// store.fail_next(StoreOp::Delete);
/// ```
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `n` operations fail, regardless of kind.
    pub fn force_error(&self, n: usize) {
        self.state().force_error += n;
    }

    /// Make the next operation of kind `op` fail.
    pub fn fail_next(&self, op: StoreOp) {
        *self.state().op_faults.entry(op).or_default() += 1;
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.state().entries.contains_key(key)
    }

    /// Snapshot of all keys in ascending order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.state().entries.keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut state = self.state();
        state.check(StoreOp::Put)?;
        state.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let mut state = self.state();
        state.check(StoreOp::Delete)?;
        state
            .entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::KeyNotFound(hex::encode(key)))
    }

    async fn list(&self, opts: ListOptions) -> Result<Vec<ListItem>, StoreError> {
        let mut state = self.state();
        state.check(StoreOp::List)?;
        let limit = if opts.limit == 0 {
            usize::MAX
        } else {
            opts.limit
        };
        Ok(state
            .entries
            .iter()
            .take(limit)
            .map(|(k, v)| ListItem {
                key: k.clone(),
                value: opts.include_value.then(|| v.clone()),
            })
            .collect())
    }
}
