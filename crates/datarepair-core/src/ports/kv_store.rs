//! KeyValueStore port - 順序付き KV ストア
//!
//! キューは専用サーバーを持たず、このポートを満たす任意のストアの上に載ります。
//!
//! # 実装
//! - **MemoryStore**: テスト用（fault injection 付き）
//! - **RocksStore**: CLI 用の永続ストア（RocksDB）

use std::sync::Arc;

use async_trait::async_trait;

/// Options for [`KeyValueStore::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum number of items to return. `0` means no limit.
    pub limit: usize,

    /// Whether to populate [`ListItem::value`].
    pub include_value: bool,
}

impl ListOptions {
    /// The smallest key only, with its value.
    pub fn first() -> Self {
        Self {
            limit: 1,
            include_value: true,
        }
    }
}

/// One entry returned by [`KeyValueStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
}

/// Store operations, used for error reporting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Put,
    Delete,
    List,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOp::Put => f.write_str("put"),
            StoreOp::Delete => f.write_str("delete"),
            StoreOp::List => f.write_str("list"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rocksdb error: {0}")]
    Rocks(#[from] rocksdb::Error),

    #[error("forced {0} error")]
    Forced(StoreOp),

    #[error("store operation failed: {0}")]
    OperationFailed(String),
}

/// Ordered key-value store with byte-string keys and values.
///
/// # 契約
/// - 個々の put / delete はアトミック
/// - `list` は昇順（バイト比較）で返す
/// - キー・値のスキーマは強制しない
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite `key`.
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove `key`. Removing an absent key is [`StoreError::KeyNotFound`].
    async fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// List entries in ascending key order over the full key range.
    async fn list(&self, opts: ListOptions) -> Result<Vec<ListItem>, StoreError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        (**self).delete(key).await
    }

    async fn list(&self, opts: ListOptions) -> Result<Vec<ListItem>, StoreError> {
        (**self).list(opts).await
    }
}
