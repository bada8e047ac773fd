//! RocksStore - RocksDB 上の永続 KV ストア
//!
//! CLI がプロセス再起動をまたいでキューを保持するためのストアです。
//!
//! # 実装詳細
//! - キーはそのまま RocksDB のキー（デフォルトのバイト順比較 = キューの順序）
//! - put / delete は sync 書き込み（WAL を fsync してから返る）
//! - RocksDB の呼び出しはブロッキングなので spawn_blocking で実行
//! - 同じディレクトリを開けるのは 1 プロセス（1 ハンドル）だけ。
//!   2 つ目の open は LOCK ファイルで失敗する。共有したい場合は clone したハンドルを渡す

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{DB, IteratorMode, Options, WriteOptions};

use crate::ports::{KeyValueStore, ListItem, ListOptions, StoreError};

fn db_options() -> Options {
    let mut opts = Options::default();
    opts.create_if_missing(true);
    opts
}

fn sync_write() -> WriteOptions {
    let mut opts = WriteOptions::default();
    opts.set_sync(true);
    opts
}

/// Durable store backed by a RocksDB directory.
///
/// Cloning shares the same open database.
#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
    path: Arc<PathBuf>,
}

impl RocksStore {
    /// Open (or create) the database at `path`.
    ///
    /// Blocking. Fails if another handle already holds the database lock.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let db = DB::open(&db_options(), &path)?;
        tracing::debug!(path = %path.display(), "opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&DB) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::OperationFailed(format!("rocksdb task failed: {e}")))?
    }
}

#[async_trait]
impl KeyValueStore for RocksStore {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let key = key.to_vec();
        let value = value.to_vec();
        self.blocking(move |db| Ok(db.put_opt(&key, &value, &sync_write())?))
            .await
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let key = key.to_vec();
        self.blocking(move |db| {
            // RocksDB の delete は存在しないキーでも成功するので先に確認する
            if db.get_pinned(&key)?.is_none() {
                return Err(StoreError::KeyNotFound(hex::encode(&key)));
            }
            Ok(db.delete_opt(&key, &sync_write())?)
        })
        .await
    }

    async fn list(&self, opts: ListOptions) -> Result<Vec<ListItem>, StoreError> {
        self.blocking(move |db| {
            let limit = if opts.limit == 0 {
                usize::MAX
            } else {
                opts.limit
            };
            db.iterator(IteratorMode::Start)
                .take(limit)
                .map(|item| -> Result<ListItem, StoreError> {
                    let (key, value) = item?;
                    Ok(ListItem {
                        key: key.into_vec(),
                        value: opts.include_value.then(|| value.into_vec()),
                    })
                })
                .collect()
        })
        .await
    }
}
