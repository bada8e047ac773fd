//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **MemoryStore**: テスト用の順序付き KV ストア（fault injection 付き）
//! - **RocksStore**: RocksDB に永続化する KV ストア（CLI 用）
//!
//! 本番の分散 KV ストアは別クレートで `KeyValueStore` を実装する想定です。

pub mod memory_store;
pub mod rocks_store;

pub use self::memory_store::MemoryStore;
pub use self::rocks_store::RocksStore;
