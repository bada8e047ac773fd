//! Ports - 抽象化レイヤー
//!
//! キューが依存する外部要素（順序付き KV ストア、時計、キー生成）の
//! インターフェースを定義し、実装の詳細を隠蔽します。

pub mod clock;
pub mod key_generator;
pub mod kv_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::key_generator::{KeyError, KeyGenerator, TimestampKeyGenerator};
pub use self::kv_store::{KeyValueStore, ListItem, ListOptions, StoreError, StoreOp};
