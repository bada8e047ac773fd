//! datarepair-core
//!
//! Durable repair queue for injured segments.
//!
//! # モジュール構成
//! - **domain**: InjuredSegment, QueueKey, ErrorKind
//! - **ports**: 抽象化レイヤー（KeyValueStore, Clock, KeyGenerator）
//! - **impls**: ports の実装（MemoryStore, RocksStore）
//! - **codec**: InjuredSegment のバージョン付きバイナリ表現
//! - **queue**: RepairQueue trait + StoreQueue
//! - **worker**: dequeue → repair を回す WorkerGroup
//! - **config** / **observability**: 設定とログ

pub mod domain;
pub mod ports;
pub mod impls;
pub mod codec;
pub mod config;
pub mod error;
pub mod observability;
pub mod queue;
pub mod worker;

pub use crate::domain::InjuredSegment;
pub use crate::error::QueueError;
pub use crate::queue::{RepairQueue, StoreQueue};
