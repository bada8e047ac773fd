//! KeyGenerator port - 順序キーの生成
//!
//! 中央のシーケンサーなしで「ほぼ時刻順・衝突しにくい」キーを作るための
//! インターフェースです。テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **TimestampKeyGenerator**: 時刻（ns）+ OsRng の 4 byte トークン（本番用）

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::domain::key::{QueueKey, TOKEN_LEN};
use crate::ports::Clock;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("error creating random token: {0}")]
    Entropy(#[from] rand::Error),

    #[error("clock reading {0} is outside the key timestamp range")]
    ClockOutOfRange(DateTime<Utc>),
}

/// KeyGenerator は分散環境で調整なしに使えるキーを生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Result<QueueKey, KeyError>;
}

/// Clock nanos ‖ 4 bytes from the OS CSPRNG.
///
/// 同一 tick 内の衝突はトークンで回避しますが、マシン間の時計ずれは
/// 補正しません（順序は best-effort）。
#[derive(Debug, Clone, Default)]
pub struct TimestampKeyGenerator<C> {
    clock: C,
}

impl<C: Clock> TimestampKeyGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> KeyGenerator for TimestampKeyGenerator<C> {
    fn generate(&self) -> Result<QueueKey, KeyError> {
        let now = self.clock.now();
        let nanos = now
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(KeyError::ClockOutOfRange(now))?;

        let mut token = [0u8; TOKEN_LEN];
        OsRng.try_fill_bytes(&mut token)?;

        Ok(QueueKey::new(nanos, token))
    }
}
