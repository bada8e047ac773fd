//! QueueKey - キューエントリの順序キー
//!
//! # レイアウト（12 bytes, 互換性のため固定）
//! - `[0..8]`: 作成時刻（Unix epoch からのナノ秒, big-endian u64）
//! - `[8..12]`: ランダムトークン（同一時刻の衝突回避）
//!
//! Big-endian なので、ストアのバイト順ソートがそのまま時刻順になります。
//! ただし時刻はマシンごとの時計に依存するため、順序は best-effort です。

use std::fmt;

/// Width of the timestamp prefix.
pub const TIMESTAMP_LEN: usize = 8;

/// Width of the random suffix.
pub const TOKEN_LEN: usize = 4;

/// Total key width.
pub const KEY_LEN: usize = TIMESTAMP_LEN + TOKEN_LEN;

/// Ordering token of a queue entry: timestamp ‖ random suffix.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey([u8; KEY_LEN]);

impl QueueKey {
    pub fn new(timestamp_nanos: u64, token: [u8; TOKEN_LEN]) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        bytes[..TIMESTAMP_LEN].copy_from_slice(&timestamp_nanos.to_be_bytes());
        bytes[TIMESTAMP_LEN..].copy_from_slice(&token);
        Self(bytes)
    }

    pub fn timestamp_nanos(&self) -> u64 {
        let mut ts = [0u8; TIMESTAMP_LEN];
        ts.copy_from_slice(&self.0[..TIMESTAMP_LEN]);
        u64::from_be_bytes(ts)
    }

    pub fn token(&self) -> [u8; TOKEN_LEN] {
        let mut token = [0u8; TOKEN_LEN];
        token.copy_from_slice(&self.0[TIMESTAMP_LEN..]);
        token
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Returned when a stored key is not exactly [`KEY_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid queue key length: expected 12 bytes, got {0}")]
pub struct InvalidKeyLength(pub usize);

impl TryFrom<&[u8]> for QueueKey {
    type Error = InvalidKeyLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| InvalidKeyLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for QueueKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
