//! SegmentCodec - InjuredSegment とストア値の相互変換
//!
//! # フォーマット
//! - `[0]`: フォーマットバージョン（現在は 1）
//! - `[1..]`: bincode (1.x, default options) でエンコードした InjuredSegment
//!
//! 既存データとの互換性のため、バージョン 1 のレイアウトは変更しないこと。

use crate::domain::InjuredSegment;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("decode failed: {0}")]
    Decode(#[source] bincode::Error),

    #[error("empty payload")]
    Empty,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
}

/// Versioned binary codec for queue values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentCodec;

impl SegmentCodec {
    pub const VERSION: u8 = 1;

    pub fn encode(segment: &InjuredSegment) -> Result<Vec<u8>, CodecError> {
        let body = bincode::serialize(segment).map_err(CodecError::Encode)?;
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(Self::VERSION);
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<InjuredSegment, CodecError> {
        let (&version, body) = bytes.split_first().ok_or(CodecError::Empty)?;
        if version != Self::VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        bincode::deserialize(body).map_err(CodecError::Decode)
    }
}
