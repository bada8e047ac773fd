//! InjuredSegment - 修復待ちセグメント
//!
//! The queue never inspects these fields; it only encodes and decodes them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A data segment with missing or damaged erasure-coded pieces.
///
/// `Default` is the "zero value" (empty path, no pieces).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InjuredSegment {
    /// Segment path / identifier.
    path: String,

    /// Indices of the pieces that are missing or damaged.
    lost_pieces: Vec<i32>,
}

impl InjuredSegment {
    pub fn new(path: impl Into<String>, lost_pieces: Vec<i32>) -> Self {
        Self {
            path: path.into(),
            lost_pieces,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn lost_pieces(&self) -> &[i32] {
        &self.lost_pieces
    }
}

impl fmt::Display for InjuredSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (lost pieces: {:?})", self.path, self.lost_pieces)
    }
}
