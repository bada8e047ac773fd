//! Errors - エラーの運用分類
//!
//! 具体的なエラー型は [`crate::error::QueueError`] を参照。
//! ここでは呼び出し側が分岐に使う「種類」だけを定義します。

use std::fmt;

/// Operational classification of a queue failure.
///
/// - Randomness: key generation failed (entropy source or clock), nothing was written
/// - Encoding: a segment could not be encoded, or a stored value could not be decoded
/// - Store: the backing store rejected a put / delete / list
/// - EmptyQueue: dequeue found no entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Randomness,
    Encoding,
    Store,
    EmptyQueue,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Randomness => "randomness",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Store => "store",
            ErrorKind::EmptyQueue => "empty_queue",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
