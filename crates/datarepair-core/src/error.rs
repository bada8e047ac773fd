use thiserror::Error;

use crate::codec::CodecError;
use crate::domain::{ErrorKind, InjuredSegment};
use crate::ports::{KeyError, StoreError};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("error creating queue key: {0}")]
    KeyGeneration(#[from] KeyError),

    #[error("error marshalling injured segment: {0}")]
    Encode(#[source] CodecError),

    #[error("error unmarshalling segment at key {key}: {source}")]
    Decode {
        /// Hex encoding of the offending key (left in the store).
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("error adding injured segment to queue: {0}")]
    Put(#[source] StoreError),

    #[error("error getting first key: {0}")]
    List(#[source] StoreError),

    /// The segment was read and decoded, but its entry could not be removed.
    /// The entry stays in the store and will be delivered again.
    #[error("error removing injured segment {}: {source}", .segment.path())]
    Delete {
        segment: Box<InjuredSegment>,
        #[source]
        source: StoreError,
    },

    #[error("empty queue")]
    Empty,
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::KeyGeneration(_) => ErrorKind::Randomness,
            QueueError::Encode(_) | QueueError::Decode { .. } => ErrorKind::Encoding,
            QueueError::Put(_) | QueueError::List(_) | QueueError::Delete { .. } => {
                ErrorKind::Store
            }
            QueueError::Empty => ErrorKind::EmptyQueue,
        }
    }

    pub fn is_empty_queue(&self) -> bool {
        matches!(self, QueueError::Empty)
    }

    /// The already-decoded segment of a failed delete, if any.
    pub fn recovered_segment(&self) -> Option<&InjuredSegment> {
        match self {
            QueueError::Delete { segment, .. } => Some(segment),
            _ => None,
        }
    }

    pub fn into_recovered_segment(self) -> Option<InjuredSegment> {
        match self {
            QueueError::Delete { segment, .. } => Some(*segment),
            _ => None,
        }
    }
}
