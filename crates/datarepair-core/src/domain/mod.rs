//! Domain model (segments, queue keys, error kinds).

pub mod errors;
pub mod key;
pub mod segment;

pub use self::errors::ErrorKind;
pub use self::key::{InvalidKeyLength, KEY_LEN, QueueKey};
pub use self::segment::InjuredSegment;
