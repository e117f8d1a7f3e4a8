use thiserror::Error;

/// Failure of [`ConcurrentOrderedList::copy_to`](crate::ConcurrentOrderedList::copy_to).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    #[error("offset {offset} is past the end of a destination of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("destination has room for {capacity} elements but the list holds more")]
    InsufficientCapacity { capacity: usize },
}

pub type Result<T> = std::result::Result<T, CopyError>;
