pub mod common_tests;
pub mod data_structures;
pub mod error;
pub mod guard;

pub use data_structures::{ConcurrentOrderedList, Iter, OrderFn, OrderRule};
pub use error::{CopyError, Result};
pub use guard::{DeferredGuard, DeferredRef, Guard};
