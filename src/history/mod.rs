//! Local history of published episodes.

pub mod storage;

pub use storage::{HistoryManager, PublishedEntry};
