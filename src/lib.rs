// TaskBoard - Column task board with undo/redo history and local persistence

pub mod filter;
pub mod models;
pub mod persist;
pub mod seed;
pub mod store;
mod subscribers;

// Re-export main types for convenience
pub use filter::{Filters, FiltersPatch};
pub use models::{Column, Document, NewTask, Priority, Task, TaskPatch, Theme, new_task_id, now_ms};
pub use persist::{BoardLock, KvBackend, MemoryKv, SqliteKv};
pub use store::Store;
pub use subscribers::Subscription;
