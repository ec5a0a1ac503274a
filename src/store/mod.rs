pub mod document;
pub mod memory;
pub mod tasks;
pub mod users;

pub use document::{
    DocPath, Document, DocumentStore, Filter, Query, StoreError, WriteBatch, WriteOp,
    MAX_BATCH_WRITES,
};
pub use memory::MemoryStore;
pub use tasks::{ReminderCandidates, TaskStore};
pub use users::UserStore;
