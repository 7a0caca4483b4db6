//! Queue module: the in-memory home of task lifecycle state.

mod task_queue;

pub use task_queue::{SharedQueue, TaskQueue};
