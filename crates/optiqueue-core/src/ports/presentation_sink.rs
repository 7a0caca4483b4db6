//! PresentationSink port - notifications towards the UI
//!
//! The core never renders anything. It reports task lifecycle changes to a
//! sink, and whatever sits behind the sink (terminal, map, web page) decides
//! how to show them.

use crate::domain::Task;

/// Receives task lifecycle notifications.
///
/// Each method fires exactly once per task, and `on_task_created` always
/// precedes the terminal notification. Calls happen while the task queue is
/// locked, so implementations must return quickly and must not call back into
/// the client.
pub trait PresentationSink: Send + Sync {
    fn on_task_created(&self, task: &Task);

    fn on_task_completed(&self, task: &Task);

    fn on_task_failed(&self, task: &Task);
}
