//! Domain model (IDs, tasks, containers, events).

pub mod container;
pub mod events;
pub mod ids;
pub mod state;
pub mod task;

pub use self::container::{LatLng, WasteContainer};
pub use self::events::DomainEvent;
pub use self::ids::{ContainerId, Id, IdMarker, TaskId};
pub use self::state::TaskState;
pub use self::task::{Task, TaskResult};
