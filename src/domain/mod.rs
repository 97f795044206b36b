pub mod enums;
pub mod task;

pub use enums::{Priority, Status};
pub use task::{Category, Collection, Task, UNCATEGORIZED};
