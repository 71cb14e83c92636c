//! Repository modules for database operations
//!
//! Provides repository pattern implementations for task and user
//! operations, encapsulating database queries.

mod assignment;
mod filter;
mod task;
mod user;

pub use assignment::AssignmentService;
pub use filter::{
    CompareOp, DEFAULT_LIMIT, FieldMask, SortDirection, SortKey, TaskFilter, TaskLister,
    TaskListing, TaskQuery, project_task,
};
pub use task::TaskRepository;
pub use user::UserRepository;
