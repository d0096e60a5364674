/// Domain models for Taskboard
///
/// This module contains the records persisted by the resource store and the
/// input/change sets used to create and update them.
///
/// # Models
///
/// - `user`: User accounts (login handle, display name, password hash)
/// - `board`: Boards with a single owner and a member set
/// - `task`: Tasks on a board with status, priority, assignee and reviewer
/// - `comment`: Append-only comments on a task
///
/// # Example
///
/// ```
/// use taskboard_shared::models::task::{TaskPriority, TaskStatus};
///
/// assert_eq!(TaskStatus::default(), TaskStatus::ToDo);
/// assert_eq!(TaskPriority::High.as_str(), "high");
/// ```

pub mod board;
pub mod comment;
pub mod task;
pub mod user;
