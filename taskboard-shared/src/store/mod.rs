/// Resource store port
///
/// The service layer reaches persistence only through [`ResourceStore`]. Every
/// mutating method is atomic in the backing store: a transaction for
/// [`PgStore`], a single write-lock section for [`InMemoryStore`].
///
/// # Adapters
///
/// - `postgres`: PostgreSQL via sqlx, cascades through foreign keys
/// - `memory`: `tokio::sync::RwLock` maps, cascades performed explicitly
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_shared::store::{InMemoryStore, ResourceStore};
///
/// let store: Arc<dyn ResourceStore> = Arc::new(InMemoryStore::new());
/// ```

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::board::{Board, BoardChanges, CreateBoard};
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced record does not exist
    #[error("Missing referenced record: {0}")]
    ForeignKey(String),

    /// The database rejected or failed the operation
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for users, boards, tasks and comments
///
/// Lookups return `Ok(None)` for missing rows; deletes return whether a row
/// was removed. List results are ordered by creation time.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Verifies the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Inserts a user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, input: CreateUser) -> StoreResult<User>;

    /// Finds a user by ID.
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Finds a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds all users whose ID is in `ids`; unknown IDs are skipped.
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Inserts a board together with its member set.
    async fn insert_board(&self, input: CreateBoard) -> StoreResult<Board>;

    /// Finds a board (with members) by ID.
    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>>;

    /// Lists boards the user owns or is a member of.
    async fn list_boards_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Board>>;

    /// Applies title and member-set changes in one unit.
    async fn update_board(&self, id: Uuid, changes: BoardChanges) -> StoreResult<Option<Board>>;

    /// Deletes a board and, transitively, its tasks and comments.
    async fn delete_board(&self, id: Uuid) -> StoreResult<bool>;

    /// Inserts a task.
    async fn insert_task(&self, input: CreateTask) -> StoreResult<Task>;

    /// Finds a task by ID.
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Lists the tasks on a board.
    async fn list_tasks_by_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Lists tasks assigned to a user.
    async fn list_tasks_by_assignee(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Lists tasks a user reviews.
    async fn list_tasks_by_reviewer(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Applies a change set and stamps `updated_at`.
    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>>;

    /// Deletes a task and its comments.
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Inserts a comment; the store assigns `created_at`.
    async fn insert_comment(&self, input: CreateComment) -> StoreResult<Comment>;

    /// Finds a comment by ID.
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;

    /// Lists a task's comments, oldest first.
    async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Counts comments per task. Tasks without comments are absent.
    async fn count_comments(&self, task_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;

    /// Deletes a comment.
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;
}
