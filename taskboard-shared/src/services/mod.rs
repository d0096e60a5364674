/// Service layer
///
/// Each operation takes the requester's [`Identity`] as its first argument,
/// loads the resource and its relational context from the store, asks the
/// authorization engine for a decision, validates the input, and only then
/// performs a single store write.
///
/// Check order is fixed: resource existence (404), then permission (403),
/// then validation (400).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::auth::middleware::Identity;
/// use taskboard_shared::services::{boards::NewBoard, Services};
/// use taskboard_shared::store::InMemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let services = Services::new(Arc::new(InMemoryStore::new()));
/// let identity = Identity::new(Uuid::new_v4());
///
/// let board = services
///     .boards
///     .create(&identity, NewBoard { title: "Roadmap".to_string(), members: vec![] })
///     .await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::auth::authorization::{require, Action, AuthzError, ResourceContext};
use crate::auth::middleware::Identity;
use crate::models::board::Board;
use crate::models::task::Task;
use crate::store::ResourceStore;

pub mod boards;
pub mod comments;
pub mod tasks;
pub mod users;
pub mod views;

pub use crate::error::{ServiceError, ServiceResult};
pub use boards::BoardService;
pub use comments::CommentService;
pub use tasks::TaskService;
pub use users::UserService;

/// All services over one store
#[derive(Clone)]
pub struct Services {
    pub boards: BoardService,
    pub tasks: TaskService,
    pub comments: CommentService,
    pub users: UserService,
}

impl Services {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            boards: BoardService::new(store.clone()),
            tasks: TaskService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            users: UserService::new(store),
        }
    }
}

/// Runs the authorization engine and logs denials
pub(crate) fn ensure(
    identity: &Identity,
    action: Action,
    context: &ResourceContext<'_>,
) -> ServiceResult<()> {
    require(identity, action, context).map_err(|err| {
        let AuthzError::Denied { reason, .. } = &err;
        warn!(
            user_id = %identity.user_id,
            action = %action,
            reason = ?reason,
            "Permission denied"
        );
        ServiceError::from(err)
    })
}

/// Loads a board or fails with `NotFound("board")`
pub(crate) async fn load_board(store: &dyn ResourceStore, id: Uuid) -> ServiceResult<Board> {
    store
        .find_board(id)
        .await?
        .ok_or(ServiceError::NotFound("board"))
}

/// Loads a task together with its board, failing with `NotFound("task")`
pub(crate) async fn load_task(store: &dyn ResourceStore, id: Uuid) -> ServiceResult<(Board, Task)> {
    let task = store
        .find_task(id)
        .await?
        .ok_or(ServiceError::NotFound("task"))?;
    let board = store
        .find_board(task.board_id)
        .await?
        .ok_or(ServiceError::NotFound("task"))?;
    Ok((board, task))
}

/// Validates a board or task title
pub(crate) fn validate_title(title: &str) -> ServiceResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title", "This field may not be blank."));
    }
    if title.chars().count() > 255 {
        return Err(ServiceError::validation(
            "title",
            "Ensure this field has no more than 255 characters.",
        ));
    }
    Ok(title.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::user::{CreateUser, User};
    use crate::store::InMemoryStore;

    pub fn services() -> (Services, Arc<dyn ResourceStore>) {
        let store: Arc<dyn ResourceStore> = Arc::new(InMemoryStore::new());
        (Services::new(store.clone()), store)
    }

    pub async fn user(store: &Arc<dyn ResourceStore>, name: &str) -> (User, Identity) {
        let user = store
            .insert_user(CreateUser {
                email: format!("{}@example.com", name.to_lowercase()),
                display_name: name.to_string(),
                password_hash: "unused".to_string(),
            })
            .await
            .unwrap();
        let identity = Identity::new(user.id);
        (user, identity)
    }

    pub fn field_of(err: ServiceError) -> String {
        match err {
            ServiceError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
