/// Task operations
///
/// Assignee and reviewer must be members of the task's board whenever a
/// create or update sets them. This is a validation rule scoped to the
/// `assignee_id` / `reviewer_id` field, separate from the permission check.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};
use uuid::Uuid;

use super::views::{task_view, task_views, TaskView};
use super::{ensure, load_task, validate_title, ServiceError, ServiceResult};
use crate::auth::authorization::{visible_tasks, Action, Field, ResourceContext};
use crate::auth::middleware::Identity;
use crate::models::board::Board;
use crate::models::task::{CreateTask, Task, TaskChanges, TaskPriority, TaskStatus};
use crate::store::ResourceStore;

/// Input for creating a task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Target board; required
    pub board: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub reviewer_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Input for updating a task
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable
/// field. `board` may only repeat the task's current board.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub board: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub reviewer_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn ResourceStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Creates a task on a board the requester is a member of
    ///
    /// # Errors
    ///
    /// - `NotFound("board")` if `board` is absent or unknown
    /// - `PermissionDenied` if the requester is not a board member
    /// - `Validation` on `title`, `assignee_id` or `reviewer_id`
    #[instrument(skip(self, input), fields(user_id = %identity.user_id))]
    pub async fn create(&self, identity: &Identity, input: NewTask) -> ServiceResult<TaskView> {
        let board_id = input.board.ok_or(ServiceError::NotFound("board"))?;
        let board = self
            .store
            .find_board(board_id)
            .await?
            .ok_or(ServiceError::NotFound("board"))?;
        ensure(identity, Action::CreateTask, &ResourceContext::Board { board: &board })?;

        let title = validate_title(&input.title)?;
        self.check_participant(&board, Field::AssigneeId, input.assignee_id).await?;
        self.check_participant(&board, Field::ReviewerId, input.reviewer_id).await?;

        let task = self
            .store
            .insert_task(CreateTask {
                board_id: board.id,
                title,
                description: input.description.unwrap_or_default(),
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                assignee_id: input.assignee_id,
                reviewer_id: input.reviewer_id,
                due_date: input.due_date,
                created_by: identity.user_id,
            })
            .await?;

        info!(task_id = %task.id, board_id = %board.id, "Task created");
        task_view(self.store.as_ref(), &task).await
    }

    /// Returns a task the requester may view
    pub async fn detail(&self, identity: &Identity, task_id: Uuid) -> ServiceResult<TaskView> {
        let (board, task) = load_task(self.store.as_ref(), task_id).await?;
        ensure(
            identity,
            Action::ViewTask,
            &ResourceContext::Task { board: &board, task: &task },
        )?;

        task_view(self.store.as_ref(), &task).await
    }

    /// Updates a task in one store write
    ///
    /// Assignee and reviewer are checked against the board's current member
    /// set, and only when the update supplies a non-null value.
    #[instrument(skip(self, input), fields(user_id = %identity.user_id))]
    pub async fn update(
        &self,
        identity: &Identity,
        task_id: Uuid,
        input: TaskUpdate,
    ) -> ServiceResult<TaskView> {
        let (board, task) = load_task(self.store.as_ref(), task_id).await?;
        ensure(
            identity,
            Action::UpdateTask,
            &ResourceContext::Task { board: &board, task: &task },
        )?;

        if input.board.is_some_and(|requested| requested != task.board_id)
            && !Action::UpdateTask.may_change(Field::Board)
        {
            return Err(ServiceError::validation(
                Field::Board.as_str(),
                "A task cannot be moved to another board.",
            ));
        }

        let title = input.title.as_deref().map(validate_title).transpose()?;
        if let Some(assignee_id) = input.assignee_id {
            self.check_participant(&board, Field::AssigneeId, assignee_id).await?;
        }
        if let Some(reviewer_id) = input.reviewer_id {
            self.check_participant(&board, Field::ReviewerId, reviewer_id).await?;
        }

        let changes = TaskChanges {
            title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            assignee_id: input.assignee_id,
            reviewer_id: input.reviewer_id,
            due_date: input.due_date,
        };

        let task = if changes.is_empty() {
            task
        } else {
            let updated = self
                .store
                .update_task(task.id, changes)
                .await?
                .ok_or(ServiceError::NotFound("task"))?;
            info!(task_id = %updated.id, "Task updated");
            updated
        };

        task_view(self.store.as_ref(), &task).await
    }

    /// Deletes a task and its comments
    #[instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn delete(&self, identity: &Identity, task_id: Uuid) -> ServiceResult<()> {
        let (board, task) = load_task(self.store.as_ref(), task_id).await?;
        ensure(
            identity,
            Action::DeleteTask,
            &ResourceContext::Task { board: &board, task: &task },
        )?;

        if !self.store.delete_task(task.id).await? {
            return Err(ServiceError::NotFound("task"));
        }

        info!(task_id = %task.id, "Task deleted");
        Ok(())
    }

    /// Lists tasks assigned to the requester on boards they can still see
    pub async fn assigned_to_me(&self, identity: &Identity) -> ServiceResult<Vec<TaskView>> {
        let tasks = self.store.list_tasks_by_assignee(identity.user_id).await?;
        self.visible_views(identity, tasks).await
    }

    /// Lists tasks the requester reviews on boards they can still see
    pub async fn reviewing(&self, identity: &Identity) -> ServiceResult<Vec<TaskView>> {
        let tasks = self.store.list_tasks_by_reviewer(identity.user_id).await?;
        self.visible_views(identity, tasks).await
    }

    async fn visible_views(&self, identity: &Identity, tasks: Vec<Task>) -> ServiceResult<Vec<TaskView>> {
        let mut boards = HashMap::new();
        for task in &tasks {
            if boards.contains_key(&task.board_id) {
                continue;
            }
            if let Some(board) = self.store.find_board(task.board_id).await? {
                boards.insert(board.id, board);
            }
        }

        let tasks = visible_tasks(identity, tasks, &boards);
        task_views(self.store.as_ref(), &tasks).await
    }

    /// Checks that an assignee/reviewer exists and is a board member
    async fn check_participant(
        &self,
        board: &Board,
        field: Field,
        user_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        let Some(user_id) = user_id else {
            return Ok(());
        };

        if self.store.find_user(user_id).await?.is_none() {
            return Err(ServiceError::validation(field.as_str(), "User does not exist."));
        }
        if !board.is_member(user_id) {
            return Err(ServiceError::validation(
                field.as_str(),
                "User must be a member of the board.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::boards::{BoardUpdate, NewBoard};
    use super::super::test_support::{field_of, services, user};
    use super::super::Services;
    use super::*;

    async fn board_with(services: &Services, owner: &Identity, members: Vec<Uuid>) -> Uuid {
        services
            .boards
            .create(owner, NewBoard { title: "Board".to_string(), members })
            .await
            .unwrap()
            .id
    }

    fn new_task(board: Uuid) -> NewTask {
        NewTask {
            board: Some(board),
            title: "Ship it".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_creator() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let board = board_with(&services, &alice, vec![]).await;

        let view = services.tasks.create(&alice, new_task(board)).await.unwrap();
        assert_eq!(view.board, board);
        assert_eq!(view.status, TaskStatus::ToDo);
        assert_eq!(view.priority, TaskPriority::Medium);
        assert_eq!(view.comments_count, 0);

        let stored = store.find_task(view.id).await.unwrap().unwrap();
        assert_eq!(stored.created_by, alice.user_id);
    }

    #[tokio::test]
    async fn test_create_without_or_with_unknown_board_is_not_found() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;

        let missing = NewTask { board: None, ..new_task(Uuid::nil()) };
        assert!(matches!(
            services.tasks.create(&alice, missing).await,
            Err(ServiceError::NotFound("board"))
        ));
        assert!(matches!(
            services.tasks.create(&alice, new_task(Uuid::new_v4())).await,
            Err(ServiceError::NotFound("board"))
        ));
    }

    #[tokio::test]
    async fn test_create_requires_membership_then_valid_participants() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (carol_user, carol) = user(&store, "Carol").await;
        let board = board_with(&services, &alice, vec![]).await;

        // Not a member: permission beats validation
        let input = NewTask { assignee_id: Some(Uuid::new_v4()), ..new_task(board) };
        assert!(matches!(
            services.tasks.create(&carol, input).await,
            Err(ServiceError::PermissionDenied(_))
        ));

        let input = NewTask { assignee_id: Some(carol_user.id), ..new_task(board) };
        assert_eq!(field_of(services.tasks.create(&alice, input).await.unwrap_err()), "assignee_id");

        let input = NewTask { reviewer_id: Some(Uuid::new_v4()), ..new_task(board) };
        assert_eq!(field_of(services.tasks.create(&alice, input).await.unwrap_err()), "reviewer_id");

        assert!(store.list_tasks_by_board(board).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_outside_member_set_cannot_create_but_can_delete() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (bob_user, bob) = user(&store, "Bob").await;
        let board = board_with(&services, &alice, vec![bob_user.id]).await;

        services
            .boards
            .update(&alice, board, BoardUpdate { title: None, members: Some(vec![bob_user.id]) })
            .await
            .unwrap();

        assert!(matches!(
            services.tasks.create(&alice, new_task(board)).await,
            Err(ServiceError::PermissionDenied(_))
        ));

        let task = services.tasks.create(&bob, new_task(board)).await.unwrap();
        assert!(matches!(
            services.tasks.detail(&alice, task.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        services.tasks.delete(&alice, task.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_rejects_board_change_and_revalidates_participants() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (bob_user, _) = user(&store, "Bob").await;
        let board = board_with(&services, &alice, vec![bob_user.id]).await;
        let other_board = board_with(&services, &alice, vec![]).await;

        let task = services
            .tasks
            .create(&alice, NewTask { assignee_id: Some(bob_user.id), ..new_task(board) })
            .await
            .unwrap();

        let err = services
            .tasks
            .update(&alice, task.id, TaskUpdate { board: Some(other_board), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(field_of(err), "board");

        // Same board is accepted
        services
            .tasks
            .update(&alice, task.id, TaskUpdate { board: Some(board), ..Default::default() })
            .await
            .unwrap();

        // Bob is removed from the board; re-supplying Bob as assignee is now invalid
        services
            .boards
            .update(&alice, board, BoardUpdate { title: None, members: Some(vec![alice.user_id]) })
            .await
            .unwrap();
        let err = services
            .tasks
            .update(
                &alice,
                task.id,
                TaskUpdate {
                    status: Some(TaskStatus::Done),
                    assignee_id: Some(Some(bob_user.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(field_of(err), "assignee_id");

        let stored = store.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::ToDo);
    }

    #[tokio::test]
    async fn test_update_applies_fields_and_clears_nullable() {
        let (services, store) = services();
        let (alice_user, alice) = user(&store, "Alice").await;
        let board = board_with(&services, &alice, vec![]).await;

        let task = services
            .tasks
            .create(
                &alice,
                NewTask {
                    reviewer_id: Some(alice_user.id),
                    due_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                    ..new_task(board)
                },
            )
            .await
            .unwrap();
        assert_eq!(task.reviewer.as_ref().map(|r| r.id), Some(alice_user.id));

        let updated = services
            .tasks
            .update(
                &alice,
                task.id,
                TaskUpdate {
                    title: Some("Shipped".to_string()),
                    priority: Some(TaskPriority::High),
                    reviewer_id: Some(None),
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Shipped");
        assert_eq!(updated.priority, TaskPriority::High);
        assert!(updated.reviewer.is_none());
        assert!(updated.due_date.is_none());
    }

    #[tokio::test]
    async fn test_delete_creator_or_owner_only() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (bob_user, bob) = user(&store, "Bob").await;
        let (carol_user, carol) = user(&store, "Carol").await;
        let board = board_with(&services, &alice, vec![bob_user.id, carol_user.id]).await;

        let task = services.tasks.create(&bob, new_task(board)).await.unwrap();
        assert!(matches!(
            services.tasks.delete(&carol, task.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        services.tasks.delete(&bob, task.id).await.unwrap();
        assert!(matches!(
            services.tasks.delete(&bob, task.id).await,
            Err(ServiceError::NotFound("task"))
        ));
    }

    #[tokio::test]
    async fn test_assigned_and_reviewing_hide_boards_left() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (bob_user, bob) = user(&store, "Bob").await;
        let board = board_with(&services, &alice, vec![bob_user.id]).await;

        services
            .tasks
            .create(
                &alice,
                NewTask {
                    assignee_id: Some(bob_user.id),
                    reviewer_id: Some(bob_user.id),
                    ..new_task(board)
                },
            )
            .await
            .unwrap();

        assert_eq!(services.tasks.assigned_to_me(&bob).await.unwrap().len(), 1);
        assert_eq!(services.tasks.reviewing(&bob).await.unwrap().len(), 1);
        assert!(services.tasks.assigned_to_me(&alice).await.unwrap().is_empty());

        services
            .boards
            .update(&alice, board, BoardUpdate { title: None, members: Some(vec![]) })
            .await
            .unwrap();

        assert!(services.tasks.assigned_to_me(&bob).await.unwrap().is_empty());
        assert!(services.tasks.reviewing(&bob).await.unwrap().is_empty());
    }
}
