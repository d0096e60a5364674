/// Comment operations
///
/// Comments are append-only. Only the author may delete a comment; the board
/// owner has no override.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::views::{user_map, CommentView};
use super::{ensure, load_task, ServiceError, ServiceResult};
use crate::auth::authorization::{Action, ResourceContext};
use crate::auth::middleware::Identity;
use crate::models::comment::CreateComment;
use crate::store::ResourceStore;

/// Longest accepted comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 10_000;

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn ResourceStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Lists a task's comments, oldest first
    pub async fn list(&self, identity: &Identity, task_id: Uuid) -> ServiceResult<Vec<CommentView>> {
        let (board, task) = load_task(self.store.as_ref(), task_id).await?;
        ensure(
            identity,
            Action::ViewComments,
            &ResourceContext::Task { board: &board, task: &task },
        )?;

        let comments = self.store.list_comments_by_task(task.id).await?;
        let authors = user_map(
            self.store.as_ref(),
            comments.iter().map(|comment| comment.author_id),
        )
        .await?;

        Ok(comments
            .iter()
            .map(|comment| CommentView::new(comment, authors.get(&comment.author_id)))
            .collect())
    }

    /// Adds a comment authored by the requester
    #[instrument(skip(self, content), fields(user_id = %identity.user_id))]
    pub async fn create(
        &self,
        identity: &Identity,
        task_id: Uuid,
        content: &str,
    ) -> ServiceResult<CommentView> {
        let (board, task) = load_task(self.store.as_ref(), task_id).await?;
        ensure(
            identity,
            Action::CreateComment,
            &ResourceContext::Task { board: &board, task: &task },
        )?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::validation("content", "This field may not be blank."));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ServiceError::validation(
                "content",
                "Ensure this field has no more than 10000 characters.",
            ));
        }

        let comment = self
            .store
            .insert_comment(CreateComment {
                task_id: task.id,
                author_id: identity.user_id,
                content: content.to_string(),
            })
            .await?;
        let author = self.store.find_user(identity.user_id).await?;

        info!(comment_id = %comment.id, task_id = %task.id, "Comment created");
        Ok(CommentView::new(&comment, author.as_ref()))
    }

    /// Deletes one of the requester's own comments
    ///
    /// The comment must belong to `task_id`; otherwise it is reported as not
    /// found.
    #[instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn delete(
        &self,
        identity: &Identity,
        task_id: Uuid,
        comment_id: Uuid,
    ) -> ServiceResult<()> {
        let (board, task) = load_task(self.store.as_ref(), task_id).await?;
        let comment = self
            .store
            .find_comment(comment_id)
            .await?
            .filter(|comment| comment.task_id == task.id)
            .ok_or(ServiceError::NotFound("comment"))?;

        ensure(
            identity,
            Action::DeleteComment,
            &ResourceContext::Comment {
                board: &board,
                task: &task,
                comment: &comment,
            },
        )?;

        if !self.store.delete_comment(comment.id).await? {
            return Err(ServiceError::NotFound("comment"));
        }

        info!(comment_id = %comment.id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::boards::NewBoard;
    use super::super::tasks::NewTask;
    use super::super::test_support::{field_of, services, user};
    use super::*;

    #[tokio::test]
    async fn test_comment_lifecycle_and_author_only_delete() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (bob_user, bob) = user(&store, "Bob").await;
        let (_, mallory) = user(&store, "Mallory").await;

        let board = services
            .boards
            .create(&alice, NewBoard { title: "Board".to_string(), members: vec![bob_user.id] })
            .await
            .unwrap();
        let task = services
            .tasks
            .create(
                &alice,
                NewTask { board: Some(board.id), title: "Task".to_string(), ..Default::default() },
            )
            .await
            .unwrap();

        let first = services.comments.create(&bob, task.id, "first").await.unwrap();
        let second = services.comments.create(&alice, task.id, " second ").await.unwrap();
        assert_eq!(first.author, "Bob");
        assert_eq!(second.content, "second");

        let listed = services.comments.list(&alice, task.id).await.unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first.id, second.id]);
        assert!(listed[0].created_at < listed[1].created_at);

        let detail = services.tasks.detail(&alice, task.id).await.unwrap();
        assert_eq!(detail.comments_count, 2);

        // Board owner has no override on someone else's comment
        assert!(matches!(
            services.comments.delete(&alice, task.id, first.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            services.comments.list(&mallory, task.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));

        services.comments.delete(&bob, task.id, first.id).await.unwrap();
        assert_eq!(services.comments.list(&bob, task.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comment_on_other_task_is_not_found() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;

        let board = services
            .boards
            .create(&alice, NewBoard { title: "Board".to_string(), members: vec![] })
            .await
            .unwrap();
        let new_task = || NewTask { board: Some(board.id), title: "Task".to_string(), ..Default::default() };
        let task_a = services.tasks.create(&alice, new_task()).await.unwrap();
        let task_b = services.tasks.create(&alice, new_task()).await.unwrap();

        let comment = services.comments.create(&alice, task_a.id, "on A").await.unwrap();
        assert!(matches!(
            services.comments.delete(&alice, task_b.id, comment.id).await,
            Err(ServiceError::NotFound("comment"))
        ));
        assert!(matches!(
            services.comments.list(&alice, Uuid::new_v4()).await,
            Err(ServiceError::NotFound("task"))
        ));
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;

        let board = services
            .boards
            .create(&alice, NewBoard { title: "Board".to_string(), members: vec![] })
            .await
            .unwrap();
        let task = services
            .tasks
            .create(
                &alice,
                NewTask { board: Some(board.id), title: "Task".to_string(), ..Default::default() },
            )
            .await
            .unwrap();

        let err = services.comments.create(&alice, task.id, "   ").await.unwrap_err();
        assert_eq!(field_of(err), "content");
        assert!(store.list_comments_by_task(task.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_comment_checked_after_permission() {
        let (services, store) = services();
        let (_, alice) = user(&store, "Alice").await;
        let (_, mallory) = user(&store, "Mallory").await;

        let board = services
            .boards
            .create(&alice, NewBoard { title: "Board".to_string(), members: vec![] })
            .await
            .unwrap();
        let task = services
            .tasks
            .create(
                &alice,
                NewTask { board: Some(board.id), title: "Task".to_string(), ..Default::default() },
            )
            .await
            .unwrap();
        let long = "x".repeat(MAX_COMMENT_LENGTH + 1);

        assert!(matches!(
            services.comments.create(&mallory, task.id, &long).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(matches!(
            services.comments.create(&alice, Uuid::new_v4(), &long).await,
            Err(ServiceError::NotFound("task"))
        ));

        let err = services.comments.create(&alice, task.id, &long).await.unwrap_err();
        assert_eq!(field_of(err), "content");

        let exact = "x".repeat(MAX_COMMENT_LENGTH);
        assert!(services.comments.create(&alice, task.id, &exact).await.is_ok());
    }
}
