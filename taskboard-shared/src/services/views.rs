/// Response projections
///
/// The shapes returned by service operations and serialized by the API.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::models::board::Board;
use crate::models::comment::Comment;
use crate::models::task::{Task, TaskPriority, TaskStatus};
use crate::models::user::{User, UserSummary};
use crate::store::ResourceStore;

/// Board row in the board list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Uuid,
    pub member_count: usize,
    pub ticket_count: usize,
    pub tasks_to_do_count: usize,
    pub tasks_high_prio_count: usize,
}

impl BoardSummary {
    /// Computes the counters from the board's tasks
    pub fn new(board: &Board, tasks: &[Task]) -> Self {
        Self {
            id: board.id,
            title: board.title.clone(),
            owner_id: board.owner_id,
            member_count: board.member_ids.len(),
            ticket_count: tasks.len(),
            tasks_to_do_count: tasks
                .iter()
                .filter(|task| task.status == TaskStatus::ToDo)
                .count(),
            tasks_high_prio_count: tasks
                .iter()
                .filter(|task| task.priority == TaskPriority::High)
                .count(),
        }
    }
}

/// Board with resolved members and all of its tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub summary: BoardSummary,
    pub members: Vec<UserSummary>,
    pub tasks: Vec<TaskView>,
}

/// Result of a board update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardUpdated {
    pub id: Uuid,
    pub title: String,
    pub owner_data: Option<UserSummary>,
    pub members_data: Vec<UserSummary>,
}

/// Task with resolved assignee/reviewer and its comment count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: Uuid,
    pub board: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee: Option<UserSummary>,
    pub reviewer: Option<UserSummary>,
    pub due_date: Option<NaiveDate>,
    pub comments_count: i64,
}

/// Comment with the author's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub content: String,
}

impl CommentView {
    pub fn new(comment: &Comment, author: Option<&User>) -> Self {
        Self {
            id: comment.id,
            created_at: comment.created_at,
            author: author
                .map(|user| UserSummary::from(user).fullname)
                .unwrap_or_default(),
            content: comment.content.clone(),
        }
    }
}

/// Loads users by ID into a lookup map
pub(crate) async fn user_map(
    store: &dyn ResourceStore,
    ids: impl IntoIterator<Item = Uuid>,
) -> ServiceResult<HashMap<Uuid, User>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(store
        .find_users(&ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect())
}

/// Resolves members into summaries, keeping member-ID order
pub(crate) async fn member_summaries(
    store: &dyn ResourceStore,
    member_ids: &[Uuid],
) -> ServiceResult<Vec<UserSummary>> {
    let users = user_map(store, member_ids.iter().copied()).await?;
    Ok(member_ids
        .iter()
        .filter_map(|id| users.get(id).map(UserSummary::from))
        .collect())
}

/// Builds task views with one user lookup and one comment count query
pub(crate) async fn task_views(
    store: &dyn ResourceStore,
    tasks: &[Task],
) -> ServiceResult<Vec<TaskView>> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let users = user_map(
        store,
        tasks
            .iter()
            .flat_map(|task| task.assignee_id.into_iter().chain(task.reviewer_id)),
    )
    .await?;
    let task_ids: Vec<Uuid> = tasks.iter().map(|task| task.id).collect();
    let counts = store.count_comments(&task_ids).await?;

    let summary = |id: Option<Uuid>| id.and_then(|id| users.get(&id)).map(UserSummary::from);

    Ok(tasks
        .iter()
        .map(|task| TaskView {
            id: task.id,
            board: task.board_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            assignee: summary(task.assignee_id),
            reviewer: summary(task.reviewer_id),
            due_date: task.due_date,
            comments_count: counts.get(&task.id).copied().unwrap_or(0),
        })
        .collect())
}

/// Builds the view of a single task
pub(crate) async fn task_view(store: &dyn ResourceStore, task: &Task) -> ServiceResult<TaskView> {
    let mut views = task_views(store, std::slice::from_ref(task)).await?;
    Ok(views.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_summary_counts() {
        let owner = Uuid::new_v4();
        let board = Board {
            id: Uuid::new_v4(),
            title: "Board".to_string(),
            owner_id: owner,
            member_ids: vec![owner, Uuid::new_v4()],
            created_at: Utc::now(),
        };
        let task = |status, priority| Task {
            id: Uuid::new_v4(),
            board_id: board.id,
            title: "t".to_string(),
            description: String::new(),
            status,
            priority,
            assignee_id: None,
            reviewer_id: None,
            due_date: None,
            created_by: owner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let tasks = vec![
            task(TaskStatus::ToDo, TaskPriority::High),
            task(TaskStatus::ToDo, TaskPriority::Low),
            task(TaskStatus::Done, TaskPriority::High),
        ];

        let summary = BoardSummary::new(&board, &tasks);
        assert_eq!(summary.member_count, 2);
        assert_eq!(summary.ticket_count, 3);
        assert_eq!(summary.tasks_to_do_count, 2);
        assert_eq!(summary.tasks_high_prio_count, 2);
    }

    #[test]
    fn test_board_detail_flattens_summary() {
        let detail = BoardDetail {
            summary: BoardSummary {
                id: Uuid::nil(),
                title: "Board".to_string(),
                owner_id: Uuid::nil(),
                member_count: 0,
                ticket_count: 0,
                tasks_to_do_count: 0,
                tasks_high_prio_count: 0,
            },
            members: vec![],
            tasks: vec![],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Board");
        assert_eq!(json["ticket_count"], 0);
        assert!(json.get("summary").is_none());
    }
}
