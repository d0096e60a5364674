/// In-memory resource store
///
/// All records live behind one `RwLock`, so every mutating call (including
/// cascading deletes) happens inside a single write section. Used by the test
/// suites and by the `memory` storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ResourceStore, StoreError, StoreResult};
use crate::models::board::{dedup_member_ids, Board, BoardChanges, CreateBoard};
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    boards: HashMap<Uuid, Board>,
    tasks: HashMap<Uuid, Task>,
    comments: HashMap<Uuid, Comment>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Returns a timestamp strictly greater than any previously issued one.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn require_users(&self, ids: impl IntoIterator<Item = Uuid>) -> StoreResult<()> {
        for id in ids {
            if !self.users.contains_key(&id) {
                return Err(StoreError::ForeignKey(format!("user {id}")));
            }
        }
        Ok(())
    }

    fn remove_task_cascade(&mut self, task_id: Uuid) -> bool {
        if self.tasks.remove(&task_id).is_none() {
            return false;
        }
        self.comments.retain(|_, comment| comment.task_id != task_id);
        true
    }
}

fn sorted<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

/// In-memory store implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, input: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.users.values().any(|user| user.email == input.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' is already registered",
                input.email
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: input.email,
            display_name: input.display_name,
            password_hash: input.password_hash,
            created_at: state.tick(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let users = ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect::<Vec<_>>();
        let mut users = sorted(users, |user| (user.created_at, user.id));
        users.dedup_by_key(|user| user.id);
        Ok(users)
    }

    async fn insert_board(&self, input: CreateBoard) -> StoreResult<Board> {
        let mut state = self.state.write().await;
        let member_ids = dedup_member_ids(input.member_ids);
        state.require_users(std::iter::once(input.owner_id).chain(member_ids.iter().copied()))?;

        let board = Board {
            id: Uuid::new_v4(),
            title: input.title,
            owner_id: input.owner_id,
            member_ids,
            created_at: state.tick(),
        };
        state.boards.insert(board.id, board.clone());
        Ok(board)
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(self.state.read().await.boards.get(&id).cloned())
    }

    async fn list_boards_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Board>> {
        let state = self.state.read().await;
        let boards = state
            .boards
            .values()
            .filter(|board| board.is_owner(user_id) || board.is_member(user_id))
            .cloned()
            .collect();
        Ok(sorted(boards, |board: &Board| (board.created_at, board.id)))
    }

    async fn update_board(&self, id: Uuid, changes: BoardChanges) -> StoreResult<Option<Board>> {
        let mut state = self.state.write().await;
        if !state.boards.contains_key(&id) {
            return Ok(None);
        }

        let member_ids = changes.member_ids.map(dedup_member_ids);
        if let Some(ids) = &member_ids {
            state.require_users(ids.iter().copied())?;
        }

        let Some(board) = state.boards.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            board.title = title;
        }
        if let Some(ids) = member_ids {
            board.member_ids = ids;
        }
        Ok(Some(board.clone()))
    }

    async fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.boards.remove(&id).is_none() {
            return Ok(false);
        }

        let task_ids: Vec<Uuid> = state
            .tasks
            .values()
            .filter(|task| task.board_id == id)
            .map(|task| task.id)
            .collect();
        for task_id in task_ids {
            state.remove_task_cascade(task_id);
        }
        Ok(true)
    }

    async fn insert_task(&self, input: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        if !state.boards.contains_key(&input.board_id) {
            return Err(StoreError::ForeignKey(format!("board {}", input.board_id)));
        }
        state.require_users(
            std::iter::once(input.created_by)
                .chain(input.assignee_id)
                .chain(input.reviewer_id),
        )?;

        let now = state.tick();
        let task = Task {
            id: Uuid::new_v4(),
            board_id: input.board_id,
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            assignee_id: input.assignee_id,
            reviewer_id: input.reviewer_id,
            due_date: input.due_date,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks_by_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let tasks = state
            .tasks
            .values()
            .filter(|task| task.board_id == board_id)
            .cloned()
            .collect();
        Ok(sorted(tasks, |task: &Task| (task.created_at, task.id)))
    }

    async fn list_tasks_by_assignee(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let tasks = state
            .tasks
            .values()
            .filter(|task| task.assignee_id == Some(user_id))
            .cloned()
            .collect();
        Ok(sorted(tasks, |task: &Task| (task.created_at, task.id)))
    }

    async fn list_tasks_by_reviewer(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let state = self.state.read().await;
        let tasks = state
            .tasks
            .values()
            .filter(|task| task.reviewer_id == Some(user_id))
            .cloned()
            .collect();
        Ok(sorted(tasks, |task: &Task| (task.created_at, task.id)))
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&id) {
            return Ok(None);
        }
        state.require_users(
            changes
                .assignee_id
                .flatten()
                .into_iter()
                .chain(changes.reviewer_id.flatten()),
        )?;

        let now = state.tick();
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(task);
        task.updated_at = now;
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.remove_task_cascade(id))
    }

    async fn insert_comment(&self, input: CreateComment) -> StoreResult<Comment> {
        let mut state = self.state.write().await;
        if !state.tasks.contains_key(&input.task_id) {
            return Err(StoreError::ForeignKey(format!("task {}", input.task_id)));
        }
        state.require_users([input.author_id])?;

        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: input.task_id,
            author_id: input.author_id,
            content: input.content,
            created_at: state.tick(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let comments = state
            .comments
            .values()
            .filter(|comment| comment.task_id == task_id)
            .cloned()
            .collect();
        Ok(sorted(comments, |comment: &Comment| {
            (comment.created_at, comment.id)
        }))
    }

    async fn count_comments(&self, task_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for comment in state.comments.values() {
            if task_ids.contains(&comment.task_id) {
                *counts.entry(comment.task_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.comments.remove(&id).is_some())
    }
}
