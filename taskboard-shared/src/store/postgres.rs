/// PostgreSQL resource store
///
/// Boards are assembled from the `boards` row plus its `board_members` rows.
/// Multi-statement writes run in a transaction; cascades are carried by the
/// schema's foreign keys.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::{PgStore, ResourceStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::new("postgresql://localhost/taskboard", 5)).await?;
/// let store = PgStore::new(pool);
/// let boards = store.list_boards_for_user(Uuid::new_v4()).await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{ResourceStore, StoreError, StoreResult};
use crate::models::board::{dedup_member_ids, Board, BoardChanges, CreateBoard};
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges};
use crate::models::user::{CreateUser, User};

#[derive(Debug, sqlx::FromRow)]
struct BoardRow {
    id: Uuid,
    title: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl BoardRow {
    fn into_board(self, member_ids: Vec<Uuid>) -> Board {
        Board {
            id: self.id,
            title: self.title,
            owner_id: self.owner_id,
            member_ids,
            created_at: self.created_at,
        }
    }
}

/// Maps constraint violations onto the store's error kinds.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::ForeignKey(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn member_ids(&self, board_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM board_members WHERE board_id = $1 ORDER BY user_id",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn attach_members(&self, rows: Vec<BoardRow>) -> StoreResult<Vec<Board>> {
        let board_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT board_id, user_id FROM board_members
             WHERE board_id = ANY($1)
             ORDER BY board_id, user_id",
        )
        .bind(&board_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (board_id, user_id) in pairs {
            members.entry(board_id).or_default().push(user_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let ids = members.remove(&row.id).unwrap_or_default();
                row.into_board(ids)
            })
            .collect())
    }

    async fn replace_members(
        tx: &mut Transaction<'_, Postgres>,
        board_id: Uuid,
        member_ids: &[Uuid],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM board_members WHERE board_id = $1")
            .bind(board_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            "INSERT INTO board_members (board_id, user_id)
             SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(board_id)
        .bind(member_ids)
        .execute(&mut **tx)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn list_tasks_where(&self, column: &str, value: Uuid) -> StoreResult<Vec<Task>> {
        let query = format!("SELECT * FROM tasks WHERE {column} = $1 ORDER BY created_at, id");
        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }
}

#[async_trait]
impl ResourceStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, input: CreateUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, display_name, password_hash)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(&input.email)
        .bind(&input.display_name)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        debug!(user_id = %user.id, "Inserted user");
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ANY($1) ORDER BY created_at, id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn insert_board(&self, input: CreateBoard) -> StoreResult<Board> {
        let member_ids = dedup_member_ids(input.member_ids);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BoardRow>(
            "INSERT INTO boards (title, owner_id)
             VALUES ($1, $2)
             RETURNING id, title, owner_id, created_at",
        )
        .bind(&input.title)
        .bind(input.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        Self::replace_members(&mut tx, row.id, &member_ids).await?;
        tx.commit().await?;

        debug!(board_id = %row.id, members = member_ids.len(), "Inserted board");
        Ok(row.into_board(member_ids))
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        let row = sqlx::query_as::<_, BoardRow>(
            "SELECT id, title, owner_id, created_at FROM boards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let member_ids = self.member_ids(row.id).await?;
                Ok(Some(row.into_board(member_ids)))
            }
            None => Ok(None),
        }
    }

    async fn list_boards_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Board>> {
        let rows = sqlx::query_as::<_, BoardRow>(
            "SELECT b.id, b.title, b.owner_id, b.created_at
             FROM boards b
             WHERE b.owner_id = $1
                OR EXISTS (
                    SELECT 1 FROM board_members m
                    WHERE m.board_id = b.id AND m.user_id = $1
                )
             ORDER BY b.created_at, b.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_members(rows).await
    }

    async fn update_board(&self, id: Uuid, changes: BoardChanges) -> StoreResult<Option<Board>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent member replacements on one board
        let row = sqlx::query_as::<_, BoardRow>(
            "UPDATE boards SET title = COALESCE($2, title)
             WHERE id = $1
             RETURNING id, title, owner_id, created_at",
        )
        .bind(id)
        .bind(changes.title.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(member_ids) = changes.member_ids {
            Self::replace_members(&mut tx, id, &dedup_member_ids(member_ids)).await?;
        }
        tx.commit().await?;

        let member_ids = self.member_ids(id).await?;
        Ok(Some(row.into_board(member_ids)))
    }

    async fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, input: CreateTask) -> StoreResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (
                board_id, title, description, status, priority,
                assignee_id, reviewer_id, due_date, created_by
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(input.board_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.status)
        .bind(input.priority)
        .bind(input.assignee_id)
        .bind(input.reviewer_id)
        .bind(input.due_date)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list_tasks_by_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>> {
        self.list_tasks_where("board_id", board_id).await
    }

    async fn list_tasks_by_assignee(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.list_tasks_where("assignee_id", user_id).await
    }

    async fn list_tasks_by_reviewer(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.list_tasks_where("reviewer_id", user_id).await
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                assignee_id = CASE WHEN $6 THEN $7 ELSE assignee_id END,
                reviewer_id = CASE WHEN $8 THEN $9 ELSE reviewer_id END,
                due_date = CASE WHEN $10 THEN $11 ELSE due_date END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.status)
        .bind(changes.priority)
        .bind(changes.assignee_id.is_some())
        .bind(changes.assignee_id.flatten())
        .bind(changes.reviewer_id.is_some())
        .bind(changes.reviewer_id.flatten())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, input: CreateComment) -> StoreResult<Comment> {
        // Never at or before the task's latest comment, even on clock skew
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (task_id, author_id, content, created_at)
             VALUES (
                $1, $2, $3,
                GREATEST(
                    clock_timestamp(),
                    (SELECT MAX(created_at) + INTERVAL '1 microsecond'
                     FROM comments WHERE task_id = $1)
                )
             )
             RETURNING *",
        )
        .bind(input.task_id)
        .bind(input.author_id)
        .bind(&input.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn list_comments_by_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE task_id = $1 ORDER BY created_at, id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn count_comments(&self, task_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT task_id, COUNT(*) FROM comments
             WHERE task_id = ANY($1)
             GROUP BY task_id",
        )
        .bind(task_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
