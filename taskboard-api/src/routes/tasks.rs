/// Task endpoints
///
/// # Endpoints
///
/// - `POST   /v1/tasks` - Create a task on a board
/// - `GET    /v1/tasks/assigned-to-me` - Tasks assigned to the caller
/// - `GET    /v1/tasks/reviewing` - Tasks the caller reviews
/// - `GET    /v1/tasks/:task_id` - Task detail
/// - `PATCH  /v1/tasks/:task_id` - Partial update; `null` clears assignee, reviewer or due date
/// - `DELETE /v1/tasks/:task_id` - Delete (creator or board owner)

use super::{deserialize_some, parse_id};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::Identity,
    models::task::{TaskPriority, TaskStatus},
    services::{
        tasks::{NewTask, TaskUpdate},
        views::TaskView,
    },
};
use uuid::Uuid;

/// Create task request
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Board ID; required. A malformed ID names no board and is reported as 404
    pub board: Option<String>,

    #[serde(default)]
    pub title: String,

    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub reviewer_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Update task request
///
/// Absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    /// May only repeat the task's current board
    pub board: Option<Uuid>,

    pub title: Option<String>,

    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub assignee_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub reviewer_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let Json(req) = payload?;
    let board = req
        .board
        .as_deref()
        .map(|raw| parse_id(raw, "Board"))
        .transpose()?;

    let task = state
        .services
        .tasks
        .create(
            &identity,
            NewTask {
                board,
                title: req.title,
                description: req.description,
                status: req.status,
                priority: req.priority,
                assignee_id: req.assignee_id,
                reviewer_id: req.reviewer_id,
                due_date: req.due_date,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let task_id = parse_id(&task_id, "Task")?;
    Ok(Json(state.services.tasks.detail(&identity, task_id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let task_id = parse_id(&task_id, "Task")?;
    let Json(req) = payload?;

    let task = state
        .services
        .tasks
        .update(
            &identity,
            task_id,
            TaskUpdate {
                board: req.board,
                title: req.title,
                description: req.description,
                status: req.status,
                priority: req.priority,
                assignee_id: req.assignee_id,
                reviewer_id: req.reviewer_id,
                due_date: req.due_date,
            },
        )
        .await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_id): Path<String>,
) -> ApiResult<StatusCode> {
    let task_id = parse_id(&task_id, "Task")?;
    state.services.tasks.delete(&identity, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assigned_to_me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<TaskView>>> {
    Ok(Json(state.services.tasks.assigned_to_me(&identity).await?))
}

pub async fn reviewing(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<TaskView>>> {
    Ok(Json(state.services.tasks.reviewing(&identity).await?))
}
