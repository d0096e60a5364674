/// Comment endpoints
///
/// # Endpoints
///
/// - `GET    /v1/tasks/:task_id/comments` - Comments, oldest first
/// - `POST   /v1/tasks/:task_id/comments` - Add a comment
/// - `DELETE /v1/tasks/:task_id/comments/:comment_id` - Delete (author only)

use super::parse_id;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::{auth::middleware::Identity, services::views::CommentView};

/// Create comment request
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let task_id = parse_id(&task_id, "Task")?;
    Ok(Json(state.services.comments.list(&identity, task_id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_id): Path<String>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let task_id = parse_id(&task_id, "Task")?;
    let Json(req) = payload?;

    let comment = state
        .services
        .comments
        .create(&identity, task_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((task_id, comment_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let task_id = parse_id(&task_id, "Task")?;
    let comment_id = parse_id(&comment_id, "Comment")?;

    state
        .services
        .comments
        .delete(&identity, task_id, comment_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
