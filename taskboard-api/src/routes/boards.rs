/// Board endpoints
///
/// # Endpoints
///
/// - `GET    /v1/boards` - Boards the caller owns or belongs to
/// - `POST   /v1/boards` - Create a board
/// - `GET    /v1/boards/:board_id` - Board with members and tasks
/// - `PATCH  /v1/boards/:board_id` - Rename and/or replace members
/// - `DELETE /v1/boards/:board_id` - Delete (owner only)
/// - `GET    /v1/boards/:board_id/members` - Member list

use super::parse_id;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::Identity,
    models::user::UserSummary,
    services::{
        boards::{BoardUpdate, NewBoard},
        views::{BoardDetail, BoardSummary, BoardUpdated},
    },
};
use uuid::Uuid;

/// Create board request
#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    #[serde(default)]
    pub title: String,

    /// Additional member user IDs
    #[serde(default)]
    pub members: Vec<Uuid>,
}

/// Update board request
#[derive(Debug, Deserialize)]
pub struct UpdateBoardRequest {
    pub title: Option<String>,

    /// Replaces the member set when present
    pub members: Option<Vec<Uuid>>,
}

pub async fn list_boards(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<BoardSummary>>> {
    Ok(Json(state.services.boards.list(&identity).await?))
}

pub async fn create_board(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateBoardRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BoardSummary>)> {
    let Json(req) = payload?;

    let board = state
        .services
        .boards
        .create(
            &identity,
            NewBoard {
                title: req.title,
                members: req.members,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn get_board(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(board_id): Path<String>,
) -> ApiResult<Json<BoardDetail>> {
    let board_id = parse_id(&board_id, "Board")?;
    Ok(Json(state.services.boards.detail(&identity, board_id).await?))
}

pub async fn update_board(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(board_id): Path<String>,
    payload: Result<Json<UpdateBoardRequest>, JsonRejection>,
) -> ApiResult<Json<BoardUpdated>> {
    let board_id = parse_id(&board_id, "Board")?;
    let Json(req) = payload?;

    let board = state
        .services
        .boards
        .update(
            &identity,
            board_id,
            BoardUpdate {
                title: req.title,
                members: req.members,
            },
        )
        .await?;

    Ok(Json(board))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(board_id): Path<String>,
) -> ApiResult<StatusCode> {
    let board_id = parse_id(&board_id, "Board")?;
    state.services.boards.delete(&identity, board_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(board_id): Path<String>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let board_id = parse_id(&board_id, "Board")?;
    Ok(Json(state.services.boards.members(&identity, board_id).await?))
}
