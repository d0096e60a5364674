/// Board operations

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::views::{member_summaries, task_views, user_map, BoardDetail, BoardSummary, BoardUpdated};
use super::{ensure, load_board, validate_title, ServiceError, ServiceResult};
use crate::auth::authorization::{visible_boards, Action, ResourceContext};
use crate::auth::middleware::Identity;
use crate::models::board::{BoardChanges, CreateBoard};
use crate::models::user::UserSummary;
use crate::store::ResourceStore;

/// Input for creating a board
#[derive(Debug, Clone, Default)]
pub struct NewBoard {
    pub title: String,

    /// Additional members; the requester is always added
    pub members: Vec<Uuid>,
}

/// Input for updating a board
#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    pub title: Option<String>,

    /// Full replacement of the member set
    pub members: Option<Vec<Uuid>>,
}

#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn ResourceStore>,
}

impl BoardService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Lists every board the requester owns or belongs to, with counters
    pub async fn list(&self, identity: &Identity) -> ServiceResult<Vec<BoardSummary>> {
        let boards = self.store.list_boards_for_user(identity.user_id).await?;
        let boards = visible_boards(identity, boards);

        let mut summaries = Vec::with_capacity(boards.len());
        for board in &boards {
            let tasks = self.store.list_tasks_by_board(board.id).await?;
            summaries.push(BoardSummary::new(board, &tasks));
        }
        Ok(summaries)
    }

    /// Creates a board owned by the requester
    ///
    /// The requester is always a member. Every other member ID must name an
    /// existing user.
    #[instrument(skip(self, input), fields(user_id = %identity.user_id))]
    pub async fn create(&self, identity: &Identity, input: NewBoard) -> ServiceResult<BoardSummary> {
        let title = validate_title(&input.title)?;

        let mut member_ids = input.members;
        member_ids.push(identity.user_id);
        self.ensure_users_exist(&member_ids).await?;

        let board = self
            .store
            .insert_board(CreateBoard {
                title,
                owner_id: identity.user_id,
                member_ids,
            })
            .await?;

        info!(board_id = %board.id, "Board created");
        Ok(BoardSummary::new(&board, &[]))
    }

    /// Returns a board with its members and tasks
    pub async fn detail(&self, identity: &Identity, board_id: Uuid) -> ServiceResult<BoardDetail> {
        let board = load_board(self.store.as_ref(), board_id).await?;
        ensure(identity, Action::ViewBoard, &ResourceContext::Board { board: &board })?;

        let tasks = self.store.list_tasks_by_board(board.id).await?;
        Ok(BoardDetail {
            summary: BoardSummary::new(&board, &tasks),
            members: member_summaries(self.store.as_ref(), &board.member_ids).await?,
            tasks: task_views(self.store.as_ref(), &tasks).await?,
        })
    }

    /// Updates the title and/or replaces the member set
    #[instrument(skip(self, input), fields(user_id = %identity.user_id))]
    pub async fn update(
        &self,
        identity: &Identity,
        board_id: Uuid,
        input: BoardUpdate,
    ) -> ServiceResult<BoardUpdated> {
        let board = load_board(self.store.as_ref(), board_id).await?;
        ensure(identity, Action::UpdateBoard, &ResourceContext::Board { board: &board })?;

        let title = input.title.as_deref().map(validate_title).transpose()?;
        if let Some(members) = &input.members {
            self.ensure_users_exist(members).await?;
        }

        let board = self
            .store
            .update_board(
                board.id,
                BoardChanges {
                    title,
                    member_ids: input.members,
                },
            )
            .await?
            .ok_or(ServiceError::NotFound("board"))?;

        info!(board_id = %board.id, members = board.member_ids.len(), "Board updated");

        let owner = user_map(self.store.as_ref(), [board.owner_id]).await?;
        Ok(BoardUpdated {
            id: board.id,
            title: board.title.clone(),
            owner_data: owner.get(&board.owner_id).map(UserSummary::from),
            members_data: member_summaries(self.store.as_ref(), &board.member_ids).await?,
        })
    }

    /// Deletes a board with all of its tasks and comments
    #[instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn delete(&self, identity: &Identity, board_id: Uuid) -> ServiceResult<()> {
        let board = load_board(self.store.as_ref(), board_id).await?;
        ensure(identity, Action::DeleteBoard, &ResourceContext::Board { board: &board })?;

        if !self.store.delete_board(board.id).await? {
            return Err(ServiceError::NotFound("board"));
        }

        info!(board_id = %board.id, "Board deleted");
        Ok(())
    }

    /// Lists the board's members
    pub async fn members(&self, identity: &Identity, board_id: Uuid) -> ServiceResult<Vec<UserSummary>> {
        let board = load_board(self.store.as_ref(), board_id).await?;
        ensure(identity, Action::ViewBoard, &ResourceContext::Board { board: &board })?;

        member_summaries(self.store.as_ref(), &board.member_ids).await
    }

    async fn ensure_users_exist(&self, ids: &[Uuid]) -> ServiceResult<()> {
        let found = user_map(self.store.as_ref(), ids.iter().copied()).await?;

        let mut missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains_key(*id))
            .collect::<HashSet<_>>()
            .into_iter()
            .map(Uuid::to_string)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        missing.sort();
        Err(ServiceError::validation(
            "members",
            format!("Unknown user id(s): {}", missing.join(", ")),
        ))
    }
}
