/// Authorization engine
///
/// Decides whether an identity may perform an action on a board, task or
/// comment. The engine is a set of pure functions: callers load the resource
/// and its relational context (the task's board, the comment's task and
/// board) and pass it in, so no decision ever performs a lookup.
///
/// # Permission Model
///
/// | Action | Allowed when |
/// |---|---|
/// | view/update board | requester is owner or member |
/// | delete board | requester is owner |
/// | create task | requester is a board member |
/// | view/update task | requester is a member of the task's board |
/// | delete task | requester created the task or owns its board |
/// | view/create comments | requester is a member of the task's board |
/// | delete comment | requester authored the comment |
///
/// Membership of an assignee or reviewer is a validation concern and is not
/// checked here.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use taskboard_shared::auth::authorization::{authorize, Action, Decision, ResourceContext};
/// use taskboard_shared::auth::middleware::Identity;
/// use taskboard_shared::models::board::Board;
/// use uuid::Uuid;
///
/// let owner = Uuid::new_v4();
/// let board = Board {
///     id: Uuid::new_v4(),
///     title: "Roadmap".to_string(),
///     owner_id: owner,
///     member_ids: vec![],
///     created_at: Utc::now(),
/// };
///
/// let ctx = ResourceContext::Board { board: &board };
/// assert_eq!(authorize(&Identity::new(owner), Action::ViewBoard, &ctx), Decision::Allow);
/// assert!(authorize(&Identity::new(owner), Action::CreateTask, &ctx).is_denied());
/// ```

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use super::middleware::Identity;
use crate::models::board::Board;
use crate::models::comment::Comment;
use crate::models::task::Task;

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewBoard,
    UpdateBoard,
    DeleteBoard,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
    ViewComments,
    CreateComment,
    DeleteComment,
}

/// Client-writable fields of boards and tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Members,
    Description,
    Status,
    Priority,
    AssigneeId,
    ReviewerId,
    DueDate,
    Board,
}

impl Field {
    /// Name used in validation error details
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Members => "members",
            Field::Description => "description",
            Field::Status => "status",
            Field::Priority => "priority",
            Field::AssigneeId => "assignee_id",
            Field::ReviewerId => "reviewer_id",
            Field::DueDate => "due_date",
            Field::Board => "board",
        }
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewBoard => "view_board",
            Action::UpdateBoard => "update_board",
            Action::DeleteBoard => "delete_board",
            Action::CreateTask => "create_task",
            Action::ViewTask => "view_task",
            Action::UpdateTask => "update_task",
            Action::DeleteTask => "delete_task",
            Action::ViewComments => "view_comments",
            Action::CreateComment => "create_comment",
            Action::DeleteComment => "delete_comment",
        }
    }

    /// Fields an update action is allowed to change
    ///
    /// Non-update actions return an empty slice. A task's `board` is never
    /// mutable.
    pub fn mutable_fields(&self) -> &'static [Field] {
        match self {
            Action::UpdateBoard => &[Field::Title, Field::Members],
            Action::UpdateTask => &[
                Field::Title,
                Field::Description,
                Field::Status,
                Field::Priority,
                Field::AssigneeId,
                Field::ReviewerId,
                Field::DueDate,
            ],
            _ => &[],
        }
    }

    /// Checks whether `field` is in [`Action::mutable_fields`]
    pub fn may_change(&self, field: Field) -> bool {
        self.mutable_fields().contains(&field)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource plus the relational closure a decision needs
///
/// A task context must carry the task's own board, and a comment context the
/// comment's own task; inconsistent contexts are denied.
#[derive(Debug, Clone, Copy)]
pub enum ResourceContext<'a> {
    Board {
        board: &'a Board,
    },
    Task {
        board: &'a Board,
        task: &'a Task,
    },
    Comment {
        board: &'a Board,
        task: &'a Task,
        comment: &'a Comment,
    },
}

impl<'a> ResourceContext<'a> {
    fn board(&self) -> &'a Board {
        match *self {
            ResourceContext::Board { board }
            | ResourceContext::Task { board, .. }
            | ResourceContext::Comment { board, .. } => board,
        }
    }

    fn task(&self) -> Option<&'a Task> {
        match *self {
            ResourceContext::Board { .. } => None,
            ResourceContext::Task { task, .. } | ResourceContext::Comment { task, .. } => Some(task),
        }
    }

    fn comment(&self) -> Option<&'a Comment> {
        match *self {
            ResourceContext::Comment { comment, .. } => Some(comment),
            _ => None,
        }
    }

    fn is_consistent(&self) -> bool {
        match *self {
            ResourceContext::Board { .. } => true,
            ResourceContext::Task { board, task } => task.board_id == board.id,
            ResourceContext::Comment {
                board,
                task,
                comment,
            } => task.board_id == board.id && comment.task_id == task.id,
        }
    }
}

/// Why an action was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Requester is neither owner nor member of the board
    NotOwnerOrMember,

    /// Requester is not in the board's member set
    NotMember,

    /// Requester does not own the board
    NotOwner,

    /// Requester neither created the task nor owns its board
    NotCreatorOrOwner,

    /// Requester did not author the comment
    NotAuthor,

    /// The context lacks the resource the action targets, or is inconsistent
    MissingContext,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            DenyReason::NotOwnerOrMember => "You must be the owner or a member of this board",
            DenyReason::NotMember => "You must be a member of this board",
            DenyReason::NotOwner => "Only the board owner can do this",
            DenyReason::NotCreatorOrOwner => {
                "Only the task creator or the board owner can delete this task"
            }
            DenyReason::NotAuthor => "Only the author can delete this comment",
            DenyReason::MissingContext => "Insufficient context for this action",
        };
        f.write_str(message)
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    fn allow_if(condition: bool, reason: DenyReason) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::Deny(reason)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }
}

/// Error returned by [`require`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Permission denied for {action}: {reason}")]
    Denied { action: Action, reason: DenyReason },
}

/// Decides whether `identity` may perform `action` in `context`
pub fn authorize(identity: &Identity, action: Action, context: &ResourceContext<'_>) -> Decision {
    if !context.is_consistent() {
        return Decision::Deny(DenyReason::MissingContext);
    }

    let requester = identity.user_id;
    let board = context.board();

    match action {
        Action::ViewBoard | Action::UpdateBoard => Decision::allow_if(
            board.is_owner(requester) || board.is_member(requester),
            DenyReason::NotOwnerOrMember,
        ),
        Action::DeleteBoard => Decision::allow_if(board.is_owner(requester), DenyReason::NotOwner),
        Action::CreateTask => {
            Decision::allow_if(board.is_member(requester), DenyReason::NotMember)
        }
        Action::ViewTask | Action::UpdateTask | Action::ViewComments | Action::CreateComment => {
            if context.task().is_none() {
                return Decision::Deny(DenyReason::MissingContext);
            }
            Decision::allow_if(board.is_member(requester), DenyReason::NotMember)
        }
        Action::DeleteTask => match context.task() {
            Some(task) => Decision::allow_if(
                task.created_by == requester || board.is_owner(requester),
                DenyReason::NotCreatorOrOwner,
            ),
            None => Decision::Deny(DenyReason::MissingContext),
        },
        Action::DeleteComment => match context.comment() {
            Some(comment) => {
                Decision::allow_if(comment.author_id == requester, DenyReason::NotAuthor)
            }
            None => Decision::Deny(DenyReason::MissingContext),
        },
    }
}

/// Like [`authorize`], but turns a denial into an error
///
/// # Errors
///
/// Returns `AuthzError::Denied` carrying the action and reason.
pub fn require(
    identity: &Identity,
    action: Action,
    context: &ResourceContext<'_>,
) -> Result<(), AuthzError> {
    match authorize(identity, action, context) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(AuthzError::Denied { action, reason }),
    }
}

/// Keeps only the boards `identity` may view
pub fn visible_boards(identity: &Identity, boards: Vec<Board>) -> Vec<Board> {
    boards
        .into_iter()
        .filter(|board| {
            authorize(identity, Action::ViewBoard, &ResourceContext::Board { board }).is_allowed()
        })
        .collect()
}

/// Keeps only the tasks `identity` may view
///
/// `boards` must hold each task's board; tasks whose board is absent are
/// dropped.
pub fn visible_tasks(
    identity: &Identity,
    tasks: Vec<Task>,
    boards: &HashMap<Uuid, Board>,
) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| match boards.get(&task.board_id) {
            Some(board) => {
                authorize(identity, Action::ViewTask, &ResourceContext::Task { board, task })
                    .is_allowed()
            }
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Utc;

    struct Fixture {
        owner: Uuid,
        member: Uuid,
        outsider: Uuid,
        board: Board,
        task: Task,
        comment: Comment,
    }

    /// Board owned by `owner` (not a member), with `member` as the only
    /// member; the task was created by `member`, the comment authored by
    /// `member`.
    fn fixture() -> Fixture {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let board = Board {
            id: Uuid::new_v4(),
            title: "Board".to_string(),
            owner_id: owner,
            member_ids: vec![member],
            created_at: Utc::now(),
        };
        let task = Task {
            id: Uuid::new_v4(),
            board_id: board.id,
            title: "Task".to_string(),
            description: String::new(),
            status: TaskStatus::ToDo,
            priority: TaskPriority::Medium,
            assignee_id: None,
            reviewer_id: None,
            due_date: None,
            created_by: member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: task.id,
            author_id: member,
            content: "hi".to_string(),
            created_at: Utc::now(),
        };
        Fixture {
            owner,
            member,
            outsider,
            board,
            task,
            comment,
        }
    }

    fn check(user: Uuid, action: Action, ctx: &ResourceContext<'_>) -> Decision {
        authorize(&Identity::new(user), action, ctx)
    }

    #[test]
    fn test_board_view_is_owner_or_member() {
        let f = fixture();
        let ctx = ResourceContext::Board { board: &f.board };

        for action in [Action::ViewBoard, Action::UpdateBoard] {
            assert!(check(f.owner, action, &ctx).is_allowed());
            assert!(check(f.member, action, &ctx).is_allowed());
            assert_eq!(
                check(f.outsider, action, &ctx),
                Decision::Deny(DenyReason::NotOwnerOrMember)
            );
        }
    }

    #[test]
    fn test_delete_board_owner_only() {
        let f = fixture();
        let ctx = ResourceContext::Board { board: &f.board };

        assert!(check(f.owner, Action::DeleteBoard, &ctx).is_allowed());
        assert_eq!(
            check(f.member, Action::DeleteBoard, &ctx),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_owner_not_in_members_cannot_touch_tasks() {
        let f = fixture();
        let board_ctx = ResourceContext::Board { board: &f.board };
        let task_ctx = ResourceContext::Task {
            board: &f.board,
            task: &f.task,
        };

        assert!(check(f.owner, Action::CreateTask, &board_ctx).is_denied());
        assert!(check(f.owner, Action::ViewTask, &task_ctx).is_denied());
        assert!(check(f.owner, Action::UpdateTask, &task_ctx).is_denied());
        assert!(check(f.owner, Action::CreateComment, &task_ctx).is_denied());

        assert!(check(f.member, Action::CreateTask, &board_ctx).is_allowed());
        assert!(check(f.member, Action::ViewComments, &task_ctx).is_allowed());
    }

    #[test]
    fn test_delete_task_creator_or_board_owner() {
        let mut f = fixture();
        let other_member = Uuid::new_v4();
        f.board.member_ids.push(other_member);
        let ctx = ResourceContext::Task {
            board: &f.board,
            task: &f.task,
        };

        assert!(check(f.member, Action::DeleteTask, &ctx).is_allowed());
        assert!(check(f.owner, Action::DeleteTask, &ctx).is_allowed());
        assert_eq!(
            check(other_member, Action::DeleteTask, &ctx),
            Decision::Deny(DenyReason::NotCreatorOrOwner)
        );
    }

    #[test]
    fn test_delete_comment_author_only() {
        let f = fixture();
        let ctx = ResourceContext::Comment {
            board: &f.board,
            task: &f.task,
            comment: &f.comment,
        };

        assert!(check(f.member, Action::DeleteComment, &ctx).is_allowed());
        assert_eq!(
            check(f.owner, Action::DeleteComment, &ctx),
            Decision::Deny(DenyReason::NotAuthor)
        );
    }

    #[test]
    fn test_missing_context_is_denied() {
        let f = fixture();
        let board_ctx = ResourceContext::Board { board: &f.board };
        let task_ctx = ResourceContext::Task {
            board: &f.board,
            task: &f.task,
        };

        assert_eq!(
            check(f.member, Action::ViewTask, &board_ctx),
            Decision::Deny(DenyReason::MissingContext)
        );
        assert_eq!(
            check(f.member, Action::DeleteComment, &task_ctx),
            Decision::Deny(DenyReason::MissingContext)
        );
    }

    #[test]
    fn test_inconsistent_context_is_denied() {
        let f = fixture();
        let mut foreign_task = f.task.clone();
        foreign_task.board_id = Uuid::new_v4();
        let ctx = ResourceContext::Task {
            board: &f.board,
            task: &foreign_task,
        };

        assert_eq!(
            check(f.member, Action::ViewTask, &ctx),
            Decision::Deny(DenyReason::MissingContext)
        );
    }

    #[test]
    fn test_require_maps_denial_to_error() {
        let f = fixture();
        let ctx = ResourceContext::Board { board: &f.board };

        assert!(require(&Identity::new(f.owner), Action::DeleteBoard, &ctx).is_ok());
        assert_eq!(
            require(&Identity::new(f.outsider), Action::DeleteBoard, &ctx),
            Err(AuthzError::Denied {
                action: Action::DeleteBoard,
                reason: DenyReason::NotOwner
            })
        );
    }

    #[test]
    fn test_mutable_fields() {
        assert!(Action::UpdateBoard.may_change(Field::Members));
        assert!(Action::UpdateTask.may_change(Field::DueDate));
        assert!(!Action::UpdateTask.may_change(Field::Board));
        assert!(Action::ViewTask.mutable_fields().is_empty());
    }

    #[test]
    fn test_visible_filters() {
        let f = fixture();
        let foreign_task = Task {
            id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
            ..f.task.clone()
        };
        let boards = HashMap::from([(f.board.id, f.board.clone())]);

        let visible = visible_tasks(
            &Identity::new(f.member),
            vec![f.task.clone(), foreign_task],
            &boards,
        );
        assert_eq!(visible, vec![f.task.clone()]);
        assert!(visible_tasks(&Identity::new(f.owner), vec![f.task.clone()], &boards).is_empty());

        assert_eq!(visible_boards(&Identity::new(f.owner), vec![f.board.clone()]).len(), 1);
        assert!(visible_boards(&Identity::new(f.outsider), vec![f.board.clone()]).is_empty());
    }
}
