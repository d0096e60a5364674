/// Board model
///
/// A board is the root of the trust domain: every task and comment resolves
/// to exactly one board, and access to them is decided by the board's owner
/// and member set.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE board_members (
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (board_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Board with its owner and member set
///
/// The owner is not required to appear in `member_ids`; board-level access
/// checks treat "owner or member" as a disjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Unique board ID
    pub id: Uuid,

    /// Board title
    pub title: String,

    /// The single owner, fixed at creation
    pub owner_id: Uuid,

    /// Member user IDs (sorted, no duplicates)
    pub member_ids: Vec<Uuid>,

    /// When the board was created
    pub created_at: DateTime<Utc>,
}

impl Board {
    /// Checks whether a user is in the member set
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// Checks whether a user owns the board
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Input for creating a new board
#[derive(Debug, Clone)]
pub struct CreateBoard {
    /// Board title
    pub title: String,

    /// Owner (the requesting user)
    pub owner_id: Uuid,

    /// Initial member set; always contains the owner
    pub member_ids: Vec<Uuid>,
}

/// Changes applied to an existing board
///
/// `None` leaves a field untouched. `member_ids` replaces the whole member
/// set when present.
#[derive(Debug, Clone, Default)]
pub struct BoardChanges {
    /// New title
    pub title: Option<String>,

    /// Replacement member set
    pub member_ids: Option<Vec<Uuid>>,
}

/// Sorts and de-duplicates a member ID list
pub fn dedup_member_ids(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_not_implicitly_member() {
        let owner = Uuid::new_v4();
        let board = Board {
            id: Uuid::new_v4(),
            title: "Sprint 1".to_string(),
            owner_id: owner,
            member_ids: vec![],
            created_at: Utc::now(),
        };

        assert!(board.is_owner(owner));
        assert!(!board.is_member(owner));
    }

    #[test]
    fn test_dedup_member_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = dedup_member_ids(vec![a, b, a, b, a]);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }
}
