/// User lookups for authenticated callers

use std::sync::Arc;

use tracing::debug;

use super::{ServiceError, ServiceResult};
use crate::auth::middleware::Identity;
use crate::models::user::{normalize_email, UserSummary};
use crate::store::ResourceStore;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn ResourceStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Looks up a registered user by email
    ///
    /// Used by clients to resolve an address into a user ID before adding
    /// them to a board.
    ///
    /// # Errors
    ///
    /// - `Validation("email")` if the email is missing or blank
    /// - `NotFound("user")` if nobody registered with it
    pub async fn email_check(
        &self,
        identity: &Identity,
        email: Option<&str>,
    ) -> ServiceResult<UserSummary> {
        let email = email.map(normalize_email).unwrap_or_default();
        if email.is_empty() {
            return Err(ServiceError::validation("email", "Email required."));
        }

        debug!(user_id = %identity.user_id, "Email lookup");
        self.store
            .find_user_by_email(&email)
            .await?
            .map(|user| UserSummary::from(&user))
            .ok_or(ServiceError::NotFound("user"))
    }
}
