/// User lookup endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/email-check?email=ada@example.com
/// ```
///
/// # Response
///
/// ```json
/// { "id": "uuid", "email": "ada@example.com", "fullname": "Ada Lovelace" }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::Deserialize;
use taskboard_shared::{auth::middleware::Identity, models::user::UserSummary};

#[derive(Debug, Deserialize)]
pub struct EmailCheckQuery {
    pub email: Option<String>,
}

pub async fn email_check(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<EmailCheckQuery>,
) -> ApiResult<Json<UserSummary>> {
    let user = state
        .services
        .users
        .email_check(&identity, query.email.as_deref())
        .await?;

    Ok(Json(user))
}
