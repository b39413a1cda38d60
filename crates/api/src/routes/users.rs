//! Identity registration.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct RegisteredResponse {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

/// POST /api/v1/users — create a user identity and issue its bearer token.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let user = state.users.register(&req.email).await?;
    let token = state.tokens.issue(user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            user_id: user.id.to_string(),
            email: user.email,
            token,
        }),
    ))
}
