use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use barberflow_db::models::UserRow;
use barberflow_types::models::Plan;
use tracing::debug;

use crate::auth::decode_token;
use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Validate the bearer JWT, load its user and attach the [`UserRow`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".into()))?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized("Not authorized, token failed".into())
    })?;

    let user_id = claims.sub;
    let user = with_db(&state, move |db| Ok(db.get_user_by_id(user_id)?))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, user not found".into()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Runs after [`require_auth`]: free-plan users get 403 on premium routes.
pub async fn require_paid_plan(req: Request, next: Next) -> Result<Response, ApiError> {
    let plan = req
        .extensions()
        .get::<UserRow>()
        .map(|user| user.plan)
        .unwrap_or(Plan::Free);
    if !plan.is_paid() {
        return Err(ApiError::Forbidden("Upgrade required".into()));
    }
    Ok(next.run(req).await)
}
