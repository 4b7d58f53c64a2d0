use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use barberflow_db::models::UserRow;
use barberflow_types::api::TrendsQuery;

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::{AppState, with_db};

const DEFAULT_TREND_DAYS: u32 = 7;
const MAX_TREND_DAYS: u32 = 366;

pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
) -> Result<impl IntoResponse, ApiError> {
    let barber_id = user.id;
    let stats = with_db(&state, move |db| Ok(db.dashboard_stats(barber_id)?)).await?;
    Ok(Json(stats))
}

pub async fn revenue_trends(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiQuery(query): ApiQuery<TrendsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let since = Utc::now() - Duration::days(i64::from(trend_window(query.days)));
    let barber_id = user.id;
    let points = with_db(&state, move |db| Ok(db.revenue_trends(barber_id, since)?)).await?;
    Ok(Json(points))
}

pub async fn service_distribution(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
) -> Result<impl IntoResponse, ApiError> {
    let barber_id = user.id;
    let shares = with_db(&state, move |db| Ok(db.service_distribution(barber_id)?)).await?;
    Ok(Json(shares))
}

/// Zero falls back to the default; anything past a year is clamped.
fn trend_window(days: u32) -> u32 {
    match days {
        0 => DEFAULT_TREND_DAYS,
        d => d.min(MAX_TREND_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_window_bounds() {
        assert_eq!(trend_window(0), 7);
        assert_eq!(trend_window(30), 30);
        assert_eq!(trend_window(100_000), MAX_TREND_DAYS);
    }
}
