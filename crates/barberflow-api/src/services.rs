use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use barberflow_db::models::{NewService, ServiceUpdate, UserRow};
use barberflow_types::api::{CreateServiceRequest, MessageResponse, UpdateServiceRequest};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, with_db};

const NOT_OWNED: &str = "Service not found or unauthorized";

pub async fn list_services(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
) -> Result<impl IntoResponse, ApiError> {
    let barber_id = user.id;
    let services = with_db(&state, move |db| Ok(db.list_services(barber_id)?)).await?;
    Ok(Json(services))
}

pub async fn create_service(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiJson(req): ApiJson<CreateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Service name is required"));
    }
    validate_terms(Some(req.duration), Some(req.price))?;

    let barber_id = user.id;
    let service = with_db(&state, move |db| {
        Ok(db.create_service(
            barber_id,
            &NewService {
                name: &name,
                description: req.description.as_deref(),
                duration: req.duration,
                price: req.price,
                category: req.category.as_deref(),
            },
        )?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update_service(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateServiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_terms(req.duration, req.price)?;
    let name = req.name.map(|n| n.trim().to_string());
    if name.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::bad_request("Service name is required"));
    }

    let update = ServiceUpdate {
        name,
        description: req.description,
        duration: req.duration,
        price: req.price,
        category: req.category,
        is_active: req.is_active,
    };
    let barber_id = user.id;
    let service = with_db(&state, move |db| Ok(db.update_service(barber_id, id, &update)?))
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_OWNED))?;

    Ok(Json(service))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let barber_id = user.id;
    let deleted = with_db(&state, move |db| Ok(db.delete_service(barber_id, id)?)).await?;
    if !deleted {
        return Err(ApiError::not_found(NOT_OWNED));
    }
    Ok(Json(MessageResponse::new("Service removed")))
}

fn validate_terms(duration: Option<i64>, price: Option<f64>) -> Result<(), ApiError> {
    if duration.is_some_and(|d| d <= 0) {
        return Err(ApiError::bad_request("Duration must be a positive number of minutes"));
    }
    if price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    Ok(())
}
