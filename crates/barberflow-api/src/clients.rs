use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use barberflow_db::StoreError;
use barberflow_db::models::{ClientUpdate, NewClient, UserRow};
use barberflow_types::api::{CreateClientRequest, MessageResponse, UpdateClientRequest};

use crate::auth::normalize_email;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, with_db};

const DUPLICATE_EMAIL: &str = "Client with this email already exists";

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
) -> Result<impl IntoResponse, ApiError> {
    let shop_id = user.id;
    let clients = with_db(&state, move |db| Ok(db.list_clients(shop_id)?)).await?;
    Ok(Json(clients))
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiJson(req): ApiJson<CreateClientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::bad_request("Client name and email are required"));
    }

    let shop_id = user.id;
    let client = with_db(&state, move |db| {
        db.create_client(
            shop_id,
            &NewClient {
                name: &name,
                email: &email,
                phone: req.phone.as_deref(),
                notes: req.notes.as_deref(),
            },
        )
        .map_err(duplicate_as_bad_request)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateClientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.map(|n| n.trim().to_string());
    let email = req.email.map(|e| normalize_email(&e));
    if name.as_deref().is_some_and(str::is_empty) || email.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::bad_request("Client name and email cannot be blank"));
    }

    let update = ClientUpdate {
        name,
        email,
        phone: req.phone,
        notes: req.notes,
        status: req.status,
    };
    let shop_id = user.id;
    let client = with_db(&state, move |db| {
        db.update_client(shop_id, id, &update)
            .map_err(duplicate_as_bad_request)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Client not found"))?;

    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let shop_id = user.id;
    let deleted = with_db(&state, move |db| Ok(db.delete_client(shop_id, id)?)).await?;
    if !deleted {
        return Err(ApiError::not_found("Client not found"));
    }
    Ok(Json(MessageResponse::new("Client deleted successfully")))
}

fn duplicate_as_bad_request(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate => ApiError::bad_request(DUPLICATE_EMAIL),
        other => other.into(),
    }
}
