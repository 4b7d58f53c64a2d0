use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use barberflow_db::StoreError;
use barberflow_db::models::{NewAppointment, UserRow};
use barberflow_types::api::{
    AppointmentQuery, CreateAppointmentRequest, MessageResponse, UpdateAppointmentStatusRequest,
};
use barberflow_types::models::AppointmentStatus;
use barberflow_types::schedule::TimeSlot;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::{AppState, with_db};

/// `?start=&end=` only filters when both bounds are present.
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = query.start.zip(query.end);
    let barber_id = user.id;
    let appointments =
        with_db(&state, move |db| Ok(db.list_appointments(barber_id, window)?)).await?;
    Ok(Json(appointments))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiJson(req): ApiJson<CreateAppointmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client_name = req.client_name.trim().to_string();
    let client_email = req.client_email.trim().to_string();
    if client_name.is_empty() || client_email.is_empty() {
        return Err(ApiError::bad_request("Client name and email are required"));
    }

    let barber_id = user.id;
    let service_id = req.service_id;
    let appointment = with_db(&state, move |db| {
        let service = db
            .get_service(barber_id, service_id)?
            .ok_or_else(|| ApiError::not_found("Service not found"))?;
        let slot = TimeSlot::for_duration(req.start_time, service.duration)
            .ok_or_else(|| ApiError::bad_request("Invalid appointment time"))?;

        db.book_appointment(&NewAppointment {
            client_name: &client_name,
            client_email: &client_email,
            service_id,
            barber_id,
            slot,
            price: service.price,
            notes: req.notes.as_deref(),
            status: AppointmentStatus::Confirmed,
        })
        .map_err(|e| {
            if matches!(e, StoreError::SlotTaken) {
                warn!(%barber_id, start = %slot.start, end = %slot.end, "Booking conflict");
            }
            ApiError::from(e)
        })
    })
    .await?;

    info!(appointment_id = %appointment.id, %barber_id, "Appointment booked");
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAppointmentStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let barber_id = user.id;
    let appointment = with_db(&state, move |db| {
        Ok(db.update_appointment_status(barber_id, id, req.status)?)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    Ok(Json(appointment))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<UserRow>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let barber_id = user.id;
    let deleted = with_db(&state, move |db| Ok(db.delete_appointment(barber_id, id)?)).await?;
    if !deleted {
        return Err(ApiError::not_found("Appointment not found"));
    }
    Ok(Json(MessageResponse::new("Appointment removed")))
}
