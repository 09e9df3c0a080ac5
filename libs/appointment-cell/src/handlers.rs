// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::actor::{Action, Actor, ResourceType};

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentView, AvailabilityQuery,
    CancelAppointmentRequest, CreateAppointmentRequest, RescheduleAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::router::AppointmentCellState;

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::SlotUnavailable(msg) => AppError::SlotUnavailable(msg),
            AppointmentError::InvalidState { action, reason } => AppError::InvalidState {
                action: action.to_string(),
                reason,
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// ACCESS HELPERS
// ==============================================================================

fn authorize(state: &AppointmentCellState, actor: &Actor, action: Action) -> Result<(), AppError> {
    if state
        .permissions
        .can_perform(actor, action, ResourceType::Appointment)
    {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} may not {} appointments",
            actor.role(),
            action
        )))
    }
}

/// Patients only ever act on their own appointments.
fn ensure_patient_scope(actor: &Actor, patient_id: Uuid) -> Result<(), AppError> {
    if actor.privileged || actor.role() != "patient" || actor.user_id == patient_id.to_string() {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "Patients can only access their own appointments".to_string(),
    ))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

async fn load_in_scope(
    state: &AppointmentCellState,
    actor: &Actor,
    appointment_id: Uuid,
) -> Result<Appointment, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;
    ensure_patient_scope(actor, appointment.patient_id)?;
    Ok(appointment)
}

fn appointment_response(appointment: Appointment, message: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment),
        "message": message
    }))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::View)?;

    let availability = state
        .availability
        .day_availability(query.doctor_id, query.date)
        .await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": availability.doctor_id,
        "date": availability.date,
        "slots": availability.slots
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Create)?;
    let request = json_body(payload)?;
    ensure_patient_scope(&actor, request.patient_id)?;

    let appointment = state.booking.create_appointment(request).await?;

    Ok(appointment_response(appointment, "Appointment booked"))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Query(mut query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::View)?;

    if !actor.privileged && actor.role() == "patient" {
        let own_id = Uuid::parse_str(&actor.user_id)
            .map_err(|_| AppError::Forbidden("Patient identity is not a valid id".to_string()))?;
        query.patient_id = Some(own_id);
    }

    let appointments: Vec<AppointmentView> = state
        .booking
        .list_appointments(&query)
        .await?
        .into_iter()
        .map(AppointmentView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::View)?;

    let appointment = load_in_scope(&state, &actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": AppointmentView::from(appointment)
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    payload: Result<Json<UpdateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Edit)?;
    let request = json_body(payload)?;
    load_in_scope(&state, &actor, appointment_id).await?;

    let appointment = state
        .booking
        .update_appointment(appointment_id, request, &actor)
        .await?;

    Ok(appointment_response(appointment, "Appointment updated"))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    payload: Result<Json<CancelAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Cancel)?;
    load_in_scope(&state, &actor, appointment_id).await?;

    // The body is optional: a bare POST cancels without a reason
    let reason = payload.ok().and_then(|Json(body)| body.reason);
    let appointment = state
        .booking
        .cancel_appointment(appointment_id, reason, &actor)
        .await?;

    Ok(appointment_response(appointment, "Appointment cancelled"))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    payload: Result<Json<RescheduleAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Reschedule)?;
    let request = json_body(payload)?;
    load_in_scope(&state, &actor, appointment_id).await?;

    let appointment = state
        .rescheduling
        .reschedule(appointment_id, request.new_date, &actor)
        .await?;

    Ok(appointment_response(appointment, "Appointment rescheduled"))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Delete)?;
    load_in_scope(&state, &actor, appointment_id).await?;

    state.booking.delete_appointment(appointment_id, &actor).await?;
    debug!("Delete of {} acknowledged", appointment_id);

    Ok(Json(json!({
        "success": true,
        "id": appointment_id,
        "message": "Appointment deleted"
    })))
}
