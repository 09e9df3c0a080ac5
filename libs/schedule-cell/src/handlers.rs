// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::actor::{Action, Actor, ResourceType};

use crate::models::{
    day_of_week_for, CreateScheduleBlockRequest, ScheduleError, SlotsQuery,
    UpdateScheduleBlockRequest,
};
use crate::router::ScheduleCellState;

impl From<ScheduleError> for AppError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::NotFound => AppError::NotFound("Schedule block not found".to_string()),
            ScheduleError::ValidationError(msg) => AppError::ValidationError(msg),
            overlap @ ScheduleError::Overlap { .. } => AppError::Conflict(overlap.to_string()),
            ScheduleError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

fn authorize(state: &ScheduleCellState, actor: &Actor, action: Action) -> Result<(), AppError> {
    if state
        .permissions
        .can_perform(actor, action, ResourceType::ScheduleBlock)
    {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} may not {} schedule blocks",
            actor.role(),
            action
        )))
    }
}

#[axum::debug_handler]
pub async fn list_blocks(
    State(state): State<Arc<ScheduleCellState>>,
    Extension(actor): Extension<Actor>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::View)?;

    let blocks = state.schedules.list_blocks(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "blocks": blocks,
        "total": blocks.len()
    })))
}

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<ScheduleCellState>>,
    Extension(actor): Extension<Actor>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<CreateScheduleBlockRequest>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Create)?;

    let block = state.schedules.create_block(doctor_id, request).await?;
    info!("{} created schedule block {}", actor.user_id, block.id);

    Ok(Json(json!({
        "success": true,
        "block": block,
        "message": "Schedule block created"
    })))
}

#[axum::debug_handler]
pub async fn update_block(
    State(state): State<Arc<ScheduleCellState>>,
    Extension(actor): Extension<Actor>,
    Path((doctor_id, block_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateScheduleBlockRequest>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Edit)?;

    let block = state.schedules.update_block(doctor_id, block_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "block": block,
        "message": "Schedule block updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<ScheduleCellState>>,
    Extension(actor): Extension<Actor>,
    Path((doctor_id, block_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::Delete)?;

    state.schedules.delete_block(doctor_id, block_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule block deleted"
    })))
}

/// Candidate slots of a date before any booking is taken into account.
#[axum::debug_handler]
pub async fn get_candidate_slots(
    State(state): State<Arc<ScheduleCellState>>,
    Extension(actor): Extension<Actor>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &actor, Action::View)?;

    let slots = state.slots.generate(doctor_id, query.date).await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "date": query.date,
        "day_of_week": day_of_week_for(query.date),
        "slots": slots,
        "total": slots.len()
    })))
}
