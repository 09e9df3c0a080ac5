// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::actor::PermissionChecker;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{ScheduleService, SlotGenerator};

/// Everything the schedule handlers need, shared behind one `Arc`.
pub struct ScheduleCellState {
    pub config: Arc<AppConfig>,
    pub schedules: Arc<ScheduleService>,
    pub slots: Arc<SlotGenerator>,
    pub permissions: Arc<dyn PermissionChecker>,
}

pub fn schedule_routes(state: Arc<ScheduleCellState>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/doctors/{doctor_id}/blocks",
            get(handlers::list_blocks).post(handlers::create_block),
        )
        .route(
            "/doctors/{doctor_id}/blocks/{block_id}",
            put(handlers::update_block).delete(handlers::delete_block),
        )
        .route("/doctors/{doctor_id}/slots", get(handlers::get_candidate_slots))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
