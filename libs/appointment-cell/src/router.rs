// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::actor::PermissionChecker;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{AvailabilityResolver, BookingService, ReschedulingService};

pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingService>,
    pub rescheduling: Arc<ReschedulingService>,
    pub availability: Arc<AvailabilityResolver>,
    pub permissions: Arc<dyn PermissionChecker>,
}

pub fn appointment_routes(state: Arc<AppointmentCellState>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/availability", get(handlers::get_availability))
        .route(
            "/",
            post(handlers::create_appointment).get(handlers::list_appointments),
        )
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .patch(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
