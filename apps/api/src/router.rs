use axum::{routing::get, Router};

use appointment_cell::appointment_routes;
use schedule_cell::schedule_routes;

use crate::state::Services;

pub fn create_router(services: Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/schedules", schedule_routes(services.schedules))
        .nest("/appointments", appointment_routes(services.appointments))
}
