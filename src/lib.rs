//! Bike rental server
//!
//! Backend for the rider app and the admin dashboard: bike directory and map,
//! ride sessions with billing, rental history, problem reports and fleet
//! management, over a json-server compatible store.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod ride;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication & own account
        .route("/auth/login", post(api::auth::login))
        .route("/auth/register", post(api::auth::register))
        .route("/auth/me", get(api::auth::me))
        .route("/auth/profile", put(api::auth::update_profile))
        .route("/auth/password", put(api::auth::change_password))
        // Bikes
        .route("/bikes", get(api::bikes::list_bikes).post(api::bikes::create_bike))
        .route("/bikes/available", get(api::bikes::list_available))
        .route(
            "/bikes/:id",
            get(api::bikes::get_bike)
                .patch(api::bikes::update_bike)
                .delete(api::bikes::delete_bike),
        )
        .route("/bikes/:id/status", put(api::bikes::set_status))
        .route(
            "/bike-types",
            get(api::bike_types::list_bike_types).post(api::bike_types::create_bike_type),
        )
        .route(
            "/bike-types/:id",
            axum::routing::patch(api::bike_types::rename_bike_type)
                .delete(api::bike_types::delete_bike_type),
        )
        // Map
        .route("/map/pins", get(api::map::list_pins))
        .route("/map/pins/stream", get(api::map::stream_pins))
        // Rides
        .route("/rides/current", get(api::rides::current))
        .route("/rides/select", post(api::rides::select))
        .route("/rides/cancel", post(api::rides::cancel))
        .route("/rides/start", post(api::rides::start))
        .route("/rides/stop", post(api::rides::stop))
        .route("/rides/photo", post(api::rides::attach_photo))
        .route("/rides/acknowledge", post(api::rides::acknowledge))
        .route("/rides/live", get(api::rides::live))
        // Rentals
        .route("/rentals", get(api::rentals::list_rentals))
        .route("/rentals/mine", get(api::rentals::my_rentals))
        .route(
            "/rentals/:id",
            get(api::rentals::get_rental).delete(api::rentals::delete_rental),
        )
        // Problems
        .route(
            "/problems",
            get(api::problems::list_problems).post(api::problems::submit_report),
        )
        .route("/problems/:id", axum::routing::delete(api::problems::delete_problem))
        .route("/problems/:id/status", put(api::problems::update_status))
        // Users
        .route("/users", get(api::users::list_users).post(api::users::create_user))
        .route(
            "/users/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(api::openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
