//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, bike_types, bikes, health, map, problems, rentals, rides, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bike Rental API",
        version = "1.0.0",
        description = "Rider and fleet management REST API for the bike rental service",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        auth::update_profile,
        auth::change_password,
        // Bikes
        bikes::list_available,
        bikes::list_bikes,
        bikes::get_bike,
        bikes::create_bike,
        bikes::update_bike,
        bikes::set_status,
        bikes::delete_bike,
        bike_types::list_bike_types,
        bike_types::create_bike_type,
        bike_types::rename_bike_type,
        bike_types::delete_bike_type,
        // Map
        map::list_pins,
        map::stream_pins,
        // Rides
        rides::current,
        rides::select,
        rides::cancel,
        rides::start,
        rides::stop,
        rides::attach_photo,
        rides::acknowledge,
        rides::live,
        // Rentals
        rentals::my_rentals,
        rentals::list_rentals,
        rentals::get_rental,
        rentals::delete_rental,
        // Problems
        problems::submit_report,
        problems::list_problems,
        problems::update_status,
        problems::delete_problem,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            // Auth & users
            crate::models::user::Role,
            crate::models::user::ClientApp,
            crate::models::user::UserInfo,
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::RegisterUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateProfile,
            crate::models::user::ChangePassword,
            // Bikes
            crate::models::bike::Bike,
            crate::models::bike::BikeStatus,
            crate::models::bike::BikePatch,
            crate::models::bike::CreateBike,
            crate::models::bike::UpdateBikeStatus,
            crate::models::bike::BikeType,
            crate::models::bike::BikeTypeInput,
            crate::models::bike::Parking,
            // Map
            crate::models::pin::Pin,
            crate::models::pin::PinKind,
            crate::models::pin::BikePinInfo,
            crate::models::pin::ParkingPinInfo,
            crate::models::pin::AvailableBike,
            // Rides
            crate::models::ride::RidePhaseKind,
            crate::models::ride::RideView,
            crate::models::ride::RideSummary,
            crate::models::ride::StartRide,
            crate::models::ride::AttachPhoto,
            // Rentals
            crate::models::rental::Rental,
            // Problems
            crate::models::problem::Problem,
            crate::models::problem::ProblemStatus,
            crate::models::problem::SubmitReport,
            crate::models::problem::UpdateProblemStatus,
            crate::models::problem::ProblemTriage,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login, registration and own account"),
        (name = "bikes", description = "Bikes and bike types"),
        (name = "map", description = "Rider map pins"),
        (name = "rides", description = "Ride sessions"),
        (name = "rentals", description = "Rental history"),
        (name = "problems", description = "Problem reports"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
