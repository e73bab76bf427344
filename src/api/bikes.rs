//! Bike endpoints: rider selection list and fleet management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        bike::{Bike, BikePatch, BikeStatus, CreateBike, UpdateBikeStatus},
        pin::AvailableBike,
    },
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BikeListQuery {
    /// Only bikes with this status
    pub status: Option<BikeStatus>,
}

/// Bikes a rider can choose from
#[utoipa::path(
    get,
    path = "/bikes/available",
    tag = "bikes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available bikes", body = Vec<AvailableBike>)
    )
)]
pub async fn list_available(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Json<Vec<AvailableBike>> {
    Json(state.services.directory.list_available_bikes().await)
}

/// List the fleet (admin)
#[utoipa::path(
    get,
    path = "/bikes",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(BikeListQuery),
    responses(
        (status = 200, description = "Bikes", body = Vec<Bike>),
        (status = 403, description = "Administrator only")
    )
)]
pub async fn list_bikes(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BikeListQuery>,
) -> AppResult<Json<Vec<Bike>>> {
    claims.require_admin()?;
    let bikes = state.services.fleet.list_bikes(query.status).await?;
    Ok(Json(bikes))
}

/// Get a bike by number
#[utoipa::path(
    get,
    path = "/bikes/{id}",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Bike number")),
    responses(
        (status = 200, description = "Bike", body = Bike),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn get_bike(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Bike>> {
    let bike = state.services.fleet.get_bike(id).await?;
    Ok(Json(bike))
}

/// Add a bike to the fleet (admin)
#[utoipa::path(
    post,
    path = "/bikes",
    tag = "bikes",
    security(("bearer_auth" = [])),
    request_body = CreateBike,
    responses(
        (status = 201, description = "Bike created", body = Bike),
        (status = 400, description = "Missing type or price"),
        (status = 409, description = "Bike number already in use")
    )
)]
pub async fn create_bike(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBike>,
) -> AppResult<(StatusCode, Json<Bike>)> {
    claims.require_admin()?;
    let bike = state.services.fleet.create_bike(request).await?;
    Ok((StatusCode::CREATED, Json(bike)))
}

/// Edit a bike (admin)
#[utoipa::path(
    patch,
    path = "/bikes/{id}",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Bike number")),
    request_body = BikePatch,
    responses(
        (status = 200, description = "Bike updated", body = Bike),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn update_bike(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(patch): Json<BikePatch>,
) -> AppResult<Json<Bike>> {
    claims.require_admin()?;
    let bike = state.services.fleet.update_bike(id, patch).await?;
    Ok(Json(bike))
}

/// Override a bike's status (admin)
#[utoipa::path(
    put,
    path = "/bikes/{id}/status",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Bike number")),
    request_body = UpdateBikeStatus,
    responses(
        (status = 200, description = "Status changed", body = Bike),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateBikeStatus>,
) -> AppResult<Json<Bike>> {
    claims.require_admin()?;
    let bike = state.services.fleet.set_status(id, request.status).await?;
    Ok(Json(bike))
}

/// Remove a bike (admin)
#[utoipa::path(
    delete,
    path = "/bikes/{id}",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Bike number")),
    responses(
        (status = 204, description = "Bike deleted"),
        (status = 404, description = "Bike not found")
    )
)]
pub async fn delete_bike(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.fleet.delete_bike(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
