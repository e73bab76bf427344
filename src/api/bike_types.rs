//! Bike type lookup endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::bike::{BikeType, BikeTypeInput},
    AppState,
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/bike-types",
    tag = "bikes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bike types", body = Vec<BikeType>)
    )
)]
pub async fn list_bike_types(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BikeType>>> {
    Ok(Json(state.services.fleet.list_bike_types().await?))
}

#[utoipa::path(
    post,
    path = "/bike-types",
    tag = "bikes",
    security(("bearer_auth" = [])),
    request_body = BikeTypeInput,
    responses(
        (status = 201, description = "Bike type created", body = BikeType),
        (status = 409, description = "Type already exists")
    )
)]
pub async fn create_bike_type(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BikeTypeInput>,
) -> AppResult<(StatusCode, Json<BikeType>)> {
    claims.require_admin()?;
    let bike_type = state.services.fleet.create_bike_type(request).await?;
    Ok((StatusCode::CREATED, Json(bike_type)))
}

#[utoipa::path(
    patch,
    path = "/bike-types/{id}",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Bike type ID")),
    request_body = BikeTypeInput,
    responses(
        (status = 200, description = "Bike type renamed", body = BikeType),
        (status = 404, description = "Bike type not found")
    )
)]
pub async fn rename_bike_type(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<BikeTypeInput>,
) -> AppResult<Json<BikeType>> {
    claims.require_admin()?;
    Ok(Json(state.services.fleet.rename_bike_type(id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/bike-types/{id}",
    tag = "bikes",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Bike type ID")),
    responses(
        (status = 204, description = "Bike type deleted"),
        (status = 404, description = "Bike type not found")
    )
)]
pub async fn delete_bike_type(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.fleet.delete_bike_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
