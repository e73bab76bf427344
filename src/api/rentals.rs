//! Rental history endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{error::AppResult, models::rental::Rental, AppState};

use super::AuthenticatedUser;

/// Rentals of the signed-in rider
#[utoipa::path(
    get,
    path = "/rentals/mine",
    tag = "rentals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own rentals", body = Vec<Rental>)
    )
)]
pub async fn my_rentals(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Rental>>> {
    let rentals = state.services.rentals.list_for_user(claims.user_id).await?;
    Ok(Json(rentals))
}

/// All rentals (admin)
#[utoipa::path(
    get,
    path = "/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rentals", body = Vec<Rental>),
        (status = 403, description = "Administrator only")
    )
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Rental>>> {
    claims.require_admin()?;
    Ok(Json(state.services.rentals.list_all().await?))
}

/// Rental details (admin)
#[utoipa::path(
    get,
    path = "/rentals/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental", body = Rental),
        (status = 404, description = "Rental not found")
    )
)]
pub async fn get_rental(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Rental>> {
    claims.require_admin()?;
    Ok(Json(state.services.rentals.get(id).await?))
}

/// Delete a rental (admin)
#[utoipa::path(
    delete,
    path = "/rentals/{id}",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Rental ID")),
    responses(
        (status = 204, description = "Rental deleted"),
        (status = 404, description = "Rental not found")
    )
)]
pub async fn delete_rental(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.rentals.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
