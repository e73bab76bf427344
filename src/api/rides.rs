//! Ride session endpoints for the rider app

use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::{
    error::AppResult,
    models::ride::{AttachPhoto, RideSummary, RideView, StartRide},
    AppState,
};

use super::AuthenticatedUser;

/// Current ride session
#[utoipa::path(
    get,
    path = "/rides/current",
    tag = "rides",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session view", body = RideView)
    )
)]
pub async fn current(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Json<RideView> {
    Json(state.services.rides.view(claims.user_id).await)
}

/// Open the bike selection
#[utoipa::path(
    post,
    path = "/rides/select",
    tag = "rides",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Selecting, with the available bikes", body = RideView),
        (status = 422, description = "A ride is already in progress")
    )
)]
pub async fn select(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RideView>> {
    claims.require_rider()?;
    Ok(Json(state.services.rides.select(claims.user_id).await?))
}

/// Close the bike selection
#[utoipa::path(
    post,
    path = "/rides/cancel",
    tag = "rides",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Back to idle", body = RideView),
        (status = 422, description = "Not selecting")
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RideView>> {
    Ok(Json(state.services.rides.cancel(claims.user_id).await?))
}

/// Reserve a bike and start riding
#[utoipa::path(
    post,
    path = "/rides/start",
    tag = "rides",
    security(("bearer_auth" = [])),
    request_body = StartRide,
    responses(
        (status = 200, description = "Ride started", body = RideView),
        (status = 409, description = "Bike is no longer available"),
        (status = 422, description = "Not selecting")
    )
)]
pub async fn start(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<StartRide>,
) -> AppResult<Json<RideView>> {
    Ok(Json(state.services.rides.start(&claims, request.bike_id).await?))
}

/// Stop the ride, record the rental and hand the bike back
#[utoipa::path(
    post,
    path = "/rides/stop",
    tag = "rides",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ride stopped; waiting for the parking photo", body = RideView),
        (status = 422, description = "No active ride"),
        (status = 502, description = "Rental could not be recorded; the ride continues")
    )
)]
pub async fn stop(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RideView>> {
    Ok(Json(state.services.rides.stop(&claims).await?))
}

/// Confirm the parking photo
#[utoipa::path(
    post,
    path = "/rides/photo",
    tag = "rides",
    security(("bearer_auth" = [])),
    request_body = AttachPhoto,
    responses(
        (status = 200, description = "Ride summary", body = RideSummary),
        (status = 400, description = "Photo missing"),
        (status = 422, description = "No photo expected")
    )
)]
pub async fn attach_photo(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AttachPhoto>,
) -> AppResult<Json<RideSummary>> {
    let summary = state
        .services
        .rides
        .attach_photo(claims.user_id, request.photo)
        .await?;
    Ok(Json(summary))
}

/// Close the summary
#[utoipa::path(
    post,
    path = "/rides/acknowledge",
    tag = "rides",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Back to idle", body = RideView),
        (status = 422, description = "No summary shown")
    )
)]
pub async fn acknowledge(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<RideView>> {
    Ok(Json(state.services.rides.acknowledge(claims.user_id).await?))
}

/// Server-sent events with the session view on every timer tick
#[utoipa::path(
    get,
    path = "/rides/live",
    tag = "rides",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "`text/event-stream` of ride views")
    )
)]
pub async fn live(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let feed = state.services.rides.live(claims.user_id);
    let stream = WatchStream::from_changes(feed)
        .filter_map(|view| view)
        .map(|view| Event::default().event("ride").json_data(view));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
