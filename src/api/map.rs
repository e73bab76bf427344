//! Rider map endpoints: pins and the live pin feed

use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::{
    models::pin::{Pin, PinQuery},
    AppState,
};

use super::AuthenticatedUser;

/// Bike and parking pins
#[utoipa::path(
    get,
    path = "/map/pins",
    tag = "map",
    security(("bearer_auth" = [])),
    params(PinQuery),
    responses(
        (status = 200, description = "Map pins; empty when the store cannot be reached", body = Vec<Pin>)
    )
)]
pub async fn list_pins(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PinQuery>,
) -> Json<Vec<Pin>> {
    Json(state.services.directory.list_map_pins(&query).await)
}

/// Server-sent events carrying a fresh pin list on every refresh
#[utoipa::path(
    get,
    path = "/map/pins/stream",
    tag = "map",
    security(("bearer_auth" = [])),
    params(PinQuery),
    responses(
        (status = 200, description = "`text/event-stream` of pin lists")
    )
)]
pub async fn stream_pins(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PinQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let feed = state.services.directory.pin_feed(query);
    let stream = WatchStream::from_changes(feed)
        .map(|pins| Event::default().event("pins").json_data(pins));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
