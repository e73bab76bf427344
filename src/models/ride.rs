//! Ride session views returned to the rider app

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::pin::AvailableBike;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RidePhaseKind {
    Idle,
    Selecting,
    Active,
    EndingPhoto,
    EndingSummary,
}

/// Final figures of a stopped ride
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RideSummary {
    pub ride_id: Uuid,
    pub bike_id: i64,
    /// `MM:SS`
    pub elapsed: String,
    pub elapsed_seconds: u64,
    pub billed_minutes: u64,
    pub price_per_minute: i64,
    pub total_price: i64,
    pub rental_id: i64,
    /// False when the bike could not be handed back to the fleet
    pub bike_released: bool,
    pub photo: Option<String>,
}

/// Snapshot of a rider's ride session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RideView {
    pub phase: RidePhaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_id: Option<i64>,
    pub elapsed_seconds: u64,
    /// `MM:SS`
    pub elapsed: String,
    pub billed_minutes: u64,
    pub price_per_minute: i64,
    pub total_price: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<AvailableBike>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RideSummary>,
}

/// Start ride request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartRide {
    pub bike_id: i64,
}

/// Photo confirmation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachPhoto {
    /// Photo reference (uri or upload id)
    pub photo: Option<String>,
}
