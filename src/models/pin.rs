//! Map pin model: bikes and parking spots in one shape

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::bike::{Bike, BikeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    Bike,
    Parking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BikePinInfo {
    pub bike_id: i64,
    pub address: String,
    pub bike_type: String,
    pub price_per_minute: i64,
    pub battery: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParkingPinInfo {
    pub address: String,
}

/// A map-plottable point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    /// `b<id>` for bikes, `p<id>` for parkings
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PinKind,
    pub latitude: f64,
    pub longitude: f64,
    /// Distance from the rider in metres, when the rider position is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_info: Option<BikePinInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_info: Option<ParkingPinInfo>,
}

/// Rider-side pin filter
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PinQuery {
    /// Show bike pins
    #[serde(default = "default_true")]
    pub bikes: bool,
    /// Show parking pins
    #[serde(default = "default_true")]
    pub parking: bool,
    /// Bike status to show (defaults to available bikes)
    pub status: Option<BikeStatus>,
    /// Rider latitude
    pub lat: Option<f64>,
    /// Rider longitude
    pub lon: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for PinQuery {
    fn default() -> Self {
        Self {
            bikes: true,
            parking: true,
            status: None,
            lat: None,
            lon: None,
        }
    }
}

impl PinQuery {
    pub fn bike_status(&self) -> BikeStatus {
        self.status.unwrap_or(BikeStatus::Available)
    }

    pub fn rider_position(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

/// Bike offered in the selection list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AvailableBike {
    pub id: i64,
    /// `#<id> (<type>)`
    pub label: String,
    pub bike: Bike,
}

impl From<Bike> for AvailableBike {
    fn from(bike: Bike) -> Self {
        let tip = if bike.tip.trim().is_empty() {
            "bicikl"
        } else {
            bike.tip.as_str()
        };
        Self {
            id: bike.id,
            label: format!("#{} ({})", bike.id, tip),
            bike,
        }
    }
}
