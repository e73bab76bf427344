//! Bike, bike type and parking models

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Battery level assumed for electric bikes that do not report one
pub const FULL_BATTERY: i64 = 100;

/// Bike status as stored in the `bikes` resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BikeStatus {
    #[serde(rename = "Dostupan")]
    Available,
    #[serde(rename = "Iznajmljen")]
    Rented,
    #[serde(rename = "Neispravan")]
    Broken,
    #[serde(rename = "Na održavanju")]
    Maintenance,
}

impl BikeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BikeStatus::Available => "Dostupan",
            BikeStatus::Rented => "Iznajmljen",
            BikeStatus::Broken => "Neispravan",
            BikeStatus::Maintenance => "Na održavanju",
        }
    }
}

impl std::fmt::Display for BikeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BikeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Dostupan" => Ok(BikeStatus::Available),
            "Iznajmljen" => Ok(BikeStatus::Rented),
            "Neispravan" => Ok(BikeStatus::Broken),
            "Na održavanju" => Ok(BikeStatus::Maintenance),
            other => Err(format!("Invalid bike status: {}", other)),
        }
    }
}

/// Whether a bike type label denotes an electric bike ("Električni")
pub fn is_electric(tip: &str) -> bool {
    tip.trim().to_lowercase().starts_with("elektri")
}

/// Trimmed label, rejecting input made only of whitespace
fn required_label(value: &str, message: &str) -> AppResult<String> {
    let label = value.trim();
    if label.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(label.to_string())
}

/// Battery level a bike of the given type is allowed to carry.
///
/// Non-electric bikes always report 0, electric bikes default to a full
/// battery and are clamped to 0..=100.
pub fn normalize_battery(tip: &str, baterija: Option<i64>) -> i64 {
    if is_electric(tip) {
        baterija.unwrap_or(FULL_BATTERY).clamp(0, FULL_BATTERY)
    } else {
        0
    }
}

/// Bike as stored in the `bikes` resource
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Bike {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    /// Bike type label
    pub tip: String,
    /// Price per minute (RSD)
    pub cena: i64,
    pub status: BikeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Battery percentage (electric bikes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baterija: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adresa: Option<String>,
    /// Image reference shown in the rider app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slika: Option<String>,
}

impl Bike {
    pub fn is_available(&self) -> bool {
        self.status == BikeStatus::Available
    }

    pub fn has_position(&self) -> bool {
        matches!((self.latitude, self.longitude), (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0)
    }
}

/// Create bike request (admin)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBike {
    /// Explicit id; a random five digit id is assigned when omitted
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "Bike type is required"))]
    pub tip: String,
    #[validate(range(min = 1, message = "Price per minute must be positive"))]
    pub cena: i64,
    pub status: Option<BikeStatus>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub baterija: Option<i64>,
    pub adresa: Option<String>,
    pub slika: Option<String>,
}

impl CreateBike {
    /// Validate the request and trim the bike type
    pub fn normalized(mut self) -> AppResult<Self> {
        self.validate()?;
        self.tip = required_label(&self.tip, "Bike type is required")?;
        Ok(self)
    }

    /// Build the stored bike, enforcing the battery invariant
    pub fn into_bike(self, id: i64) -> Bike {
        let baterija = Some(normalize_battery(&self.tip, self.baterija));
        Bike {
            id,
            tip: self.tip.trim().to_string(),
            cena: self.cena,
            status: self.status.unwrap_or(BikeStatus::Available),
            latitude: self.latitude,
            longitude: self.longitude,
            baterija,
            adresa: self.adresa,
            slika: self.slika,
        }
    }
}

/// Partial bike update, sent as-is to the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct BikePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Bike type cannot be empty"))]
    pub tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Price per minute must be positive"))]
    pub cena: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BikeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baterija: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adresa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slika: Option<String>,
}

impl BikePatch {
    /// Validate the patch and trim the bike type, if one is given
    pub fn normalized(mut self) -> AppResult<Self> {
        self.validate()?;
        if let Some(tip) = &self.tip {
            self.tip = Some(required_label(tip, "Bike type cannot be empty")?);
        }
        Ok(self)
    }

    pub fn status(status: BikeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Rewrite the battery field so the patched bike keeps the battery invariant
    pub fn enforce_battery(&mut self, current: &Bike) {
        let tip = self.tip.as_deref().unwrap_or(&current.tip);
        if !is_electric(tip) {
            self.baterija = Some(0);
        } else if self.baterija.is_some() || !is_electric(&current.tip) {
            let requested = self.baterija.or(current.baterija.filter(|b| *b > 0));
            self.baterija = Some(normalize_battery(tip, requested));
        }
    }

    /// Apply the patch to a bike in place (used by the in-process store)
    pub fn apply(&self, bike: &mut Bike) {
        if let Some(tip) = &self.tip {
            bike.tip = tip.clone();
        }
        if let Some(cena) = self.cena {
            bike.cena = cena;
        }
        if let Some(status) = self.status {
            bike.status = status;
        }
        if self.latitude.is_some() {
            bike.latitude = self.latitude;
        }
        if self.longitude.is_some() {
            bike.longitude = self.longitude;
        }
        if self.baterija.is_some() {
            bike.baterija = self.baterija;
        }
        if self.adresa.is_some() {
            bike.adresa = self.adresa.clone();
        }
        if self.slika.is_some() {
            bike.slika = self.slika.clone();
        }
    }
}

/// Status change request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateBikeStatus {
    pub status: BikeStatus,
}

/// Bike type lookup entry (`bikeTypes` resource)
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BikeType {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    pub name: String,
}

/// Create or rename a bike type
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BikeTypeInput {
    #[validate(length(min = 1, message = "Type name is required"))]
    pub name: String,
}

impl BikeTypeInput {
    pub fn normalized(self) -> AppResult<Self> {
        self.validate()?;
        Ok(Self {
            name: required_label(&self.name, "Type name is required")?,
        })
    }
}

/// Parking spot (`parkings` resource)
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Parking {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adresa: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bike(tip: &str, baterija: Option<i64>) -> Bike {
        Bike {
            id: 23241,
            tip: tip.to_string(),
            cena: 12,
            status: BikeStatus::Available,
            latitude: Some(44.8055),
            longitude: Some(20.4695),
            baterija,
            adresa: None,
            slika: None,
        }
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&BikeStatus::Maintenance).unwrap();
        assert_eq!(json, "\"Na održavanju\"");
        let parsed: BikeStatus = serde_json::from_str("\"Iznajmljen\"").unwrap();
        assert_eq!(parsed, BikeStatus::Rented);
        assert_eq!("Neispravan".parse::<BikeStatus>(), Ok(BikeStatus::Broken));
        assert!("Pokvaren".parse::<BikeStatus>().is_err());
    }

    #[test]
    fn test_lenient_ids() {
        let from_string: Bike = serde_json::from_str(
            r#"{"id":"42","tip":"Gradski","cena":10,"status":"Dostupan"}"#,
        )
        .unwrap();
        let from_number: Bike = serde_json::from_str(
            r#"{"id":42,"tip":"Gradski","cena":10,"status":"Dostupan"}"#,
        )
        .unwrap();
        assert_eq!(from_string.id, 42);
        assert_eq!(from_string, from_number);
    }

    #[test]
    fn test_non_electric_bikes_have_no_battery() {
        let created = CreateBike {
            id: None,
            tip: "Gradski".to_string(),
            cena: 7,
            status: None,
            latitude: None,
            longitude: None,
            baterija: Some(87),
            adresa: None,
            slika: None,
        }
        .into_bike(26733);
        assert_eq!(created.baterija, Some(0));
        assert_eq!(created.status, BikeStatus::Available);

        let mut patch = BikePatch {
            baterija: Some(55),
            ..BikePatch::default()
        };
        patch.enforce_battery(&bike("Hibridni", Some(0)));
        assert_eq!(patch.baterija, Some(0));
    }

    #[test]
    fn test_switching_type_to_non_electric_zeroes_battery() {
        let mut patch = BikePatch {
            tip: Some("Brdski (MTB)".to_string()),
            ..BikePatch::default()
        };
        patch.enforce_battery(&bike("Električni", Some(80)));
        assert_eq!(patch.baterija, Some(0));
    }

    #[test]
    fn test_electric_battery_defaults_and_clamps() {
        assert_eq!(normalize_battery("Električni", None), 100);
        assert_eq!(normalize_battery("električni", Some(140)), 100);
        assert_eq!(normalize_battery("Električni", Some(35)), 35);

        let mut untouched = BikePatch::status(BikeStatus::Broken);
        untouched.enforce_battery(&bike("Električni", Some(35)));
        assert_eq!(untouched.baterija, None);

        let mut became_electric = BikePatch {
            tip: Some("Električni".to_string()),
            ..BikePatch::default()
        };
        became_electric.enforce_battery(&bike("Gradski", Some(0)));
        assert_eq!(became_electric.baterija, Some(100));
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let json = serde_json::to_value(BikePatch::status(BikeStatus::Rented)).unwrap();
        assert_eq!(json, serde_json::json!({"status": "Iznajmljen"}));
    }
}
