//! Rental (iznajmljivanje) model

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use utoipa::ToSchema;

/// Completed ride as stored in the `iznajmljivanja` resource
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Username of the rider
    pub korisnik: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub bike_id: i64,
    /// Start date, `DD.MM.YYYY.`
    pub datum: String,
    /// Start and end time, `HH:MM - HH:MM`
    pub vreme: String,
    /// Billed minutes
    pub minuta: i64,
    pub tip: String,
    pub cena_po_minutu: i64,
    /// Total price (RSD)
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub cena: i64,
    #[serde(default)]
    pub slika: String,
    /// Idempotency key of the ride that produced this rental
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kljuc: Option<String>,
}

/// Rental to be recorded; `kljuc` deduplicates retried submissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRental {
    pub user_id: i64,
    pub korisnik: String,
    pub bike_id: i64,
    pub datum: String,
    pub vreme: String,
    pub minuta: i64,
    pub tip: String,
    pub cena_po_minutu: i64,
    pub cena: i64,
    pub slika: String,
    pub kljuc: String,
}

impl NewRental {
    pub fn into_rental(self, id: i64) -> Rental {
        Rental {
            id,
            user_id: Some(self.user_id),
            korisnik: self.korisnik,
            bike_id: self.bike_id,
            datum: self.datum,
            vreme: self.vreme,
            minuta: self.minuta,
            tip: self.tip,
            cena_po_minutu: self.cena_po_minutu,
            cena: self.cena,
            slika: self.slika,
            kljuc: Some(self.kljuc),
        }
    }
}
