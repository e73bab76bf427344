//! Problem report (prijavljeni problem) model

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use utoipa::ToSchema;

use super::bike::BikeStatus;

/// Triage status of a problem report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ProblemStatus {
    #[serde(rename = "Novo")]
    New,
    #[serde(rename = "Slanje bicikla na održavanje")]
    SentToMaintenance,
    #[serde(rename = "Isključen iz sistema")]
    Excluded,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::New => "Novo",
            ProblemStatus::SentToMaintenance => "Slanje bicikla na održavanje",
            ProblemStatus::Excluded => "Isključen iz sistema",
        }
    }

    /// Bike status that follows from moving a report into this status
    pub fn cascaded_bike_status(&self) -> Option<BikeStatus> {
        match self {
            ProblemStatus::New => None,
            ProblemStatus::SentToMaintenance => Some(BikeStatus::Maintenance),
            ProblemStatus::Excluded => Some(BikeStatus::Broken),
        }
    }

    /// `Novo` may move to either triage outcome; outcomes are final.
    /// Re-applying the current status is always accepted.
    pub fn can_transition_to(&self, next: ProblemStatus) -> bool {
        *self == next || *self == ProblemStatus::New
    }
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Problem report as stored in the `prijavljeni_problemi` resource
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    pub datum: String,
    pub korisnik: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub bike_id: i64,
    pub opis: String,
    #[serde(default)]
    pub fotografija: String,
    pub status: ProblemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

/// Problem report ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProblem {
    pub datum: String,
    pub korisnik: String,
    pub bike_id: i64,
    pub opis: String,
    pub fotografija: String,
    pub status: ProblemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl NewProblem {
    pub fn into_problem(self, id: i64) -> Problem {
        Problem {
            id,
            datum: self.datum,
            korisnik: self.korisnik,
            bike_id: self.bike_id,
            opis: self.opis,
            fotografija: self.fotografija,
            status: self.status,
            user_id: self.user_id,
        }
    }
}

/// Rider problem report request
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    /// Bike number as typed by the rider; must be a positive integer
    pub bike_id: String,
    /// Short description of the problem
    pub opis: String,
    /// Optional photo reference
    #[serde(default)]
    pub fotografija: Option<String>,
}

/// Status change request (admin)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateProblemStatus {
    pub status: ProblemStatus,
}

/// Partial problem update sent to the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemPatch {
    pub status: ProblemStatus,
}

/// Outcome of a triage decision
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProblemTriage {
    pub problem: Problem,
    /// Bike status the decision cascaded to, if any
    pub bike_status: Option<BikeStatus>,
    /// False when the cascaded bike update could not be written
    pub cascade_applied: bool,
}
