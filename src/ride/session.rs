//! Per-rider ride state machine
//!
//! `Idle -> Selecting -> Active -> Stopping -> EndingPhoto -> EndingSummary -> Idle`,
//! with `Selecting -> Idle` on cancel and `Stopping -> Active` when the rental
//! could not be recorded. Every accepted transition gives the session a new
//! revision so that callers doing store I/O between reading and writing the
//! session can tell whether it moved underneath them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        bike::Bike,
        pin::AvailableBike,
        ride::{RidePhaseKind, RideSummary, RideView},
    },
};

use super::billing::{billed_minutes, format_elapsed, total_price};

/// Revisions come from one process-wide sequence, so a session that is
/// dropped and created again never repeats an earlier revision.
static REVISIONS: AtomicU64 = AtomicU64::new(0);

/// A ride in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRide {
    /// Also used as the rental idempotency key
    pub ride_id: Uuid,
    pub bike: Bike,
    pub price_per_minute: i64,
    pub started_at: DateTime<Local>,
}

impl ActiveRide {
    pub fn elapsed_seconds(&self, now: DateTime<Local>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }

    pub fn idempotency_key(&self) -> String {
        self.ride_id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RidePhase {
    Idle,
    Selecting { candidates: Vec<AvailableBike> },
    Active(ActiveRide),
    /// The rental of this ride is being recorded
    Stopping(ActiveRide),
    EndingPhoto { ride: ActiveRide, summary: RideSummary },
    EndingSummary { summary: RideSummary },
}

impl RidePhase {
    pub fn kind(&self) -> RidePhaseKind {
        match self {
            RidePhase::Idle => RidePhaseKind::Idle,
            RidePhase::Selecting { .. } => RidePhaseKind::Selecting,
            RidePhase::Active(_) | RidePhase::Stopping(_) => RidePhaseKind::Active,
            RidePhase::EndingPhoto { .. } => RidePhaseKind::EndingPhoto,
            RidePhase::EndingSummary { .. } => RidePhaseKind::EndingSummary,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            RidePhase::Idle => "idle",
            RidePhase::Selecting { .. } => "selecting a bike",
            RidePhase::Active(_) => "riding",
            RidePhase::Stopping(_) => "stopping the ride",
            RidePhase::EndingPhoto { .. } => "waiting for the parking photo",
            RidePhase::EndingSummary { .. } => "showing the ride summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RideSession {
    phase: RidePhase,
    revision: u64,
}

impl Default for RideSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RideSession {
    pub fn new() -> Self {
        Self {
            phase: RidePhase::Idle,
            revision: 0,
        }
    }

    pub fn phase(&self) -> &RidePhase {
        &self.phase
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_idle(&self) -> bool {
        self.phase == RidePhase::Idle
    }

    fn set(&mut self, phase: RidePhase) {
        self.phase = phase;
        self.revision = REVISIONS.fetch_add(1, Ordering::Relaxed) + 1;
    }

    fn rejected(&self, action: &str) -> AppError {
        AppError::BusinessRule(format!("Cannot {} while {}", action, self.phase.name()))
    }

    pub fn ensure_can_select(&self) -> AppResult<()> {
        match self.phase {
            RidePhase::Idle | RidePhase::Selecting { .. } => Ok(()),
            _ => Err(self.rejected("select a bike")),
        }
    }

    /// Offer a list of bikes to choose from; re-selecting refreshes the list
    pub fn begin_selection(&mut self, candidates: Vec<AvailableBike>) -> AppResult<()> {
        self.ensure_can_select()?;
        self.set(RidePhase::Selecting { candidates });
        Ok(())
    }

    pub fn cancel(&mut self) -> AppResult<()> {
        match self.phase {
            RidePhase::Selecting { .. } => {
                self.set(RidePhase::Idle);
                Ok(())
            }
            _ => Err(self.rejected("cancel the selection")),
        }
    }

    /// Candidate with the given id, if the session is selecting
    pub fn candidate(&self, bike_id: i64) -> Option<&AvailableBike> {
        match &self.phase {
            RidePhase::Selecting { candidates } => candidates.iter().find(|c| c.id == bike_id),
            _ => None,
        }
    }

    /// Fail unless the session is selecting
    pub fn ensure_selecting(&self) -> AppResult<()> {
        match self.phase {
            RidePhase::Selecting { .. } => Ok(()),
            _ => Err(self.rejected("start a ride")),
        }
    }

    /// Begin a ride on a reserved bike.
    ///
    /// A bike without a positive price is charged `default_price`.
    pub fn start(
        &mut self,
        bike: Bike,
        default_price: i64,
        now: DateTime<Local>,
    ) -> AppResult<&ActiveRide> {
        self.ensure_selecting()?;
        let price_per_minute = if bike.cena > 0 { bike.cena } else { default_price };
        self.set(RidePhase::Active(ActiveRide {
            ride_id: Uuid::new_v4(),
            bike,
            price_per_minute,
            started_at: now,
        }));
        match &self.phase {
            RidePhase::Active(ride) => Ok(ride),
            _ => Err(AppError::Internal("ride did not start".to_string())),
        }
    }

    pub fn active(&self) -> AppResult<&ActiveRide> {
        match &self.phase {
            RidePhase::Active(ride) => Ok(ride),
            _ => Err(self.rejected("stop the ride")),
        }
    }

    /// Active -> Stopping; only one stop of a ride can be in flight
    pub fn begin_stop(&mut self) -> AppResult<ActiveRide> {
        let ride = self.active()?.clone();
        self.set(RidePhase::Stopping(ride.clone()));
        Ok(ride)
    }

    /// Stopping -> Active, after the rental could not be recorded
    pub fn abort_stop(&mut self, ride_id: Uuid) -> AppResult<()> {
        match &self.phase {
            RidePhase::Stopping(ride) if ride.ride_id == ride_id => {
                let ride = ride.clone();
                self.set(RidePhase::Active(ride));
                Ok(())
            }
            _ => Err(self.rejected("resume the ride")),
        }
    }

    /// Freeze the ride figures at `ended_at`
    pub fn summarize(
        ride: &ActiveRide,
        ended_at: DateTime<Local>,
        rental_id: i64,
        bike_released: bool,
    ) -> RideSummary {
        let elapsed_seconds = ride.elapsed_seconds(ended_at);
        RideSummary {
            ride_id: ride.ride_id,
            bike_id: ride.bike.id,
            elapsed: format_elapsed(elapsed_seconds),
            elapsed_seconds,
            billed_minutes: billed_minutes(elapsed_seconds),
            price_per_minute: ride.price_per_minute,
            total_price: total_price(elapsed_seconds, ride.price_per_minute),
            rental_id,
            bike_released,
            photo: None,
        }
    }

    /// Stopping -> EndingPhoto, once the rental has been recorded
    pub fn finish(&mut self, summary: RideSummary) -> AppResult<()> {
        let ride = match &self.phase {
            RidePhase::Stopping(ride) if ride.ride_id == summary.ride_id => ride.clone(),
            RidePhase::Stopping(_) => {
                return Err(AppError::BusinessRule("Ride changed while stopping".to_string()))
            }
            _ => return Err(self.rejected("stop the ride")),
        };
        self.set(RidePhase::EndingPhoto { ride, summary });
        Ok(())
    }

    /// EndingPhoto -> EndingSummary; a photo reference is mandatory
    pub fn attach_photo(&mut self, photo: Option<String>) -> AppResult<&RideSummary> {
        let summary = match &self.phase {
            RidePhase::EndingPhoto { summary, .. } => summary,
            _ => return Err(self.rejected("attach a photo")),
        };
        let photo = match photo.map(|p| p.trim().to_string()) {
            Some(p) if !p.is_empty() => p,
            _ => return Err(AppError::Validation("A photo of the parked bike is required".to_string())),
        };
        let summary = RideSummary {
            photo: Some(photo),
            ..summary.clone()
        };
        self.set(RidePhase::EndingSummary { summary });
        match &self.phase {
            RidePhase::EndingSummary { summary } => Ok(summary),
            _ => Err(AppError::Internal("photo was not attached".to_string())),
        }
    }

    pub fn acknowledge(&mut self) -> AppResult<()> {
        match self.phase {
            RidePhase::EndingSummary { .. } => {
                self.set(RidePhase::Idle);
                Ok(())
            }
            _ => Err(self.rejected("close the summary")),
        }
    }

    pub fn to_view(&self, now: DateTime<Local>) -> RideView {
        let mut view = RideView {
            phase: self.phase.kind(),
            ride_id: None,
            bike_id: None,
            elapsed_seconds: 0,
            elapsed: format_elapsed(0),
            billed_minutes: 0,
            price_per_minute: 0,
            total_price: 0,
            candidates: Vec::new(),
            summary: None,
        };
        match &self.phase {
            RidePhase::Idle => {}
            RidePhase::Selecting { candidates } => view.candidates = candidates.clone(),
            RidePhase::Active(ride) | RidePhase::Stopping(ride) => {
                let elapsed = ride.elapsed_seconds(now);
                view.ride_id = Some(ride.ride_id);
                view.bike_id = Some(ride.bike.id);
                view.elapsed_seconds = elapsed;
                view.elapsed = format_elapsed(elapsed);
                view.billed_minutes = billed_minutes(elapsed);
                view.price_per_minute = ride.price_per_minute;
                view.total_price = total_price(elapsed, ride.price_per_minute);
            }
            RidePhase::EndingPhoto { summary, .. } | RidePhase::EndingSummary { summary } => {
                view.ride_id = Some(summary.ride_id);
                view.bike_id = Some(summary.bike_id);
                view.elapsed_seconds = summary.elapsed_seconds;
                view.elapsed = summary.elapsed.clone();
                view.billed_minutes = summary.billed_minutes;
                view.price_per_minute = summary.price_per_minute;
                view.total_price = summary.total_price;
                view.summary = Some(summary.clone());
            }
        }
        view
    }
}
