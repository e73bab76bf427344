//! Ride orchestration: reserve, time, stop, record, release
//!
//! Sessions are keyed by user id. The session lock is never held across a
//! store call; instead each step remembers the session revision it started
//! from and re-checks it before committing.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tokio::sync::{watch, RwLock};

use crate::{
    config::RidesConfig,
    error::{AppError, AppResult},
    models::{
        bike::{Bike, BikeStatus},
        rental::{NewRental, Rental},
        ride::{RideSummary, RideView},
        user::UserClaims,
    },
    repository::Repository,
    ride::{format_date, format_time_range, ActiveRide, Clock, RideSession},
};

use super::{directory::DirectoryService, rentals::RentalsService};

/// Image shown for rentals of bikes without their own picture
pub const DEFAULT_BIKE_IMAGE: &str = "/images/bike2.png";

const RELEASE_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct RidesService {
    repository: Repository,
    directory: DirectoryService,
    rentals: RentalsService,
    clock: Arc<dyn Clock>,
    config: RidesConfig,
    sessions: Arc<RwLock<HashMap<i64, RideSession>>>,
}

impl RidesService {
    pub fn new(
        repository: Repository,
        directory: DirectoryService,
        rentals: RentalsService,
        clock: Arc<dyn Clock>,
        config: RidesConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            rentals,
            clock,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Current view of a rider's session
    pub async fn view(&self, user_id: i64) -> RideView {
        let now = self.clock.now();
        let sessions = self.sessions.read().await;
        match sessions.get(&user_id) {
            Some(session) => session.to_view(now),
            None => RideSession::new().to_view(now),
        }
    }

    /// Run `f` on the rider's session; only sessions away from Idle are kept
    async fn with_session<T>(
        &self,
        user_id: i64,
        f: impl FnOnce(&mut RideSession) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut sessions = self.sessions.write().await;
        let mut session = sessions.remove(&user_id).unwrap_or_default();
        let result = f(&mut session);
        if !session.is_idle() {
            sessions.insert(user_id, session);
        }
        result
    }

    /// Idle -> Selecting: offer the currently available bikes
    pub async fn select(&self, user_id: i64) -> AppResult<RideView> {
        self.with_session(user_id, |s| s.ensure_can_select()).await?;

        let candidates = self.directory.list_available_bikes().await;
        self.with_session(user_id, |s| s.begin_selection(candidates))
            .await?;
        Ok(self.view(user_id).await)
    }

    /// Selecting -> Idle
    pub async fn cancel(&self, user_id: i64) -> AppResult<RideView> {
        self.with_session(user_id, |s| s.cancel()).await?;
        Ok(self.view(user_id).await)
    }

    /// Selecting -> Active: reserve the bike and start the clock.
    ///
    /// The reservation only succeeds when the bike is still available. If the
    /// session moves on while the reservation is in flight, the bike is
    /// handed back and the start fails.
    pub async fn start(&self, claims: &UserClaims, bike_id: i64) -> AppResult<RideView> {
        claims.require_rider()?;
        let user_id = claims.user_id;
        let (revision, offered) = self
            .with_session(user_id, |s| {
                s.ensure_selecting()?;
                Ok((s.revision(), s.candidate(bike_id).is_some()))
            })
            .await?;
        if !offered {
            tracing::debug!(user_id, bike_id, "Bike was not offered, checking the store");
        }

        let bike = match self
            .repository
            .transition_bike_status(bike_id, BikeStatus::Available, BikeStatus::Rented)
            .await
        {
            Ok(bike) => bike,
            Err(e) => {
                tracing::info!(user_id, bike_id, "Reservation refused: {}", e);
                if matches!(e, AppError::BikeNotAvailable(_) | AppError::NotFound(_)) {
                    self.refresh_candidates(user_id, revision).await;
                }
                return Err(e);
            }
        };

        let now = self.clock.now();
        let default_price = self.config.default_price_per_minute;
        let started = self
            .with_session(user_id, |s| {
                if s.revision() != revision {
                    return Err(AppError::BusinessRule(
                        "Ride session changed while reserving the bike".to_string(),
                    ));
                }
                s.start(bike, default_price, now).map(|ride| ride.ride_id)
            })
            .await;

        match started {
            Ok(ride_id) => {
                tracing::info!(user_id, bike_id, %ride_id, "Ride started");
                Ok(self.view(user_id).await)
            }
            Err(e) => {
                tracing::warn!(user_id, bike_id, "Ride not started, releasing bike: {}", e);
                if !self.release_bike(bike_id).await {
                    tracing::error!(bike_id, "Bike stays rented after an aborted start");
                }
                Err(e)
            }
        }
    }

    async fn refresh_candidates(&self, user_id: i64, revision: u64) {
        let candidates = self.directory.list_available_bikes().await;
        let refreshed = self
            .with_session(user_id, |s| {
                if s.revision() == revision {
                    s.begin_selection(candidates).map(|_| true)
                } else {
                    Ok(false)
                }
            })
            .await;
        match refreshed {
            Ok(true) => tracing::debug!(user_id, "Bike candidates refreshed"),
            Ok(false) => tracing::debug!(user_id, "Session moved on, candidates left as is"),
            Err(e) => tracing::debug!(user_id, "Candidates not refreshed: {}", e),
        }
    }

    /// Hand a bike back to the fleet, retrying transient failures
    async fn release_bike(&self, bike_id: i64) -> bool {
        let attempts = self.config.release_attempts.max(1);
        for attempt in 1..=attempts {
            match self
                .repository
                .transition_bike_status(bike_id, BikeStatus::Rented, BikeStatus::Available)
                .await
            {
                Ok(_) => return true,
                Err(e) if e.is_network() && attempt < attempts => {
                    tracing::warn!(bike_id, attempt, "Bike release failed, retrying: {}", e);
                    tokio::time::sleep(RELEASE_BACKOFF * attempt).await;
                }
                Err(e) => {
                    tracing::error!(bike_id, attempt, "Bike release failed: {}", e);
                    return false;
                }
            }
        }
        false
    }

    /// Active -> EndingPhoto: record the rental and release the bike.
    ///
    /// The session is marked as stopping before any store call, so a second
    /// stop of the same ride is rejected while the first is in flight. If
    /// recording fails the ride keeps running; stopping again reuses the ride
    /// key, so at most one rental is ever stored for it.
    pub async fn stop(&self, claims: &UserClaims) -> AppResult<RideView> {
        let user_id = claims.user_id;
        let ride = self.with_session(user_id, |s| s.begin_stop()).await?;
        let ended_at = self.clock.now();

        let recorded: AppResult<Rental> = async {
            let rider = self.repository.get_user(user_id).await?;
            self.rentals
                .record_rental(rental_for(user_id, &rider.username, &ride, ended_at))
                .await
        }
        .await;
        let rental = match recorded {
            Ok(rental) => rental,
            Err(e) => {
                tracing::error!(user_id, ride_id = %ride.ride_id, "Recording the rental failed: {}", e);
                if let Err(resume) = self
                    .with_session(user_id, |s| s.abort_stop(ride.ride_id))
                    .await
                {
                    tracing::error!(user_id, ride_id = %ride.ride_id, "Ride not resumed: {}", resume);
                }
                return Err(e);
            }
        };

        let bike_released = self.release_bike(ride.bike.id).await;
        if !bike_released {
            tracing::error!(
                bike_id = ride.bike.id,
                rental_id = rental.id,
                "Ride ended but the bike could not be released"
            );
        }

        let summary = RideSession::summarize(&ride, ended_at, rental.id, bike_released);
        self.with_session(user_id, |s| s.finish(summary)).await?;
        tracing::info!(
            user_id,
            ride_id = %ride.ride_id,
            bike_id = ride.bike.id,
            rental_id = rental.id,
            "Ride stopped"
        );
        Ok(self.view(user_id).await)
    }

    /// EndingPhoto -> EndingSummary
    pub async fn attach_photo(&self, user_id: i64, photo: Option<String>) -> AppResult<RideSummary> {
        self.with_session(user_id, |s| s.attach_photo(photo).cloned())
            .await
    }

    /// EndingSummary -> Idle
    pub async fn acknowledge(&self, user_id: i64) -> AppResult<RideView> {
        self.with_session(user_id, |s| s.acknowledge()).await?;
        Ok(self.view(user_id).await)
    }

    /// Live session view, refreshed every tick while someone listens
    pub fn live(&self, user_id: i64) -> watch::Receiver<Option<RideView>> {
        let (tx, rx) = watch::channel(None);
        let rides = self.clone();
        let tick = Duration::from_millis(self.config.tick_interval_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let view = rides.view(user_id).await;
                        if tx.send(Some(view)).is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
            tracing::debug!(user_id, "Ride stream stopped");
        });
        rx
    }
}

fn rental_for(user_id: i64, username: &str, ride: &ActiveRide, ended_at: DateTime<Local>) -> NewRental {
    let summary = RideSession::summarize(ride, ended_at, 0, false);
    NewRental {
        user_id,
        korisnik: username.to_string(),
        bike_id: ride.bike.id,
        datum: format_date(&ride.started_at),
        vreme: format_time_range(&ride.started_at, &ended_at),
        minuta: summary.billed_minutes as i64,
        tip: ride.bike.tip.clone(),
        cena_po_minutu: ride.price_per_minute,
        cena: summary.total_price,
        slika: image_of(&ride.bike),
        kljuc: ride.idempotency_key(),
    }
}

fn image_of(bike: &Bike) -> String {
    bike.slika
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BIKE_IMAGE)
        .to_string()
}
