//! Business logic services

pub mod directory;
pub mod fleet;
pub mod problems;
pub mod rentals;
pub mod rides;
pub mod users;

use std::{sync::Arc, time::Duration};

use crate::{
    config::AppConfig,
    repository::Repository,
    ride::{Clock, SystemClock},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub directory: directory::DirectoryService,
    pub rides: rides::RidesService,
    pub rentals: rentals::RentalsService,
    pub problems: problems::ProblemsService,
    pub fleet: fleet::FleetService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    /// Same as `new`, with an explicit time source
    pub fn with_clock(repository: Repository, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let directory = directory::DirectoryService::new(
            repository.clone(),
            Duration::from_secs(config.map.refresh_interval_secs.max(1)),
        );
        let rentals = rentals::RentalsService::new(repository.clone());
        Self {
            rides: rides::RidesService::new(
                repository.clone(),
                directory.clone(),
                rentals.clone(),
                clock.clone(),
                config.rides.clone(),
            ),
            problems: problems::ProblemsService::new(repository.clone(), clock),
            fleet: fleet::FleetService::new(repository.clone()),
            users: users::UsersService::new(repository, config.auth.clone()),
            directory,
            rentals,
        }
    }
}
