//! Repository layer: typed access to the bike rental resources
//!
//! The resources live in an external json-server compatible store. `RestStore`
//! talks to it over HTTP, `MemoryStore` keeps the same resources in-process.

pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        bike::{Bike, BikePatch, BikeStatus, BikeType, BikeTypeInput, Parking},
        problem::{NewProblem, Problem, ProblemPatch},
        rental::{NewRental, Rental},
        user::{NewUser, User, UserPatch},
    },
};

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Shared handle to the configured store
pub type Repository = Arc<dyn Store>;

/// Resource operations offered by the store.
///
/// Lookups by id fail with `AppError::NotFound`; transport failures surface as
/// `AppError::Network` or `AppError::Store`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn find_users_by_username(&self, username: &str) -> AppResult<Vec<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn get_user(&self, id: i64) -> AppResult<User>;
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;
    async fn update_user(&self, id: i64, patch: &UserPatch) -> AppResult<User>;
    async fn delete_user(&self, id: i64) -> AppResult<()>;

    // Bikes
    async fn list_bikes(&self, status: Option<BikeStatus>) -> AppResult<Vec<Bike>>;
    async fn get_bike(&self, id: i64) -> AppResult<Bike>;
    async fn create_bike(&self, bike: &Bike) -> AppResult<Bike>;
    async fn update_bike(&self, id: i64, patch: &BikePatch) -> AppResult<Bike>;
    async fn delete_bike(&self, id: i64) -> AppResult<()>;

    /// Move a bike from `expected` to `next`.
    ///
    /// Fails with `AppError::BikeNotAvailable` when the bike is not in the
    /// expected status, leaving it untouched.
    async fn transition_bike_status(
        &self,
        id: i64,
        expected: BikeStatus,
        next: BikeStatus,
    ) -> AppResult<Bike>;

    // Bike types
    async fn list_bike_types(&self) -> AppResult<Vec<BikeType>>;
    async fn create_bike_type(&self, input: &BikeTypeInput) -> AppResult<BikeType>;
    async fn update_bike_type(&self, id: i64, input: &BikeTypeInput) -> AppResult<BikeType>;
    async fn delete_bike_type(&self, id: i64) -> AppResult<()>;

    // Rentals
    async fn list_rentals(&self) -> AppResult<Vec<Rental>>;
    /// Rentals recorded for the user id or under the given username
    async fn list_rentals_by_user(&self, user_id: i64, korisnik: &str) -> AppResult<Vec<Rental>>;
    async fn get_rental(&self, id: i64) -> AppResult<Rental>;
    async fn find_rental_by_key(&self, key: &str) -> AppResult<Option<Rental>>;
    async fn create_rental(&self, rental: &NewRental) -> AppResult<Rental>;
    async fn delete_rental(&self, id: i64) -> AppResult<()>;

    // Problem reports
    async fn list_problems(&self) -> AppResult<Vec<Problem>>;
    async fn get_problem(&self, id: i64) -> AppResult<Problem>;
    async fn create_problem(&self, problem: &NewProblem) -> AppResult<Problem>;
    async fn update_problem(&self, id: i64, patch: &ProblemPatch) -> AppResult<Problem>;
    async fn delete_problem(&self, id: i64) -> AppResult<()>;

    // Parkings
    async fn list_parkings(&self) -> AppResult<Vec<Parking>>;
}
