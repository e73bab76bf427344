//! In-process store, seeded from a json-server `db.json` file

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        bike::{Bike, BikePatch, BikeStatus, BikeType, BikeTypeInput, Parking},
        problem::{NewProblem, Problem, ProblemPatch},
        rental::{NewRental, Rental},
        user::{NewUser, User, UserPatch},
    },
};

use super::Store;

/// Contents of a json-server database file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub bikes: Vec<Bike>,
    #[serde(default, rename = "bikeTypes")]
    pub bike_types: Vec<BikeType>,
    #[serde(default)]
    pub iznajmljivanja: Vec<Rental>,
    #[serde(default)]
    pub prijavljeni_problemi: Vec<Problem>,
    #[serde(default)]
    pub parkings: Vec<Parking>,
}

/// Store keeping every resource behind a single lock
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    /// Load a `db.json` file
    pub fn from_seed_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
        })?;
        tracing::info!(
            users = snapshot.users.len(),
            bikes = snapshot.bikes.len(),
            parkings = snapshot.parkings.len(),
            "Loaded seed data from {}",
            path.display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> Snapshot {
        self.data.read().await.clone()
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn not_found(what: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", what, id))
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_users_by_username(&self, username: &str) -> AppResult<Vec<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .filter(|u| u.username == username)
            .cloned()
            .collect())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.data.read().await.users.clone())
    }

    async fn get_user(&self, id: i64) -> AppResult<User> {
        let data = self.data.read().await;
        data.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| not_found("User", id))
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let mut data = self.data.write().await;
        let id = next_id(data.users.iter().map(|u| u.id));
        let created = user.clone().into_user(id);
        data.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i64, patch: &UserPatch) -> AppResult<User> {
        let mut data = self.data.write().await;
        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found("User", id))?;
        patch.apply(user);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.users.len();
        data.users.retain(|u| u.id != id);
        if data.users.len() == before {
            return Err(not_found("User", id));
        }
        Ok(())
    }

    async fn list_bikes(&self, status: Option<BikeStatus>) -> AppResult<Vec<Bike>> {
        let data = self.data.read().await;
        Ok(data
            .bikes
            .iter()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect())
    }

    async fn get_bike(&self, id: i64) -> AppResult<Bike> {
        let data = self.data.read().await;
        data.bikes
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| not_found("Bike", id))
    }

    async fn create_bike(&self, bike: &Bike) -> AppResult<Bike> {
        let mut data = self.data.write().await;
        if data.bikes.iter().any(|b| b.id == bike.id) {
            return Err(AppError::Conflict(format!("Bike #{} already exists", bike.id)));
        }
        data.bikes.push(bike.clone());
        Ok(bike.clone())
    }

    async fn update_bike(&self, id: i64, patch: &BikePatch) -> AppResult<Bike> {
        let mut data = self.data.write().await;
        let bike = data
            .bikes
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("Bike", id))?;
        patch.apply(bike);
        Ok(bike.clone())
    }

    async fn delete_bike(&self, id: i64) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.bikes.len();
        data.bikes.retain(|b| b.id != id);
        if data.bikes.len() == before {
            return Err(not_found("Bike", id));
        }
        Ok(())
    }

    async fn transition_bike_status(
        &self,
        id: i64,
        expected: BikeStatus,
        next: BikeStatus,
    ) -> AppResult<Bike> {
        let mut data = self.data.write().await;
        let bike = data
            .bikes
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("Bike", id))?;
        if bike.status != expected {
            return Err(AppError::BikeNotAvailable(format!(
                "Bike #{} is {} (expected {})",
                id, bike.status, expected
            )));
        }
        bike.status = next;
        Ok(bike.clone())
    }

    async fn list_bike_types(&self) -> AppResult<Vec<BikeType>> {
        Ok(self.data.read().await.bike_types.clone())
    }

    async fn create_bike_type(&self, input: &BikeTypeInput) -> AppResult<BikeType> {
        let mut data = self.data.write().await;
        let created = BikeType {
            id: next_id(data.bike_types.iter().map(|t| t.id)),
            name: input.name.clone(),
        };
        data.bike_types.push(created.clone());
        Ok(created)
    }

    async fn update_bike_type(&self, id: i64, input: &BikeTypeInput) -> AppResult<BikeType> {
        let mut data = self.data.write().await;
        let bike_type = data
            .bike_types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Bike type", id))?;
        bike_type.name = input.name.clone();
        Ok(bike_type.clone())
    }

    async fn delete_bike_type(&self, id: i64) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.bike_types.len();
        data.bike_types.retain(|t| t.id != id);
        if data.bike_types.len() == before {
            return Err(not_found("Bike type", id));
        }
        Ok(())
    }

    async fn list_rentals(&self) -> AppResult<Vec<Rental>> {
        Ok(self.data.read().await.iznajmljivanja.clone())
    }

    async fn list_rentals_by_user(&self, user_id: i64, korisnik: &str) -> AppResult<Vec<Rental>> {
        let data = self.data.read().await;
        Ok(data
            .iznajmljivanja
            .iter()
            .filter(|r| r.user_id == Some(user_id) || r.korisnik == korisnik)
            .cloned()
            .collect())
    }

    async fn get_rental(&self, id: i64) -> AppResult<Rental> {
        let data = self.data.read().await;
        data.iznajmljivanja
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("Rental", id))
    }

    async fn find_rental_by_key(&self, key: &str) -> AppResult<Option<Rental>> {
        let data = self.data.read().await;
        Ok(data
            .iznajmljivanja
            .iter()
            .find(|r| r.kljuc.as_deref() == Some(key))
            .cloned())
    }

    async fn create_rental(&self, rental: &NewRental) -> AppResult<Rental> {
        let mut data = self.data.write().await;
        let id = next_id(data.iznajmljivanja.iter().map(|r| r.id));
        let created = rental.clone().into_rental(id);
        data.iznajmljivanja.push(created.clone());
        Ok(created)
    }

    async fn delete_rental(&self, id: i64) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.iznajmljivanja.len();
        data.iznajmljivanja.retain(|r| r.id != id);
        if data.iznajmljivanja.len() == before {
            return Err(not_found("Rental", id));
        }
        Ok(())
    }

    async fn list_problems(&self) -> AppResult<Vec<Problem>> {
        Ok(self.data.read().await.prijavljeni_problemi.clone())
    }

    async fn get_problem(&self, id: i64) -> AppResult<Problem> {
        let data = self.data.read().await;
        data.prijavljeni_problemi
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("Problem", id))
    }

    async fn create_problem(&self, problem: &NewProblem) -> AppResult<Problem> {
        let mut data = self.data.write().await;
        let id = next_id(data.prijavljeni_problemi.iter().map(|p| p.id));
        let created = problem.clone().into_problem(id);
        data.prijavljeni_problemi.push(created.clone());
        Ok(created)
    }

    async fn update_problem(&self, id: i64, patch: &ProblemPatch) -> AppResult<Problem> {
        let mut data = self.data.write().await;
        let problem = data
            .prijavljeni_problemi
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("Problem", id))?;
        problem.status = patch.status;
        Ok(problem.clone())
    }

    async fn delete_problem(&self, id: i64) -> AppResult<()> {
        let mut data = self.data.write().await;
        let before = data.prijavljeni_problemi.len();
        data.prijavljeni_problemi.retain(|p| p.id != id);
        if data.prijavljeni_problemi.len() == before {
            return Err(not_found("Problem", id));
        }
        Ok(())
    }

    async fn list_parkings(&self) -> AppResult<Vec<Parking>> {
        Ok(self.data.read().await.parkings.clone())
    }
}
