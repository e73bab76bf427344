//! json-server store gateway

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::StoreConfig,
    error::{AppError, AppResult},
    models::{
        bike::{Bike, BikePatch, BikeStatus, BikeType, BikeTypeInput, Parking},
        problem::{NewProblem, Problem, ProblemPatch},
        rental::{NewRental, Rental},
        user::{NewUser, User, UserPatch},
    },
};

use super::Store;

const USERS: &str = "users";
const BIKES: &str = "bikes";
const BIKE_TYPES: &str = "bikeTypes";
const RENTALS: &str = "iznajmljivanja";
const PROBLEMS: &str = "prijavljeni_problemi";
const PARKINGS: &str = "parkings";

/// Store backed by a json-server REST API
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("bike-rental-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_list<T>(&self, resource: &str, query: &[(&str, &str)]) -> AppResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(resource, ?query, "GET list");
        let response = self
            .client
            .get(self.url(resource))
            .query(query)
            .send()
            .await?;
        into_json(response, resource).await
    }

    async fn get_one<T>(&self, resource: &str, id: i64) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let path = format!("{}/{}", resource, id);
        tracing::debug!(%path, "GET");
        let response = self.client.get(self.url(&path)).send().await?;
        into_json(response, &path).await
    }

    async fn post<B, T>(&self, resource: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(resource, "POST");
        let response = self
            .client
            .post(self.url(resource))
            .json(body)
            .send()
            .await?;
        into_json(response, resource).await
    }

    async fn patch<B, T>(&self, resource: &str, id: i64, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let path = format!("{}/{}", resource, id);
        tracing::debug!(%path, "PATCH");
        let response = self
            .client
            .patch(self.url(&path))
            .json(body)
            .send()
            .await?;
        into_json(response, &path).await
    }

    async fn delete(&self, resource: &str, id: i64) -> AppResult<()> {
        let path = format!("{}/{}", resource, id);
        tracing::debug!(%path, "DELETE");
        let response = self.client.delete(self.url(&path)).send().await?;
        check_status(response, &path).await.map(|_| ())
    }
}

/// Map non-2xx responses to errors, passing successful ones through
async fn check_status(response: Response, what: &str) -> AppResult<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("{} not found", what)));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::Store(format!("{} returned {}: {}", what, status, text)));
    }
    Ok(response)
}

async fn into_json<T>(response: Response, what: &str) -> AppResult<T>
where
    T: DeserializeOwned,
{
    let response = check_status(response, what).await?;
    Ok(response.json().await?)
}

#[async_trait]
impl Store for RestStore {
    async fn find_users_by_username(&self, username: &str) -> AppResult<Vec<User>> {
        self.get_list(USERS, &[("username", username)]).await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.get_list(USERS, &[]).await
    }

    async fn get_user(&self, id: i64) -> AppResult<User> {
        self.get_one(USERS, id).await
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        self.post(USERS, user).await
    }

    async fn update_user(&self, id: i64, patch: &UserPatch) -> AppResult<User> {
        self.patch(USERS, id, patch).await
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.delete(USERS, id).await
    }

    async fn list_bikes(&self, status: Option<BikeStatus>) -> AppResult<Vec<Bike>> {
        match status {
            Some(status) => self.get_list(BIKES, &[("status", status.as_str())]).await,
            None => self.get_list(BIKES, &[]).await,
        }
    }

    async fn get_bike(&self, id: i64) -> AppResult<Bike> {
        self.get_one(BIKES, id).await
    }

    async fn create_bike(&self, bike: &Bike) -> AppResult<Bike> {
        self.post(BIKES, bike).await
    }

    async fn update_bike(&self, id: i64, patch: &BikePatch) -> AppResult<Bike> {
        self.patch(BIKES, id, patch).await
    }

    async fn delete_bike(&self, id: i64) -> AppResult<()> {
        self.delete(BIKES, id).await
    }

    async fn transition_bike_status(
        &self,
        id: i64,
        expected: BikeStatus,
        next: BikeStatus,
    ) -> AppResult<Bike> {
        // json-server has no conditional writes; read-check-write keeps the
        // window between the check and the patch as small as the API allows.
        let current: Bike = self.get_one(BIKES, id).await?;
        if current.status != expected {
            return Err(AppError::BikeNotAvailable(format!(
                "Bike #{} is {} (expected {})",
                id, current.status, expected
            )));
        }
        self.patch(BIKES, id, &BikePatch::status(next)).await
    }

    async fn list_bike_types(&self) -> AppResult<Vec<BikeType>> {
        self.get_list(BIKE_TYPES, &[]).await
    }

    async fn create_bike_type(&self, input: &BikeTypeInput) -> AppResult<BikeType> {
        self.post(BIKE_TYPES, input).await
    }

    async fn update_bike_type(&self, id: i64, input: &BikeTypeInput) -> AppResult<BikeType> {
        self.patch(BIKE_TYPES, id, input).await
    }

    async fn delete_bike_type(&self, id: i64) -> AppResult<()> {
        self.delete(BIKE_TYPES, id).await
    }

    async fn list_rentals(&self) -> AppResult<Vec<Rental>> {
        self.get_list(RENTALS, &[]).await
    }

    async fn list_rentals_by_user(&self, user_id: i64, korisnik: &str) -> AppResult<Vec<Rental>> {
        let user_id = user_id.to_string();
        let id_query = [("userId", user_id.as_str())];
        let name_query = [("korisnik", korisnik)];
        let (by_id, by_name) = tokio::join!(
            self.get_list::<Rental>(RENTALS, &id_query),
            self.get_list::<Rental>(RENTALS, &name_query),
        );
        let mut rentals = by_id?;
        for rental in by_name? {
            if !rentals.iter().any(|r| r.id == rental.id) {
                rentals.push(rental);
            }
        }
        rentals.sort_by_key(|r| r.id);
        Ok(rentals)
    }

    async fn get_rental(&self, id: i64) -> AppResult<Rental> {
        self.get_one(RENTALS, id).await
    }

    async fn find_rental_by_key(&self, key: &str) -> AppResult<Option<Rental>> {
        let rentals: Vec<Rental> = self.get_list(RENTALS, &[("kljuc", key)]).await?;
        Ok(rentals.into_iter().next())
    }

    async fn create_rental(&self, rental: &NewRental) -> AppResult<Rental> {
        self.post(RENTALS, rental).await
    }

    async fn delete_rental(&self, id: i64) -> AppResult<()> {
        self.delete(RENTALS, id).await
    }

    async fn list_problems(&self) -> AppResult<Vec<Problem>> {
        self.get_list(PROBLEMS, &[]).await
    }

    async fn get_problem(&self, id: i64) -> AppResult<Problem> {
        self.get_one(PROBLEMS, id).await
    }

    async fn create_problem(&self, problem: &NewProblem) -> AppResult<Problem> {
        self.post(PROBLEMS, problem).await
    }

    async fn update_problem(&self, id: i64, patch: &ProblemPatch) -> AppResult<Problem> {
        self.patch(PROBLEMS, id, patch).await
    }

    async fn delete_problem(&self, id: i64) -> AppResult<()> {
        self.delete(PROBLEMS, id).await
    }

    async fn list_parkings(&self) -> AppResult<Vec<Parking>> {
        self.get_list(PARKINGS, &[]).await
    }
}
