//! Rental recording and history

use crate::{
    error::AppResult,
    models::rental::{NewRental, Rental},
    repository::Repository,
};

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
}

impl RentalsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Record a completed ride.
    ///
    /// A rental already stored under the same key is returned as-is, so a
    /// retried stop never produces a second row.
    pub async fn record_rental(&self, rental: NewRental) -> AppResult<Rental> {
        if let Some(existing) = self.repository.find_rental_by_key(&rental.kljuc).await? {
            tracing::info!(
                rental_id = existing.id,
                key = %rental.kljuc,
                "Rental already recorded"
            );
            return Ok(existing);
        }
        let created = self.repository.create_rental(&rental).await?;
        tracing::info!(
            rental_id = created.id,
            bike_id = created.bike_id,
            korisnik = %created.korisnik,
            minuta = created.minuta,
            cena = created.cena,
            "Rental recorded"
        );
        Ok(created)
    }

    /// Rental history of one rider
    /// Rental history of one rider, under their current username or id
    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Rental>> {
        let user = self.repository.get_user(user_id).await?;
        self.repository
            .list_rentals_by_user(user_id, &user.username)
            .await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Rental>> {
        self.repository.list_rentals().await
    }

    pub async fn get(&self, id: i64) -> AppResult<Rental> {
        self.repository.get_rental(id).await
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.repository.delete_rental(id).await?;
        tracing::info!(rental_id = id, "Rental deleted");
        Ok(())
    }
}
