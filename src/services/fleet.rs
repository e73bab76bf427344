//! Fleet management: bikes and bike types (admin)

use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::bike::{Bike, BikePatch, BikeStatus, BikeType, BikeTypeInput, CreateBike},
    repository::Repository,
};

/// Range of generated bike numbers
const BIKE_ID_RANGE: std::ops::RangeInclusive<i64> = 10_000..=99_999;
const BIKE_ID_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct FleetService {
    repository: Repository,
}

impl FleetService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_bikes(&self, status: Option<BikeStatus>) -> AppResult<Vec<Bike>> {
        self.repository.list_bikes(status).await
    }

    pub async fn get_bike(&self, id: i64) -> AppResult<Bike> {
        self.repository.get_bike(id).await
    }

    /// Pick a five digit bike number not yet in use
    async fn generate_bike_id(&self) -> AppResult<i64> {
        for _ in 0..BIKE_ID_ATTEMPTS {
            let candidate = rand::thread_rng().gen_range(BIKE_ID_RANGE);
            match self.repository.get_bike(candidate).await {
                Err(AppError::NotFound(_)) => return Ok(candidate),
                Ok(_) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(AppError::Conflict("Could not allocate a free bike number".to_string()))
    }

    pub async fn create_bike(&self, input: CreateBike) -> AppResult<Bike> {
        let input = input.normalized()?;
        let id = match input.id {
            Some(id) if id <= 0 => {
                return Err(AppError::Validation("Bike number must be positive".to_string()))
            }
            Some(id) => id,
            None => self.generate_bike_id().await?,
        };
        let bike = input.into_bike(id);
        let created = self.repository.create_bike(&bike).await?;
        tracing::info!(bike_id = created.id, tip = %created.tip, "Bike added to the fleet");
        Ok(created)
    }

    /// Partial update keeping the battery consistent with the bike type
    pub async fn update_bike(&self, id: i64, patch: BikePatch) -> AppResult<Bike> {
        let mut patch = patch.normalized()?;
        let current = self.repository.get_bike(id).await?;
        patch.enforce_battery(&current);
        self.repository.update_bike(id, &patch).await
    }

    /// Admin status override; not a reservation, so no precondition
    pub async fn set_status(&self, id: i64, status: BikeStatus) -> AppResult<Bike> {
        let bike = self
            .repository
            .update_bike(id, &BikePatch::status(status))
            .await?;
        tracing::info!(bike_id = id, status = %status, "Bike status changed");
        Ok(bike)
    }

    pub async fn delete_bike(&self, id: i64) -> AppResult<()> {
        self.repository.delete_bike(id).await?;
        tracing::info!(bike_id = id, "Bike removed from the fleet");
        Ok(())
    }

    pub async fn list_bike_types(&self) -> AppResult<Vec<BikeType>> {
        self.repository.list_bike_types().await
    }

    pub async fn create_bike_type(&self, input: BikeTypeInput) -> AppResult<BikeType> {
        let input = input.normalized()?;
        let existing = self.repository.list_bike_types().await?;
        if existing.iter().any(|t| t.name.eq_ignore_ascii_case(&input.name)) {
            return Err(AppError::Conflict(format!(
                "Bike type '{}' already exists",
                input.name
            )));
        }
        self.repository.create_bike_type(&input).await
    }

    pub async fn rename_bike_type(&self, id: i64, input: BikeTypeInput) -> AppResult<BikeType> {
        let input = input.normalized()?;
        self.repository.update_bike_type(id, &input).await
    }

    pub async fn delete_bike_type(&self, id: i64) -> AppResult<()> {
        self.repository.delete_bike_type(id).await
    }
}
