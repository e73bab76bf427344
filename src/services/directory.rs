//! Bike directory: selectable bikes, map pins and the live pin feed

use std::time::Duration;

use tokio::sync::watch;

use crate::{
    error::AppResult,
    models::{
        bike::{Bike, BikeStatus, Parking, FULL_BATTERY},
        pin::{AvailableBike, BikePinInfo, ParkingPinInfo, Pin, PinKind, PinQuery},
    },
    repository::Repository,
};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in metres
pub fn haversine_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

#[derive(Clone)]
pub struct DirectoryService {
    repository: Repository,
    refresh_interval: Duration,
}

impl DirectoryService {
    pub fn new(repository: Repository, refresh_interval: Duration) -> Self {
        Self {
            repository,
            refresh_interval,
        }
    }

    /// Bikes a rider can pick right now
    pub async fn list_available_bikes(&self) -> Vec<AvailableBike> {
        match self.repository.list_bikes(Some(BikeStatus::Available)).await {
            Ok(bikes) => bikes
                .into_iter()
                .filter(|b| b.is_available())
                .map(AvailableBike::from)
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to load available bikes: {}", e);
                Vec::new()
            }
        }
    }

    /// Bike and parking pins for the rider map
    pub async fn list_map_pins(&self, query: &PinQuery) -> Vec<Pin> {
        match self.load_pins(query).await {
            Ok(pins) => pins,
            Err(e) => {
                tracing::warn!("Failed to load map pins: {}", e);
                Vec::new()
            }
        }
    }

    async fn load_pins(&self, query: &PinQuery) -> AppResult<Vec<Pin>> {
        let status = query.bike_status();
        let bikes = async {
            if query.bikes {
                self.repository.list_bikes(Some(status)).await
            } else {
                Ok(Vec::new())
            }
        };
        let parkings = async {
            if query.parking {
                self.repository.list_parkings().await
            } else {
                Ok(Vec::new())
            }
        };
        let (bikes, parkings) = tokio::join!(bikes, parkings);
        let (bikes, parkings) = (bikes?, parkings?);

        let position = query.rider_position();
        let mut pins: Vec<Pin> = bikes
            .into_iter()
            .filter(|b| b.status == status && b.has_position())
            .filter_map(bike_pin)
            .chain(parkings.into_iter().map(parking_pin))
            .collect();
        if let Some(position) = position {
            for pin in &mut pins {
                let meters = haversine_meters(position, (pin.latitude, pin.longitude));
                pin.distance_meters = Some(meters.round() as u64);
            }
        }
        Ok(pins)
    }

    /// Re-load the pins on every refresh interval while someone listens.
    ///
    /// The refresh task ends once the last receiver is dropped.
    pub fn pin_feed(&self, query: PinQuery) -> watch::Receiver<Vec<Pin>> {
        let (tx, rx) = watch::channel(Vec::new());
        let directory = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(directory.refresh_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let pins = directory.list_map_pins(&query).await;
                        if tx.send(pins).is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
            tracing::debug!("Pin feed stopped");
        });
        rx
    }
}

fn bike_pin(bike: Bike) -> Option<Pin> {
    let (latitude, longitude) = bike.latitude.zip(bike.longitude)?;
    Some(Pin {
        id: format!("b{}", bike.id),
        kind: PinKind::Bike,
        latitude,
        longitude,
        distance_meters: None,
        bike_info: Some(BikePinInfo {
            bike_id: bike.id,
            address: bike.adresa.unwrap_or_default(),
            bike_type: bike.tip,
            price_per_minute: bike.cena,
            battery: bike.baterija.unwrap_or(FULL_BATTERY),
        }),
        parking_info: None,
    })
}

fn parking_pin(parking: Parking) -> Pin {
    Pin {
        id: format!("p{}", parking.id),
        kind: PinKind::Parking,
        latitude: parking.latitude,
        longitude: parking.longitude,
        distance_meters: None,
        bike_info: None,
        parking_info: Some(ParkingPinInfo {
            address: parking.adresa.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{error::AppError, repository::MockStore};

    fn bike(id: i64, status: BikeStatus, position: Option<(f64, f64)>) -> Bike {
        Bike {
            id,
            tip: "Električni".to_string(),
            cena: 31,
            status,
            latitude: position.map(|p| p.0),
            longitude: position.map(|p| p.1),
            baterija: None,
            adresa: Some("Knez Mihailova 5".to_string()),
            slika: None,
        }
    }

    fn parking() -> Parking {
        Parking {
            id: 3,
            latitude: 44.8176,
            longitude: 20.4569,
            adresa: None,
        }
    }

    fn service(store: MockStore) -> DirectoryService {
        DirectoryService::new(Arc::new(store), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_pins_for_positioned_bikes_and_parkings() {
        let mut store = MockStore::new();
        store
            .expect_list_bikes()
            .withf(|s| *s == Some(BikeStatus::Available))
            .returning(|_| {
                Ok(vec![
                    bike(42, BikeStatus::Available, Some((44.8125, 20.4612))),
                    bike(43, BikeStatus::Available, None),
                ])
            });
        store.expect_list_parkings().returning(|| Ok(vec![parking()]));

        let pins = service(store).list_map_pins(&PinQuery::default()).await;
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].id, "b42");
        assert_eq!(pins[0].kind, PinKind::Bike);
        let info = pins[0].bike_info.as_ref().unwrap();
        assert_eq!(info.battery, 100);
        assert_eq!(info.address, "Knez Mihailova 5");
        assert_eq!(pins[1].id, "p3");
        assert_eq!(pins[1].parking_info.as_ref().unwrap().address, "");
        assert!(pins.iter().all(|p| p.distance_meters.is_none()));
    }

    #[tokio::test]
    async fn test_hidden_kinds_are_not_fetched() {
        let mut store = MockStore::new();
        store.expect_list_bikes().never();
        store.expect_list_parkings().times(1).returning(|| Ok(vec![parking()]));

        let query = PinQuery {
            bikes: false,
            lat: Some(44.8176),
            lon: Some(20.4569),
            ..PinQuery::default()
        };
        let pins = service(store).list_map_pins(&query).await;
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].distance_meters, Some(0));
    }

    #[tokio::test]
    async fn test_failures_yield_empty_lists() {
        let mut store = MockStore::new();
        store
            .expect_list_bikes()
            .returning(|_| Err(AppError::Store("down".to_string())));
        store.expect_list_parkings().returning(|| Ok(vec![parking()]));

        let service = service(store);
        assert!(service.list_map_pins(&PinQuery::default()).await.is_empty());
        assert!(service.list_available_bikes().await.is_empty());
    }

    #[tokio::test]
    async fn test_available_bike_labels() {
        let mut store = MockStore::new();
        store.expect_list_bikes().returning(|_| {
            let mut untyped = bike(7, BikeStatus::Available, None);
            untyped.tip = String::new();
            Ok(vec![bike(42, BikeStatus::Available, None), untyped])
        });

        let bikes = service(store).list_available_bikes().await;
        assert_eq!(bikes[0].label, "#42 (Električni)");
        assert_eq!(bikes[1].label, "#7 (bicikl)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_feed_refreshes_until_dropped() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let mut store = MockStore::new();
        store.expect_list_bikes().returning(move |_| {
            // a new bike shows up on every refresh
            let n = counter.fetch_add(1, Ordering::SeqCst) as i64;
            Ok(vec![bike(42 + n, BikeStatus::Available, Some((44.81, 20.46)))])
        });
        store.expect_list_parkings().returning(|| Ok(Vec::new()));

        let started = tokio::time::Instant::now();
        let mut feed = service(store).pin_feed(PinQuery::default());

        feed.changed().await.unwrap();
        assert_eq!(feed.borrow_and_update()[0].id, "b42");

        feed.changed().await.unwrap();
        assert_eq!(feed.borrow_and_update()[0].id, "b43");
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        drop(feed);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_haversine() {
        // Republic Square to Kalemegdan, roughly 1.1 km
        let d = haversine_meters((44.8163, 20.4602), (44.8231, 20.4504));
        assert!((1000.0..1200.0).contains(&d), "{}", d);
        assert_eq!(haversine_meters((44.8, 20.4), (44.8, 20.4)), 0.0);
    }
}
