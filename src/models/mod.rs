//! Data models for the bike rental server

pub mod bike;
pub mod pin;
pub mod problem;
pub mod rental;
pub mod ride;
pub mod user;

// Re-export commonly used types
pub use bike::{Bike, BikePatch, BikeStatus, BikeType, Parking};
pub use pin::{AvailableBike, Pin, PinKind, PinQuery};
pub use problem::{Problem, ProblemStatus};
pub use rental::{NewRental, Rental};
pub use ride::{RidePhaseKind, RideSummary, RideView};
pub use user::{Role, User, UserClaims, UserInfo};
