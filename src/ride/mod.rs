//! Ride session core: state machine, billing arithmetic and time source
//!
//! Everything here is free of I/O. The orchestration against the store lives
//! in `services::rides`.

pub mod billing;
pub mod clock;
pub mod session;

pub use billing::{billed_minutes, format_date, format_elapsed, format_time_range, total_price};
pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{ActiveRide, RidePhase, RideSession};
