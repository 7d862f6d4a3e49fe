#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod quiz;
pub mod rng;
pub mod time;

pub use error::{Error, ValidationError};
pub use quiz::InvalidStateError;
pub use rng::{RandomSource, RngSource};
pub use time::Clock;
