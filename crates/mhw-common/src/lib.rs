//! Common types shared by the heatwave detection crates and services.

pub mod bbox;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use dataset::Dataset;
pub use error::{MhwError, MhwResult};
pub use grid::{GridCoords, EARTH_RADIUS_KM};
pub use time::TimeAxis;
