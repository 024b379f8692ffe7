//! Distance math and nearby safe-place lookup.

pub mod distance;
pub mod overpass;
pub mod places;

pub use distance::distance_km;
pub use overpass::OverpassPlaceFinder;
pub use places::{Place, PlaceFinder, PlacesError};
