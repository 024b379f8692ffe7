//! HTTP surface of the Beacon backend.

pub mod auth;
pub mod contacts;
pub mod error;
pub mod location;
pub mod middleware;
pub mod places;
pub mod routes;
pub mod sos;
pub mod state;
pub mod store;

pub use routes::router;
pub use state::{AppState, AppStateInner};
