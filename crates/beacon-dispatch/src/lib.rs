//! SOS dispatch workflow.
//!
//! One call to [`Dispatcher::dispatch`] validates the trigger, loads the user,
//! notifies every emergency contact in order, and appends exactly one
//! [`SosEvent`](beacon_types::models::SosEvent) to the user's history. Storage,
//! transport and time are injected through the traits in [`ports`].

pub mod config;
pub mod error;
pub mod message;
pub mod ports;
pub mod report;
pub mod workflow;

pub use config::DispatchConfig;
pub use error::DispatchError;
pub use ports::{Clock, HistoryStore, StoreError, SystemClock, UserDirectory};
pub use report::{DeliveryTier, DispatchReport};
pub use workflow::{DispatchRequest, Dispatcher};
