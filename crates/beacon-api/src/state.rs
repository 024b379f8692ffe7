use std::sync::Arc;

use beacon_db::Database;
use beacon_dispatch::{DispatchConfig, Dispatcher, SystemClock};
use beacon_geo::PlaceFinder;
use beacon_sms::SmsTransport;

use crate::store::DbStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub places: Arc<dyn PlaceFinder>,
}

impl AppStateInner {
    /// Wire the SOS dispatcher to the database and the given transport.
    pub fn new(
        db: Arc<Database>,
        jwt_secret: String,
        transport: Arc<dyn SmsTransport>,
        places: Arc<dyn PlaceFinder>,
        dispatch_config: DispatchConfig,
    ) -> AppState {
        let store = Arc::new(DbStore::new(db.clone()));
        let dispatcher = Dispatcher::new(
            store.clone(),
            store,
            transport,
            Arc::new(SystemClock),
            dispatch_config,
        );
        Arc::new(Self {
            db,
            jwt_secret,
            dispatcher,
            places,
        })
    }
}
