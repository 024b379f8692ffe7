/// Database row types: these map directly to SQLite rows.
/// Distinct from beacon-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub created_at: String,
}

pub struct SosEventRow {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub triggered_by: String,
    pub created_at: String,
}

pub struct DeliveryRow {
    pub event_id: String,
    pub contact: String,
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

pub struct LocationRow {
    pub lat: f64,
    pub lng: f64,
    pub created_at: String,
}
