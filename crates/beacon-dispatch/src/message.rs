use beacon_types::models::Location;
use chrono::{DateTime, FixedOffset, Utc};

/// e.g. `16/10/2026, 03:04:05 PM`
pub fn format_alert_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d/%m/%Y, %I:%M:%S %p").to_string()
}

/// The alert text sent to every contact of one dispatch.
pub fn compose_alert(name: &str, location: Location, at: DateTime<Utc>, offset: FixedOffset) -> String {
    format!(
        "🚨 EMERGENCY ALERT! {} needs immediate help!\nLocation: {}\nTime: {}\nPlease check on them immediately!",
        name,
        location.map_link(),
        format_alert_time(at, offset)
    )
}
