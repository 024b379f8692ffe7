use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Settings for the dispatch workflow, built once at startup.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound for a single contact's send attempt.
    pub send_timeout: Duration,
    /// Wall-clock budget for the whole fan-out. Contacts not reached in time
    /// are recorded as failed without an attempt.
    pub time_budget: Duration,
    /// Zone used to print the time inside the alert text.
    pub alert_offset: FixedOffset,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(10),
            time_budget: Duration::from_secs(30),
            alert_offset: Utc.fix(),
        }
    }
}
