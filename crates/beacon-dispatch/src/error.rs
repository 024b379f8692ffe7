/// Why a dispatch produced no recorded SOS event.
///
/// Per-contact send failures are not errors: they are recorded in the event
/// and reflected in the report.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Required input missing or malformed. Nothing sent, nothing recorded.
    #[error("{0}")]
    Validation(String),

    #[error("User not found")]
    NotFound,

    /// The user exists but has no emergency contacts. Checked before any send.
    #[error("No emergency contacts set")]
    NoContacts,

    /// The user directory failed before fan-out. Nothing sent.
    #[error("user lookup failed: {0}")]
    Lookup(String),

    /// Sends were attempted but the history append failed.
    #[error("SOS event not recorded after notifying {delivered} of {total} contacts: {reason}")]
    NotRecorded {
        delivered: usize,
        total: usize,
        reason: String,
    },
}

impl DispatchError {
    /// Text that is safe to hand back to the client.
    pub fn client_message(&self) -> String {
        match self {
            DispatchError::Validation(_) | DispatchError::NotFound | DispatchError::NoContacts => {
                self.to_string()
            }
            DispatchError::Lookup(_) => "Failed to send SOS".to_string(),
            DispatchError::NotRecorded { delivered, total, .. } => format!(
                "SOS alert reached {} of {} contacts but could not be saved to history",
                delivered, total
            ),
        }
    }
}
