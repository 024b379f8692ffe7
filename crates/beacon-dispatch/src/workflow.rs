use std::sync::Arc;

use beacon_sms::SmsTransport;
use beacon_types::models::{DeliveryOutcome, Location, SosEvent, TriggerSource, User};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::message::compose_alert;
use crate::ports::{Clock, HistoryStore, UserDirectory};
use crate::report::DispatchReport;

const BUDGET_EXHAUSTED: &str = "not attempted: dispatch time budget exhausted";

/// Raw trigger as received from a client. Presence is checked here, not by
/// the caller, so `lat`/`lng` of `0.0` stay valid.
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    pub user_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub triggered_by: Option<String>,
}

struct ValidatedRequest {
    user_id: Uuid,
    location: Location,
    triggered_by: TriggerSource,
}

/// Runs SOS dispatches against its collaborators. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<dyn UserDirectory>,
    history: Arc<dyn HistoryStore>,
    transport: Arc<dyn SmsTransport>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        history: Arc<dyn HistoryStore>,
        transport: Arc<dyn SmsTransport>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            directory,
            history,
            transport,
            clock,
            config,
        }
    }

    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReport, DispatchError> {
        let request = validate(request)?;

        let user = self
            .directory
            .find_user(request.user_id)
            .await
            .map_err(|e| {
                error!(user_id = %request.user_id, "SOS user lookup failed: {}", e);
                DispatchError::Lookup(e.to_string())
            })?
            .ok_or(DispatchError::NotFound)?;

        if user.emergency_contacts.is_empty() {
            return Err(DispatchError::NoContacts);
        }

        let timestamp = self.clock.now();
        let text = compose_alert(&user.name, request.location, timestamp, self.config.alert_offset);
        // Snapshot: later edits to the live list must not change this event.
        let contacts = user.emergency_contacts.clone();

        info!(
            user_id = %user.id,
            contacts = contacts.len(),
            triggered_by = %request.triggered_by,
            "SOS dispatch started"
        );

        let outcomes = self.fan_out(&user, &contacts, &text).await;

        let event = SosEvent {
            id: Uuid::new_v4(),
            location: request.location,
            triggered_by: request.triggered_by,
            timestamp,
            contacts_notified: contacts,
            outcomes,
        };

        if let Err(e) = self.history.append_sos_event(user.id, &event).await {
            let delivered = event.successful_sends();
            let total = event.contacts_notified.len();
            error!(
                user_id = %user.id,
                event_id = %event.id,
                delivered,
                total,
                "SOS event could not be recorded: {}",
                e
            );
            return Err(DispatchError::NotRecorded {
                delivered,
                total,
                reason: e.to_string(),
            });
        }

        let report = DispatchReport { event };
        info!(
            user_id = %user.id,
            event_id = %report.event.id,
            delivered = report.successful_sends(),
            total = report.contacts_total(),
            "SOS dispatch finished"
        );
        Ok(report)
    }

    /// One attempt per contact, in order. Every contact gets an outcome.
    ///
    /// Waiting for the transport's send slot counts against the dispatch
    /// budget only; the per-send timeout starts once the slot is granted.
    async fn fan_out(&self, user: &User, contacts: &[String], text: &str) -> Vec<DeliveryOutcome> {
        let deadline = Instant::now() + self.config.time_budget;
        let mut outcomes = Vec::with_capacity(contacts.len());

        for contact in contacts {
            if Instant::now() >= deadline || !self.transport.wait_turn(deadline).await {
                warn!(user_id = %user.id, contact = %contact, "SOS send skipped, budget exhausted");
                outcomes.push(DeliveryOutcome::failed(contact, BUDGET_EXHAUSTED));
                continue;
            }

            let limit = deadline
                .saturating_duration_since(Instant::now())
                .min(self.config.send_timeout);
            let outcome = match tokio::time::timeout(limit, self.transport.send(contact, text)).await {
                Ok(Ok(receipt)) => DeliveryOutcome::delivered(contact, receipt.summary()),
                Ok(Err(e)) => {
                    warn!(user_id = %user.id, contact = %contact, "SOS send failed: {}", e);
                    DeliveryOutcome::failed(contact, e.to_string())
                }
                Err(_) => {
                    warn!(user_id = %user.id, contact = %contact, "SOS send timed out after {:?}", limit);
                    DeliveryOutcome::failed(contact, format!("timed out after {} ms", limit.as_millis()))
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

fn validate(request: DispatchRequest) -> Result<ValidatedRequest, DispatchError> {
    let user_id = request.user_id.filter(|id| !id.trim().is_empty());
    let (Some(user_id), Some(lat), Some(lng)) = (user_id, request.lat, request.lng) else {
        return Err(DispatchError::Validation("Missing data".to_string()));
    };

    let user_id: Uuid = user_id
        .trim()
        .parse()
        .map_err(|_| DispatchError::Validation("Invalid user ID".to_string()))?;

    if !lat.is_finite() || !lng.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(DispatchError::Validation("Invalid coordinates".to_string()));
    }

    Ok(ValidatedRequest {
        user_id,
        location: Location { lat, lng },
        triggered_by: request.triggered_by.map(TriggerSource::from).unwrap_or_default(),
    })
}
