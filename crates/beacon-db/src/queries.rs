use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use beacon_types::models::{DeliveryOutcome, Location, LocationPing, SosEvent, User};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::Database;
use crate::models::{DeliveryRow, LocationRow, SosEventRow, UserRow};

impl Database {
    // -- Users --

    /// Insert a user. Returns `false`, inserting nothing, when the email is
    /// already registered.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        phone: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let created_at = format_timestamp(Utc::now());
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, name, email, phone, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email) DO NOTHING",
                (id, name, email, phone, password_hash, &created_at),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Loads a user together with their ordered contact list.
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let Some(row) = query_user(conn, "id", id)? else {
                return Ok(None);
            };
            let contacts = query_contacts(conn, id)?;
            Ok(Some(User {
                id: row.id.parse().with_context(|| format!("corrupt user id '{}'", row.id))?,
                name: row.name,
                email: row.email,
                phone: row.phone,
                emergency_contacts: contacts,
                created_at: parse_timestamp(&row.created_at)?,
            }))
        })
    }

    // -- Contacts --

    /// Replace the whole contact list. Returns `false` if the user does not exist.
    pub fn set_contacts(&self, user_id: &str, contacts: &[String]) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_user(&tx, "id", user_id)?.is_none() {
                return Ok(false);
            }

            tx.execute("DELETE FROM emergency_contacts WHERE user_id = ?1", [user_id])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO emergency_contacts (user_id, position, phone) VALUES (?1, ?2, ?3)",
                )?;
                for (position, phone) in contacts.iter().enumerate() {
                    stmt.execute(rusqlite::params![user_id, position as i64, phone])?;
                }
            }
            tx.commit()?;
            Ok(true)
        })
    }

    // -- SOS history --

    /// Append one SOS event with its per-contact outcomes in a single transaction.
    pub fn append_sos_event(&self, user_id: &str, event: &SosEvent) -> Result<()> {
        if event.contacts_notified.len() != event.outcomes.len() {
            bail!(
                "SOS event {} has {} contacts but {} outcomes",
                event.id,
                event.contacts_notified.len(),
                event.outcomes.len()
            );
        }

        let event_id = event.id.to_string();
        let created_at = format_timestamp(event.timestamp);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO sos_events (id, user_id, lat, lng, triggered_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    event_id,
                    user_id,
                    event.location.lat,
                    event.location.lng,
                    event.triggered_by.as_str(),
                    created_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO sos_deliveries (event_id, position, contact, success, response, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for (position, outcome) in event.outcomes.iter().enumerate() {
                    stmt.execute(rusqlite::params![
                        event_id,
                        position as i64,
                        outcome.contact,
                        outcome.success,
                        outcome.response,
                        outcome.error,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// SOS events in insertion order. With a limit, only the newest `limit`
    /// events are returned (still oldest first).
    pub fn list_sos_events(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<SosEvent>> {
        let (event_rows, delivery_rows) = self.with_conn(|conn| {
            let events = query_sos_events(conn, user_id, limit)?;
            let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
            let deliveries = query_deliveries(conn, &ids)?;
            Ok((events, deliveries))
        })?;

        let mut by_event: HashMap<String, Vec<DeliveryOutcome>> = HashMap::new();
        for row in delivery_rows {
            by_event.entry(row.event_id).or_default().push(DeliveryOutcome {
                contact: row.contact,
                success: row.success,
                response: row.response,
                error: row.error,
            });
        }

        event_rows
            .into_iter()
            .map(|row| {
                let outcomes = by_event.remove(&row.id).unwrap_or_default();
                Ok(SosEvent {
                    id: row.id.parse().with_context(|| format!("corrupt SOS event id '{}'", row.id))?,
                    location: Location { lat: row.lat, lng: row.lng },
                    triggered_by: row.triggered_by.into(),
                    timestamp: parse_timestamp(&row.created_at)?,
                    contacts_notified: outcomes.iter().map(|o| o.contact.clone()).collect(),
                    outcomes,
                })
            })
            .collect()
    }

    // -- Location pings --

    pub fn record_location(&self, user_id: &str, ping: &LocationPing) -> Result<()> {
        let created_at = format_timestamp(ping.timestamp);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO location_pings (user_id, lat, lng, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, ping.lat, ping.lng, created_at],
            )?;
            Ok(())
        })
    }

    /// Newest pings first.
    pub fn list_locations(&self, user_id: &str, limit: u32) -> Result<Vec<LocationPing>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT lat, lng, created_at FROM location_pings
                 WHERE user_id = ?1
                 ORDER BY seq DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(LocationRow {
                        lat: row.get(0)?,
                        lng: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(LocationPing {
                    lat: row.lat,
                    lng: row.lng,
                    timestamp: parse_timestamp(&row.created_at)?,
                })
            })
            .collect()
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is only ever one of our own literals.
    let sql = format!(
        "SELECT id, name, email, phone, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                password: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_contacts(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT phone FROM emergency_contacts WHERE user_id = ?1 ORDER BY position ASC",
    )?;
    let contacts = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(contacts)
}

fn query_sos_events(
    conn: &Connection,
    user_id: &str,
    limit: Option<u32>,
) -> Result<Vec<SosEventRow>> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit = limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare(
        "SELECT id, lat, lng, triggered_by, created_at FROM (
             SELECT seq, id, lat, lng, triggered_by, created_at
             FROM sos_events
             WHERE user_id = ?1
             ORDER BY seq DESC
             LIMIT ?2
         )
         ORDER BY seq ASC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![user_id, limit], |row| {
            Ok(SosEventRow {
                id: row.get(0)?,
                lat: row.get(1)?,
                lng: row.get(2)?,
                triggered_by: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Batch-fetch deliveries for a set of event IDs, ordered by position.
fn query_deliveries(conn: &Connection, event_ids: &[String]) -> Result<Vec<DeliveryRow>> {
    if event_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=event_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT event_id, contact, success, response, error FROM sos_deliveries
         WHERE event_id IN ({})
         ORDER BY event_id, position ASC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(event_ids.iter()), |row| {
            Ok(DeliveryRow {
                event_id: row.get(0)?,
                contact: row.get(1)?,
                success: row.get(2)?,
                response: row.get(3)?,
                error: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}
