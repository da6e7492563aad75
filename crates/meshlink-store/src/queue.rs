//! CRUD and maintenance operations for the offline send queue.
//!
//! Timestamps are stored as epoch milliseconds so that retry-eligibility
//! gating runs inside SQL.  `last_attempt_time = 0` means "never attempted";
//! such rows are immediately eligible for retry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::QueuedMessage;

const QUEUE_COLUMNS: &str = "uuid, destination_id, payload, queued_time, attempt_count, \
                             max_retries, last_attempt_time, original_packet_id";

impl Database {
    pub fn insert_queued(&self, message: &QueuedMessage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO message_queue
                 (uuid, destination_id, payload, queued_time, attempt_count,
                  max_retries, last_attempt_time, original_packet_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.uuid.to_string(),
                message.destination_id,
                message.payload,
                message.queued_time.timestamp_millis(),
                message.attempt_count,
                message.max_retries,
                message
                    .last_attempt_time
                    .map(|t| t.timestamp_millis())
                    .unwrap_or(0),
                message.original_packet_id,
            ],
        )?;
        Ok(())
    }

    /// All queued rows in FIFO order.
    pub fn get_all_queued(&self) -> Result<Vec<QueuedMessage>> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM message_queue ORDER BY queued_time ASC");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], row_to_queued)?;
        collect(rows)
    }

    /// Queued rows addressed to one destination, FIFO order.
    pub fn get_queued_for_destination(&self, destination_id: &str) -> Result<Vec<QueuedMessage>> {
        let sql = format!(
            "SELECT {QUEUE_COLUMNS} FROM message_queue
             WHERE destination_id = ?1 ORDER BY queued_time ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![destination_id], row_to_queued)?;
        collect(rows)
    }

    pub fn queued_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM message_queue", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn queued_count_for_destination(&self, destination_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM message_queue WHERE destination_id = ?1",
            params![destination_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Rows eligible for a delivery attempt at `now`.
    ///
    /// A row qualifies when it still has retry budget AND either was never
    /// attempted or its last attempt is at least `min_backoff` ago.
    pub fn ready_for_retry(
        &self,
        now: DateTime<Utc>,
        min_backoff: Duration,
    ) -> Result<Vec<QueuedMessage>> {
        let sql = format!(
            "SELECT {QUEUE_COLUMNS} FROM message_queue
             WHERE attempt_count < max_retries
               AND (last_attempt_time = 0 OR ?1 - last_attempt_time >= ?2)
             ORDER BY queued_time ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![now.timestamp_millis(), min_backoff.as_millis() as i64],
            row_to_queued,
        )?;
        collect(rows)
    }

    /// Rows for `destination_id` with retry budget left, ignoring backoff.
    /// Used when the destination is known to have become reachable.
    pub fn ready_for_destination(&self, destination_id: &str) -> Result<Vec<QueuedMessage>> {
        let sql = format!(
            "SELECT {QUEUE_COLUMNS} FROM message_queue
             WHERE destination_id = ?1 AND attempt_count < max_retries
             ORDER BY queued_time ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![destination_id], row_to_queued)?;
        collect(rows)
    }

    /// Record a delivery attempt on a queued row.
    pub fn update_queued_attempt(
        &self,
        uuid: Uuid,
        attempt_count: u32,
        last_attempt_time: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE message_queue SET attempt_count = ?1, last_attempt_time = ?2 WHERE uuid = ?3",
            params![
                attempt_count,
                last_attempt_time.timestamp_millis(),
                uuid.to_string()
            ],
        )?;
        Ok(())
    }

    /// Delete a queued row.  Returns `true` if a row was deleted.
    pub fn delete_queued(&self, uuid: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM message_queue WHERE uuid = ?1",
            params![uuid.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Delete queued rows by the packet id of the original send.
    pub fn delete_queued_by_packet_id(&self, packet_id: u32) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM message_queue WHERE original_packet_id = ?1",
            params![packet_id],
        )?;
        Ok(affected)
    }

    /// Maintenance sweep: drop rows that used up their retry budget.
    pub fn cleanup_expired_messages(&self) -> Result<usize> {
        let affected = self
            .conn()
            .execute("DELETE FROM message_queue WHERE attempt_count >= max_retries", [])?;
        Ok(affected)
    }

    /// Maintenance sweep: drop rows queued before `cutoff` regardless of
    /// attempt count.
    pub fn cleanup_old_messages(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM message_queue WHERE queued_time < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(affected)
    }

    /// Maintenance sweep: keep only the newest `limit` rows.
    pub fn trim_queue_to_newest(&self, limit: usize) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM message_queue WHERE uuid IN (
                 SELECT uuid FROM message_queue
                 ORDER BY queued_time DESC LIMIT -1 OFFSET ?1
             )",
            params![limit as i64],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`QueuedMessage`].
fn row_to_queued(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueuedMessage> {
    let uuid_str: String = row.get(0)?;
    let destination_id: String = row.get(1)?;
    let payload: Vec<u8> = row.get(2)?;
    let queued_ms: i64 = row.get(3)?;
    let attempt_count: u32 = row.get(4)?;
    let max_retries: u32 = row.get(5)?;
    let last_attempt_ms: i64 = row.get(6)?;
    let original_packet_id: u32 = row.get(7)?;

    let uuid = Uuid::parse_str(&uuid_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let queued_time = millis_to_datetime(queued_ms, 3)?;
    let last_attempt_time = if last_attempt_ms == 0 {
        None
    } else {
        Some(millis_to_datetime(last_attempt_ms, 6)?)
    };

    Ok(QueuedMessage {
        uuid,
        destination_id,
        payload,
        queued_time,
        attempt_count,
        max_retries,
        last_attempt_time,
        original_packet_id,
    })
}

fn millis_to_datetime(ms: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<QueuedMessage>>,
) -> Result<Vec<QueuedMessage>> {
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}
