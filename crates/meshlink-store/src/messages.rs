//! CRUD operations for [`StoredMessage`] rows.

use chrono::{DateTime, Utc};
use meshlink_shared::MessageStatus;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::StoredMessage;

impl Database {
    pub fn insert_message(&self, message: &StoredMessage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages
                 (uuid, packet_id, sender, destination, channel, text, status, retry_count, received_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.uuid.to_string(),
                message.packet_id,
                message.sender,
                message.destination,
                message.channel,
                message.text,
                message.status.as_str(),
                message.retry_count,
                message.received_time.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_message(&self, uuid: Uuid) -> Result<StoredMessage> {
        self.conn()
            .query_row(
                "SELECT uuid, packet_id, sender, destination, channel, text, status, retry_count, received_time
                 FROM messages WHERE uuid = ?1",
                params![uuid.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch the message whose latest send attempt used `packet_id`.
    pub fn get_message_by_packet_id(&self, packet_id: u32) -> Result<Option<StoredMessage>> {
        let result = self.conn().query_row(
            "SELECT uuid, packet_id, sender, destination, channel, text, status, retry_count, received_time
             FROM messages WHERE packet_id = ?1
             ORDER BY received_time DESC LIMIT 1",
            params![packet_id],
            row_to_message,
        );
        match result {
            Ok(message) => Ok(Some(message)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    pub fn get_messages_for_channel(
        &self,
        channel: i32,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT uuid, packet_id, sender, destination, channel, text, status, retry_count, received_time
             FROM messages
             WHERE channel = ?1
             ORDER BY received_time DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![channel, limit, offset], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Update the delivery status of the message behind `packet_id`.
    /// Returns `false` if no such message exists.
    pub fn update_message_status(&self, packet_id: u32, status: MessageStatus) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE messages SET status = ?1 WHERE packet_id = ?2",
            params![status.as_str(), packet_id],
        )?;
        Ok(affected > 0)
    }

    /// Rewrite a message for a fresh send attempt: new packet id, bumped
    /// retry count, status back to queued.
    pub fn update_message_for_retry(
        &self,
        uuid: Uuid,
        new_packet_id: u32,
        retry_count: u32,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE messages SET packet_id = ?1, retry_count = ?2, status = ?3 WHERE uuid = ?4",
            params![
                new_packet_id,
                retry_count,
                MessageStatus::Queued.as_str(),
                uuid.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn delete_message(&self, uuid: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM messages WHERE uuid = ?1",
            params![uuid.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`StoredMessage`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let uuid_str: String = row.get(0)?;
    let packet_id: u32 = row.get(1)?;
    let sender: String = row.get(2)?;
    let destination: String = row.get(3)?;
    let channel: i32 = row.get(4)?;
    let text: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let retry_count: u32 = row.get(7)?;
    let ts_str: String = row.get(8)?;

    let uuid = Uuid::parse_str(&uuid_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status = MessageStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown message status: {status_str}").into(),
        )
    })?;

    let received_time: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(StoredMessage {
        uuid,
        packet_id,
        sender,
        destination,
        channel,
        text,
        status,
        retry_count,
        received_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(channel: i32, text: &str) -> StoredMessage {
        StoredMessage {
            uuid: Uuid::new_v4(),
            packet_id: rand_id(text),
            sender: "!00000001".to_string(),
            destination: "^all".to_string(),
            channel,
            text: text.to_string(),
            status: MessageStatus::Enroute,
            retry_count: 0,
            received_time: Utc::now(),
        }
    }

    // Deterministic per-text packet id, good enough for tests.
    fn rand_id(text: &str) -> u32 {
        text.bytes().fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let msg = message(0, "hello");
        db.insert_message(&msg).unwrap();

        let fetched = db.get_message(msg.uuid).unwrap();
        assert_eq!(fetched.text, "hello");
        assert_eq!(fetched.status, MessageStatus::Enroute);

        let by_packet = db.get_message_by_packet_id(msg.packet_id).unwrap();
        assert_eq!(by_packet.map(|m| m.uuid), Some(msg.uuid));
    }

    #[test]
    fn unknown_packet_id_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_message_by_packet_id(999).unwrap().is_none());
    }

    #[test]
    fn status_update_and_retry_rewrite() {
        let db = Database::open_in_memory().unwrap();
        let msg = message(1, "retry me");
        db.insert_message(&msg).unwrap();

        assert!(db
            .update_message_status(msg.packet_id, MessageStatus::Delivered)
            .unwrap());
        assert_eq!(
            db.get_message(msg.uuid).unwrap().status,
            MessageStatus::Delivered
        );

        db.update_message_for_retry(msg.uuid, 4242, 2).unwrap();
        let updated = db.get_message(msg.uuid).unwrap();
        assert_eq!(updated.packet_id, 4242);
        assert_eq!(updated.retry_count, 2);
        assert_eq!(updated.status, MessageStatus::Queued);
    }

    #[test]
    fn channel_listing_filters_by_index() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&message(0, "on zero")).unwrap();
        db.insert_message(&message(2, "on two")).unwrap();

        let ch0 = db.get_messages_for_channel(0, 50, 0).unwrap();
        assert_eq!(ch0.len(), 1);
        assert_eq!(ch0[0].text, "on zero");
        assert!(db.get_messages_for_channel(1, 50, 0).unwrap().is_empty());
    }
}
