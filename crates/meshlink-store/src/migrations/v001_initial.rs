//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `messages` (stored chat history) and
//! `message_queue` (offline send queue).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    uuid          TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    packet_id     INTEGER NOT NULL,           -- mesh packet id of the send
    sender        TEXT NOT NULL,              -- node id, e.g. !0a1b2c3d
    destination   TEXT NOT NULL,              -- node id or ^all
    channel       INTEGER NOT NULL,           -- index into the current channel set
    text          TEXT NOT NULL,
    status        TEXT NOT NULL,              -- queued / enroute / delivered / received / error
    retry_count   INTEGER NOT NULL DEFAULT 0,
    received_time TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_ts
    ON messages(channel, received_time DESC);

CREATE INDEX IF NOT EXISTS idx_messages_packet_id
    ON messages(packet_id);

-- ----------------------------------------------------------------
-- Offline send queue
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS message_queue (
    uuid               TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    destination_id     TEXT NOT NULL,              -- node id or ^all
    payload            BLOB NOT NULL,              -- serialized DataPacket
    queued_time        INTEGER NOT NULL,           -- epoch millis
    attempt_count      INTEGER NOT NULL DEFAULT 0,
    max_retries        INTEGER NOT NULL,
    last_attempt_time  INTEGER NOT NULL DEFAULT 0, -- epoch millis, 0 = never
    original_packet_id INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_destination
    ON message_queue(destination_id);

CREATE INDEX IF NOT EXISTS idx_queue_fifo
    ON message_queue(queued_time ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
