//! Channel reassignment engine.
//!
//! Applies a [`ChannelRemap`] to every stored message in one transaction,
//! so that history keeps referring to the same logical channel after the
//! channel list is edited, reordered, or replaced.  Messages on channels
//! with no PSK match in the new list are left untouched and reported.

use meshlink_shared::{channel_remap, Channel};
use rusqlite::params;

use crate::database::Database;
use crate::error::Result;

/// Outcome of a channel migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapReport {
    /// Message rows whose `channel` column changed.
    pub moved_rows: usize,
    /// The old-index -> new-index moves that were applied.
    pub moves: Vec<(usize, usize)>,
    /// Old indices with no match in the new list; their rows keep the old
    /// index and need user attention.
    pub unresolved: Vec<usize>,
}

impl Database {
    /// Rewrite every message's `channel` index from `old` to `new` slots.
    ///
    /// The whole update runs in a single transaction: a crash or concurrent
    /// read never observes some rows on old indices and some on new ones.
    /// Calling with identical lists is a no-op.
    pub fn migrate_channels(&mut self, old: &[Channel], new: &[Channel]) -> Result<RemapReport> {
        let remap = channel_remap(old, new);
        let moves: Vec<(usize, usize)> = remap.moves().collect();
        let unresolved = remap.unresolved();

        for &index in &unresolved {
            tracing::warn!(
                index,
                name = %old[index].name,
                psk = %old[index].psk_hex(),
                "channel has no PSK match in the new list; its messages keep the old index"
            );
        }

        if moves.is_empty() {
            return Ok(RemapReport {
                moved_rows: 0,
                moves,
                unresolved,
            });
        }

        // Two-phase update: park moved rows on a negative encoding first so
        // that index chains and swaps (0 -> 1 while 1 -> 0) cannot collide,
        // then flip every parked row to its real index.
        let tx = self.conn_mut().transaction()?;
        let mut moved_rows = 0;
        for &(old_index, new_index) in &moves {
            moved_rows += tx.execute(
                "UPDATE messages SET channel = ?1 WHERE channel = ?2",
                params![-(new_index as i64) - 1, old_index as i64],
            )?;
        }
        tx.execute("UPDATE messages SET channel = -channel - 1 WHERE channel < 0", [])?;
        tx.commit()?;

        tracing::info!(moved_rows, moves = moves.len(), "migrated message channels");

        Ok(RemapReport {
            moved_rows,
            moves,
            unresolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredMessage;
    use chrono::Utc;
    use meshlink_shared::MessageStatus;
    use uuid::Uuid;

    fn ch(name: &str, psk: &[u8]) -> Channel {
        Channel::new(name, psk.to_vec())
    }

    fn insert(db: &Database, channel: i32, text: &str) {
        let msg = StoredMessage {
            uuid: Uuid::new_v4(),
            packet_id: channel as u32 + 100,
            sender: "!00000001".to_string(),
            destination: "^all".to_string(),
            channel,
            text: text.to_string(),
            status: MessageStatus::Received,
            retry_count: 0,
            received_time: Utc::now(),
        };
        db.insert_message(&msg).unwrap();
    }

    fn channel_of(db: &Database, text: &str) -> i32 {
        let all: Vec<StoredMessage> = (0..8)
            .flat_map(|c| db.get_messages_for_channel(c, 100, 0).unwrap())
            .collect();
        all.iter()
            .find(|m| m.text == text)
            .unwrap_or_else(|| panic!("message {text:?} not found"))
            .channel
    }

    #[test]
    fn identical_lists_are_a_noop() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "stay");
        let list = vec![ch("A", &[1]), ch("B", &[2])];

        let report = db.migrate_channels(&list, &list).unwrap();
        assert_eq!(report.moved_rows, 0);
        assert!(report.moves.is_empty());
        assert_eq!(channel_of(&db, "stay"), 0);
    }

    #[test]
    fn duplicate_psk_keeps_message_on_original_slot() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "Message Ch0");

        let old = vec![ch("LongFast", &[1])];
        let new = vec![ch("LongFast", &[1]), ch("NewChan", &[1])];
        db.migrate_channels(&old, &new).unwrap();

        assert_eq!(channel_of(&db, "Message Ch0"), 0);
    }

    #[test]
    fn reorder_moves_messages_with_their_psk() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "Msg A");
        insert(&db, 1, "Msg B");

        let old = vec![ch("A", &[1]), ch("B", &[2])];
        let new = vec![ch("B", &[2]), ch("A", &[1])];
        let report = db.migrate_channels(&old, &new).unwrap();

        assert_eq!(report.moved_rows, 2);
        assert_eq!(channel_of(&db, "Msg A"), 1);
        assert_eq!(channel_of(&db, "Msg B"), 0);
    }

    #[test]
    fn shared_psk_disambiguates_by_name() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "Msg A1");
        insert(&db, 1, "Msg A2");

        let old = vec![ch("A1", &[1]), ch("A2", &[1])];
        let new = vec![ch("A2", &[1]), ch("A1", &[1])];
        db.migrate_channels(&old, &new).unwrap();

        assert_eq!(channel_of(&db, "Msg A1"), 1);
        assert_eq!(channel_of(&db, "Msg A2"), 0);
    }

    #[test]
    fn fully_ambiguous_channels_prefer_same_index() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "Msg A");

        let old = vec![ch("A", &[1])];
        let new = vec![ch("A", &[1]), ch("A", &[1])];
        let report = db.migrate_channels(&old, &new).unwrap();

        assert_eq!(report.moved_rows, 0);
        assert_eq!(channel_of(&db, "Msg A"), 0);
    }

    #[test]
    fn unresolved_channels_leave_rows_untouched() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "kept");
        insert(&db, 1, "orphan");

        let old = vec![ch("A", &[1]), ch("gone", &[9])];
        let new = vec![ch("A", &[1])];
        let report = db.migrate_channels(&old, &new).unwrap();

        assert_eq!(report.unresolved, vec![1]);
        assert_eq!(channel_of(&db, "kept"), 0);
        // The orphan stays where it was rather than being clamped or lost.
        assert_eq!(channel_of(&db, "orphan"), 1);
    }

    #[test]
    fn three_way_rotation_lands_every_row() {
        let mut db = Database::open_in_memory().unwrap();
        insert(&db, 0, "r0");
        insert(&db, 1, "r1");
        insert(&db, 2, "r2");

        let old = vec![ch("A", &[1]), ch("B", &[2]), ch("C", &[3])];
        let new = vec![ch("C", &[3]), ch("A", &[1]), ch("B", &[2])];
        let report = db.migrate_channels(&old, &new).unwrap();

        assert_eq!(report.moved_rows, 3);
        assert_eq!(channel_of(&db, "r0"), 1);
        assert_eq!(channel_of(&db, "r1"), 2);
        assert_eq!(channel_of(&db, "r2"), 0);
    }
}
