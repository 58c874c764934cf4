//! Durable last-success store.
//!
//! # Table design
//!
//! ```text
//! update_ts(name TEXT PRIMARY KEY, value REAL NOT NULL DEFAULT 0)
//! ```
//!
//! One row per [`ActionKind`], keyed by [`ActionKind::tracker_key`], holding
//! seconds since the epoch. Writes go through a single conditional
//! `UPDATE ... WHERE value < ?`, so a value only ever moves forward and
//! SQLite's journal keeps either the old or the new value after a crash.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, UpdaterError};
use crate::types::{from_epoch_secs, to_epoch_secs, ActionKind};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS update_ts (
    name TEXT PRIMARY KEY,
    value REAL NOT NULL DEFAULT 0
)";

pub struct Tracker {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker").field("path", &self.path).finish()
    }
}

impl Tracker {
    /// Open or create the database at `path`.
    ///
    /// Missing rows are seeded with `0`; existing values are left alone.
    pub fn open(path: &Path) -> Result<Self> {
        let _span = tracing::debug_span!("tracker").entered();
        let storage = |e: rusqlite::Error| {
            UpdaterError::StorageUnavailable(format!("{}: {e}", path.display()))
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                UpdaterError::StorageUnavailable(format!("{}: {e}", parent.display()))
            })?;
        }
        let mut conn = Connection::open(path).map_err(storage)?;
        conn.execute_batch(SCHEMA).map_err(storage)?;

        let tx = conn.transaction().map_err(storage)?;
        for kind in ActionKind::all() {
            tx.execute(
                "INSERT OR IGNORE INTO update_ts (name, value) VALUES (?1, 0)",
                params![kind.tracker_key()],
            )
            .map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        tracing::debug!(path = %path.display(), "tracker opened");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last committed success for `kind`, or the epoch if never recorded.
    pub fn last(&self, kind: ActionKind) -> Result<DateTime<Utc>> {
        let value: Option<f64> = self
            .conn
            .query_row(
                "SELECT value FROM update_ts WHERE name = ?1",
                params![kind.tracker_key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map(from_epoch_secs).unwrap_or(DateTime::UNIX_EPOCH))
    }

    /// Commit `ts` for `kind` iff it is strictly newer than the stored value.
    ///
    /// Returns whether the value moved. An older or equal `ts` is a no-op.
    pub fn record(&self, kind: ActionKind, ts: DateTime<Utc>) -> Result<bool> {
        let _span = tracing::debug_span!("tracker").entered();
        let secs = to_epoch_secs(ts);
        let changed = self.conn.execute(
            "UPDATE update_ts SET value = ?1 WHERE name = ?2 AND value < ?1",
            params![secs, kind.tracker_key()],
        )?;
        if changed == 0 {
            tracing::debug!(%kind, ts = %ts, "record skipped: stored value is not older");
        } else {
            tracing::debug!(%kind, ts = %ts, "recorded success");
        }
        Ok(changed > 0)
    }

    /// Every tracked kind with its last success, in registration order.
    pub fn snapshot(&self) -> Result<Vec<(ActionKind, DateTime<Utc>)>> {
        ActionKind::all()
            .iter()
            .map(|&kind| Ok((kind, self.last(kind)?)))
            .collect()
    }

    /// Close the connection, surfacing any error the drop would swallow.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| UpdaterError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, Tracker) {
        let dir = TempDir::new().unwrap();
        let tracker = Tracker::open(&dir.path().join("updater.db")).unwrap();
        (dir, tracker)
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn fresh_store_defaults_to_epoch() {
        let (_dir, tracker) = open_tmp();
        for &kind in ActionKind::all() {
            assert_eq!(tracker.last(kind).unwrap(), DateTime::UNIX_EPOCH);
        }
    }

    #[test]
    fn older_write_is_a_no_op() {
        let (_dir, tracker) = open_tmp();
        let t1 = ts(1_700_000_100);
        let t0 = ts(1_700_000_000);
        assert!(tracker.record(ActionKind::Update, t1).unwrap());
        assert!(!tracker.record(ActionKind::Update, t0).unwrap());
        assert_eq!(tracker.last(ActionKind::Update).unwrap(), t1);
    }

    #[test]
    fn equal_write_is_a_no_op() {
        let (_dir, tracker) = open_tmp();
        let t1 = ts(1_700_000_100);
        tracker.record(ActionKind::Refresh, t1).unwrap();
        assert!(!tracker.record(ActionKind::Refresh, t1).unwrap());
    }

    #[test]
    fn newer_write_wins() {
        let (_dir, tracker) = open_tmp();
        let t1 = ts(1_700_000_000);
        let t2 = t1 + TimeDelta::milliseconds(1500);
        tracker.record(ActionKind::Refresh, t1).unwrap();
        tracker.record(ActionKind::Refresh, t2).unwrap();
        assert_eq!(tracker.last(ActionKind::Refresh).unwrap(), t2);
    }

    #[test]
    fn kinds_are_independent() {
        let (_dir, tracker) = open_tmp();
        tracker.record(ActionKind::Refresh, ts(1_700_000_000)).unwrap();
        assert_eq!(
            tracker.last(ActionKind::Update).unwrap(),
            DateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn reopen_keeps_existing_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("updater.db");
        let t = ts(1_700_000_000);
        {
            let tracker = Tracker::open(&path).unwrap();
            tracker.record(ActionKind::Update, t).unwrap();
            tracker.close().unwrap();
        }
        let tracker = Tracker::open(&path).unwrap();
        assert_eq!(tracker.last(ActionKind::Update).unwrap(), t);
        assert_eq!(
            tracker.last(ActionKind::Refresh).unwrap(),
            DateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn reads_rows_written_by_older_installs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("updater.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            conn.execute(
                "INSERT INTO update_ts (name, value) VALUES ('last', 1600000000.5)",
                [],
            )
            .unwrap();
        }
        let tracker = Tracker::open(&path).unwrap();
        assert_eq!(
            tracker.last(ActionKind::Update).unwrap(),
            DateTime::from_timestamp_millis(1_600_000_000_500).unwrap()
        );
        assert_eq!(
            tracker.last(ActionKind::Refresh).unwrap(),
            DateTime::UNIX_EPOCH
        );
    }

    #[test]
    fn snapshot_lists_every_kind() {
        let (_dir, tracker) = open_tmp();
        tracker.record(ActionKind::Update, ts(5)).unwrap();
        let snap = tracker.snapshot().unwrap();
        assert_eq!(
            snap,
            vec![
                (ActionKind::Refresh, DateTime::UNIX_EPOCH),
                (ActionKind::Update, ts(5)),
            ]
        );
    }

    #[test]
    fn unopenable_path_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        // A directory where the database file should be.
        let path = dir.path().join("updater.db");
        std::fs::create_dir(&path).unwrap();
        let err = Tracker::open(&path).unwrap_err();
        assert!(matches!(err, UpdaterError::StorageUnavailable(_)), "{err}");
    }
}
