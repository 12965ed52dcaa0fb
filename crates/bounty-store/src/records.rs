//! Read-only views over the assignment ledger.
//!
//! These reads run outside the append transaction and see the last
//! committed state.

use bounty_core::{AssignmentRecord, RecordId};
use rusqlite::Connection;
use tracing::{debug, error, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TABLE: &str = "assignment_records";

pub(crate) const RECORD_COLUMNS: &str =
    "id, contributor_name, maintainer_name, pull_request_url, points_allotted, created_at";

pub struct RecordRepo {
    db: Database,
}

impl RecordRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every record in the ledger, oldest first.
    #[instrument(skip(self))]
    pub fn all(&self) -> Result<Vec<AssignmentRecord>, StoreError> {
        let records = self.db.with_conn(load_all).map_err(|e| {
            error!(error = %e, "could not fetch all records");
            e
        })?;
        debug!(count = records.len(), "fetched all records");
        Ok(records)
    }

    /// Records that currently credit a contributor matching `pattern` under
    /// SQL `LIKE`, newest first. A record superseded by a later one for the
    /// same pull request is left out.
    ///
    /// Matching is ASCII case-insensitive and `%` / `_` act as wildcards.
    #[instrument(skip(self))]
    pub fn for_contributor(&self, pattern: &str) -> Result<Vec<AssignmentRecord>, StoreError> {
        let records = self
            .query_records(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM {TABLE} AS r
                     WHERE r.contributor_name LIKE ?1
                       AND NOT EXISTS (
                           SELECT 1 FROM {TABLE} AS newer
                           WHERE newer.pull_request_url = r.pull_request_url
                             AND (newer.created_at > r.created_at
                                  OR (newer.created_at = r.created_at AND newer.id > r.id))
                       )
                     ORDER BY r.created_at DESC, r.id DESC"
                ),
                pattern,
            )
            .map_err(|e| {
                error!(error = %e, "could not fetch contributor records");
                e
            })?;
        debug!(count = records.len(), "fetched contributor records");
        Ok(records)
    }

    /// Every record ever naming a contributor matching `pattern`, superseded
    /// ones included, newest first.
    #[instrument(skip(self))]
    pub fn history_for_contributor(
        &self,
        pattern: &str,
    ) -> Result<Vec<AssignmentRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM {TABLE}
                 WHERE contributor_name LIKE ?1
                 ORDER BY created_at DESC, id DESC"
            ),
            pattern,
        )
        .map_err(|e| {
            error!(error = %e, "could not fetch contributor history");
            e
        })
    }

    /// Full history of one pull request, newest first. The first entry is
    /// the one that counts toward the leaderboard.
    #[instrument(skip(self))]
    pub fn for_pull_request(&self, url: &str) -> Result<Vec<AssignmentRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM {TABLE}
                 WHERE pull_request_url = ?1
                 ORDER BY created_at DESC, id DESC"
            ),
            url,
        )
    }

    #[instrument(skip(self))]
    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
                row.get(0)
            })?)
        })
    }

    fn query_records(
        &self,
        sql: &str,
        param: &str,
    ) -> Result<Vec<AssignmentRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query([param])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_record(row)?);
            }
            Ok(results)
        })
    }
}

/// Load the whole ledger through `conn`, which may be an open transaction.
pub(crate) fn load_all(conn: &Connection) -> Result<Vec<AssignmentRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM {TABLE} ORDER BY id ASC"))?;
    let mut rows = stmt.query([])?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(row_to_record(row)?);
    }
    Ok(results)
}

pub(crate) fn row_to_record(row: &rusqlite::Row<'_>) -> Result<AssignmentRecord, StoreError> {
    let created_at: String = row_helpers::get(row, 5, TABLE, "created_at")?;

    Ok(AssignmentRecord {
        id: RecordId::from_raw(row_helpers::get(row, 0, TABLE, "id")?),
        contributor_name: row_helpers::get(row, 1, TABLE, "contributor_name")?,
        maintainer_name: row_helpers::get(row, 2, TABLE, "maintainer_name")?,
        pull_request_url: row_helpers::get(row, 3, TABLE, "pull_request_url")?,
        points_allotted: row_helpers::get(row, 4, TABLE, "points_allotted")?,
        created_at: row_helpers::parse_timestamp(&created_at, TABLE, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRepo;
    use bounty_core::NewAssignment;

    fn setup() -> (LedgerRepo, RecordRepo) {
        let db = Database::in_memory().unwrap();
        (LedgerRepo::new(db.clone()), RecordRepo::new(db))
    }

    #[test]
    fn all_on_empty_ledger() {
        let (_, records) = setup();
        assert!(records.all().unwrap().is_empty());
        assert_eq!(records.count().unwrap(), 0);
    }

    #[test]
    fn all_returns_history_including_superseded() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "bob", "url1", 10)).unwrap();
        ledger.append(&NewAssignment::new("alice", "carol", "url1", 10)).unwrap();

        let all = records.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].contributor_name, "bob");
        assert_eq!(all[1].contributor_name, "carol");
        assert_eq!(records.count().unwrap(), 2);
    }

    #[test]
    fn contributor_records_newest_first() {
        let (ledger, records) = setup();
        let first = ledger.append(&NewAssignment::new("alice", "bob", "url1", 1)).unwrap();
        let second = ledger.append(&NewAssignment::new("alice", "bob", "url2", 2)).unwrap();
        ledger.append(&NewAssignment::new("alice", "carol", "url3", 3)).unwrap();

        let bob = records.for_contributor("bob").unwrap();
        let ids: Vec<_> = bob.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn superseded_records_leave_contributor_view() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "bob", "url1", 10)).unwrap();
        ledger.append(&NewAssignment::new("alice", "carol", "url1", 10)).unwrap();
        let url2 = ledger.append(&NewAssignment::new("alice", "bob", "url2", 5)).unwrap();

        assert_eq!(records.for_contributor("bob").unwrap(), vec![url2.clone()]);

        let history = records.history_for_contributor("bob").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], url2);
        assert_eq!(history[1].pull_request_url, "url1");
    }

    #[test]
    fn correction_by_same_contributor_keeps_only_latest() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "bob", "url1", 10)).unwrap();
        let fixed = ledger.append(&NewAssignment::new("alice", "bob", "url1", 4)).unwrap();
        assert_eq!(records.for_contributor("bob").unwrap(), vec![fixed]);
        assert_eq!(records.history_for_contributor("bob").unwrap().len(), 2);
    }

    #[test]
    fn contributor_match_is_case_insensitive() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "Bob", "url1", 1)).unwrap();
        assert_eq!(records.for_contributor("bob").unwrap().len(), 1);
    }

    #[test]
    fn contributor_match_honours_wildcards() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "bobby", "url1", 1)).unwrap();
        ledger.append(&NewAssignment::new("alice", "bob", "url2", 1)).unwrap();
        assert_eq!(records.for_contributor("bob").unwrap().len(), 1);
        assert_eq!(records.for_contributor("bob%").unwrap().len(), 2);
    }

    #[test]
    fn unknown_contributor_is_empty() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "bob", "url1", 1)).unwrap();
        assert!(records.for_contributor("nobody").unwrap().is_empty());
    }

    #[test]
    fn pull_request_history() {
        let (ledger, records) = setup();
        ledger.append(&NewAssignment::new("alice", "bob", "url1", 10)).unwrap();
        ledger.append(&NewAssignment::new("alice", "bob", "url2", 4)).unwrap();
        ledger.append(&NewAssignment::new("erin", "carol", "url1", 8)).unwrap();

        let history = records.for_pull_request("url1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].contributor_name, "carol");
        assert_eq!(history[0].maintainer_name, "erin");
        assert_eq!(history[1].contributor_name, "bob");
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO assignment_records
                 (contributor_name, maintainer_name, pull_request_url, points_allotted, created_at)
                 VALUES ('bob', 'alice', 'url1', 1, 'not a time')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let err = RecordRepo::new(db).all().unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { column: "created_at", .. }));
    }
}
