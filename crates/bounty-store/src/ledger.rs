//! Append-only assignment ledger.

use bounty_core::{AssignmentRecord, NewAssignment, RecordId};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::Connection;
use tracing::{error, info, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::leaderboard;
use crate::row_helpers;

const TABLE: &str = "assignment_records";

pub struct LedgerRepo {
    db: Database,
}

impl LedgerRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a bounty assignment and rebuild the leaderboard. Atomically:
    /// 1. Takes the database write lock (`BEGIN IMMEDIATE`)
    /// 2. Inserts the new record with a fresh id and timestamp
    /// 3. Recomputes the leaderboard from the full ledger
    /// 4. Commits
    ///
    /// Re-using a pull request URL is a correction, not an error: the new
    /// record supersedes the old one in the totals. If any step fails
    /// nothing is written and the error is returned.
    #[instrument(
        skip(self, assignment),
        fields(
            maintainer = %assignment.maintainer,
            contributor = %assignment.contributor,
            pull_request_url = %assignment.pull_request_url,
            points = assignment.points
        )
    )]
    pub fn append(&self, assignment: &NewAssignment) -> Result<AssignmentRecord, StoreError> {
        info!("beginning bounty assignment");

        let result = self.db.with_transaction(|tx| {
            let created_at = next_timestamp(tx)?;

            tx.execute(
                &format!(
                    "INSERT INTO {TABLE}
                     (contributor_name, maintainer_name, pull_request_url, points_allotted, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                rusqlite::params![
                    assignment.contributor,
                    assignment.maintainer,
                    assignment.pull_request_url,
                    assignment.points,
                    row_helpers::format_timestamp(&created_at),
                ],
            )
            .map_err(|e| {
                error!(error = %e, "could not create assignment record");
                StoreError::from(e)
            })?;

            let id = RecordId::from_raw(tx.last_insert_rowid());
            info!(record_id = %id, "created assignment record");

            let contributors = leaderboard::recompute(tx).map_err(|e| {
                error!(error = %e, "could not recompute leaderboard");
                e
            })?;
            info!(contributors, "recomputed leaderboard");

            Ok(AssignmentRecord {
                id,
                contributor_name: assignment.contributor.clone(),
                maintainer_name: assignment.maintainer.clone(),
                pull_request_url: assignment.pull_request_url.clone(),
                points_allotted: assignment.points,
                created_at,
            })
        });

        match &result {
            Ok(record) => info!(record_id = %record.id, "bounty assignment committed"),
            Err(e) => error!(error = %e, "bounty assignment rolled back"),
        }
        result
    }
}

/// Current time at the stored precision, bumped past the newest record if
/// the clock has not moved on (or went backwards).
fn next_timestamp(conn: &Connection) -> Result<DateTime<Utc>, StoreError> {
    let now = Utc::now().trunc_subsecs(6);
    let latest: Option<String> =
        conn.query_row(&format!("SELECT MAX(created_at) FROM {TABLE}"), [], |row| {
            row.get(0)
        })?;

    match latest {
        Some(raw) => {
            let latest = row_helpers::parse_timestamp(&raw, TABLE, "created_at")?;
            if now > latest {
                Ok(now)
            } else {
                Ok(latest + Duration::microseconds(1))
            }
        }
        None => Ok(now),
    }
}
