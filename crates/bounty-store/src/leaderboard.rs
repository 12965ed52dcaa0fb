//! The materialized leaderboard.
//!
//! The `leaderboard` table is derived data. [`recompute`] throws it away
//! and rebuilds it from the full ledger inside the caller's transaction;
//! nothing else writes to it.

use std::fmt;
use std::str::FromStr;

use bounty_core::{aggregate_leaderboard, LeaderboardEntry};
use rusqlite::Transaction;
use tracing::{debug, error, info, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::records;
use crate::row_helpers;

const TABLE: &str = "leaderboard";

/// Where a leaderboard read gets its numbers from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderboardMode {
    /// Aggregate the ledger now.
    Live,
    /// Read the table written by the last append.
    Materialized,
}

impl fmt::Display for LeaderboardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Materialized => write!(f, "materialized"),
        }
    }
}

impl FromStr for LeaderboardMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "materialized" => Ok(Self::Materialized),
            other => Err(format!("unknown leaderboard mode: {other}")),
        }
    }
}

/// Rebuild the leaderboard table from the full ledger.
///
/// Must run inside the transaction that appended to the ledger so the
/// record and the totals commit together. Returns the number of rows written.
pub(crate) fn recompute(tx: &Transaction<'_>) -> Result<usize, StoreError> {
    let ledger = records::load_all(tx)?;
    let entries = aggregate_leaderboard(&ledger)?;

    let cleared = tx.execute(&format!("DELETE FROM {TABLE}"), [])?;
    debug!(cleared, "cleared leaderboard");

    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {TABLE} (contributor_name, current_bounty) VALUES (?1, ?2)"
    ))?;
    for entry in &entries {
        stmt.execute(rusqlite::params![entry.contributor_name, entry.current_bounty])?;
    }

    Ok(entries.len())
}

pub struct LeaderboardRepo {
    db: Database,
}

impl LeaderboardRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Read the leaderboard, ordered by contributor name.
    #[instrument(skip(self, mode), fields(mode = %mode))]
    pub fn fetch(&self, mode: LeaderboardMode) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let result = match mode {
            LeaderboardMode::Live => self.fetch_live(),
            LeaderboardMode::Materialized => self.fetch_materialized(),
        };
        if let Err(e) = &result {
            error!(error = %e, "could not fetch leaderboard");
        }
        result
    }

    /// Aggregate the committed ledger on demand.
    pub fn fetch_live(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let ledger = self.db.with_conn(records::load_all)?;
        let entries = aggregate_leaderboard(&ledger)?;
        info!(contributors = entries.len(), records = ledger.len(), "computed live leaderboard");
        Ok(entries)
    }

    /// Read the standing table. Cheap enough for polling.
    pub fn fetch_materialized(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT contributor_name, current_bounty FROM {TABLE} ORDER BY contributor_name ASC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(LeaderboardEntry {
                    contributor_name: row_helpers::get(row, 0, TABLE, "contributor_name")?,
                    current_bounty: row_helpers::get(row, 1, TABLE, "current_bounty")?,
                });
            }
            Ok(results)
        })
    }
}
