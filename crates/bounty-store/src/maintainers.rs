//! Maintainer allow-list.
//!
//! The ledger never consults this table; callers that want to restrict
//! who may assign bounties check [`MaintainerRepo::is_maintainer`] first.

use bounty_core::MaintainerIdentity;
use rusqlite::OptionalExtension;
use tracing::{error, info, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TABLE: &str = "maintainers";

pub struct MaintainerRepo {
    db: Database,
}

impl MaintainerRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whether `username` is on the allow-list (SQL `LIKE` match).
    /// A miss is `Ok(false)`; only storage failures are errors.
    #[instrument(skip(self))]
    pub fn is_maintainer(&self, username: &str) -> Result<bool, StoreError> {
        let found = self
            .db
            .with_conn(|conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT username FROM {TABLE} WHERE username LIKE ?1 LIMIT 1"),
                        [username],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?)
            })
            .map_err(|e| {
                error!(error = %e, "could not check maintainer");
                e
            })?;

        match found {
            Some(_) => info!("is a maintainer"),
            None => info!("is not a maintainer"),
        }
        Ok(found.is_some())
    }

    /// Add a maintainer. Returns `false` if the username was already present.
    #[instrument(skip(self))]
    pub fn add(&self, username: &str) -> Result<bool, StoreError> {
        let inserted = self.db.with_conn(|conn| {
            Ok(conn.execute(
                &format!("INSERT OR IGNORE INTO {TABLE} (username) VALUES (?1)"),
                [username],
            )?)
        })?;
        if inserted > 0 {
            info!("maintainer added");
        }
        Ok(inserted > 0)
    }

    /// Remove a maintainer. Returns `false` if no such username existed.
    #[instrument(skip(self))]
    pub fn remove(&self, username: &str) -> Result<bool, StoreError> {
        let removed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                &format!("DELETE FROM {TABLE} WHERE username = ?1"),
                [username],
            )?)
        })?;
        if removed > 0 {
            info!("maintainer removed");
        }
        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<MaintainerIdentity>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT username FROM {TABLE} ORDER BY username ASC"))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(MaintainerIdentity {
                    username: row_helpers::get(row, 0, TABLE, "username")?,
                });
            }
            Ok(results)
        })
    }
}
