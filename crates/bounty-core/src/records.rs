use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a ledger row. Monotonic within one database.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable ledger entry: `maintainer_name` credited `points_allotted`
/// to `contributor_name` for the pull request at `pull_request_url`.
///
/// Records are never edited. A later record for the same URL supersedes
/// this one for aggregation purposes while this one stays in the history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: RecordId,
    pub contributor_name: String,
    pub maintainer_name: String,
    pub pull_request_url: String,
    pub points_allotted: i64,
    pub created_at: DateTime<Utc>,
}

impl AssignmentRecord {
    /// Ordering key for latest-write-wins. The id breaks timestamp ties.
    pub fn recency(&self) -> (DateTime<Utc>, RecordId) {
        (self.created_at, self.id)
    }
}

/// Input of a ledger append. Points may be negative or zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub maintainer: String,
    pub contributor: String,
    pub pull_request_url: String,
    pub points: i64,
}

impl NewAssignment {
    pub fn new(
        maintainer: impl Into<String>,
        contributor: impl Into<String>,
        pull_request_url: impl Into<String>,
        points: i64,
    ) -> Self {
        Self {
            maintainer: maintainer.into(),
            contributor: contributor.into(),
            pull_request_url: pull_request_url.into(),
            points,
        }
    }
}

/// A contributor's current total, derived from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub contributor_name: String,
    pub current_bounty: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintainerIdentity {
    pub username: String,
}
