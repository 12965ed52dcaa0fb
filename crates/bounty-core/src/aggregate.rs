//! Latest-write-wins aggregation over the assignment ledger.
//!
//! For every pull request URL only the most recent record counts. The
//! surviving records are then summed per contributor. Both the materialized
//! leaderboard and live reads go through [`aggregate_leaderboard`], so the
//! two read modes cannot disagree about the rule.

use std::collections::{BTreeMap, HashMap};

use crate::records::{AssignmentRecord, LeaderboardEntry};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("bounty total overflowed for contributor {contributor}")]
    Overflow { contributor: String },
}

/// Select the authoritative record for each distinct pull request URL.
///
/// The winner is the record with the greatest `(created_at, id)`. Output
/// order follows the winners' position in `records`.
pub fn latest_per_pull_request(records: &[AssignmentRecord]) -> Vec<&AssignmentRecord> {
    let mut latest: HashMap<&str, usize> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        latest
            .entry(record.pull_request_url.as_str())
            .and_modify(|current| {
                if record.recency() > records[*current].recency() {
                    *current = idx;
                }
            })
            .or_insert(idx);
    }

    let mut winners: Vec<usize> = latest.into_values().collect();
    winners.sort_unstable();
    winners.into_iter().map(|idx| &records[idx]).collect()
}

/// Compute every contributor's total from the full ledger.
///
/// Contributors with no winning record are absent. Entries are sorted by
/// contributor name.
pub fn aggregate_leaderboard(
    records: &[AssignmentRecord],
) -> Result<Vec<LeaderboardEntry>, AggregateError> {
    // Wide accumulator: the result must not depend on summation order.
    let mut totals: BTreeMap<&str, i128> = BTreeMap::new();
    for record in latest_per_pull_request(records) {
        *totals.entry(record.contributor_name.as_str()).or_insert(0) +=
            i128::from(record.points_allotted);
    }

    totals
        .into_iter()
        .map(|(name, total)| {
            let current_bounty = i64::try_from(total).map_err(|_| AggregateError::Overflow {
                contributor: name.to_string(),
            })?;
            Ok(LeaderboardEntry {
                contributor_name: name.to_string(),
                current_bounty,
            })
        })
        .collect()
}
