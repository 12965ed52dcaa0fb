pub mod aggregate;
pub mod records;

pub use aggregate::{aggregate_leaderboard, latest_per_pull_request, AggregateError};
pub use records::{AssignmentRecord, LeaderboardEntry, MaintainerIdentity, NewAssignment, RecordId};
