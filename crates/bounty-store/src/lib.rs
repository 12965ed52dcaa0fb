pub mod database;
pub mod error;
pub mod leaderboard;
pub mod ledger;
pub mod maintainers;
pub mod records;
pub mod row_helpers;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
pub use leaderboard::{LeaderboardMode, LeaderboardRepo};
pub use ledger::LedgerRepo;
pub use maintainers::MaintainerRepo;
pub use records::RecordRepo;
