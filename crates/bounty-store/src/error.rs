use bounty_core::AggregateError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rusqlite_error_maps_to_database() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn corrupt_row_display_names_column() {
        let err = StoreError::CorruptRow {
            table: "assignment_records",
            column: "created_at",
            detail: "bad timestamp".into(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt row in assignment_records.created_at: bad timestamp"
        );
    }

    #[test]
    fn aggregate_error_converts() {
        let err: StoreError = AggregateError::Overflow {
            contributor: "bob".into(),
        }
        .into();
        assert!(err.to_string().contains("bob"));
    }
}
