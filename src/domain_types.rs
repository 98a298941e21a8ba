pub mod cds_record;
pub mod query;
pub mod stats;

pub use cds_record::{merge_and_dedup, sort_by_date, CdsRecord, CANONICAL_COLUMNS};
pub use query::RangeQuery;
pub use stats::CdsStats;
