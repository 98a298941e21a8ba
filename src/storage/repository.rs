use sqlx::PgPool;

pub mod cds_data;

pub use cds_data::{PgCdsRepository, UPSERT_CHUNK_SIZE};

/// 通用的數據庫操作特性
pub trait DbExecutor {
    fn get_pool(&self) -> &PgPool;
}
