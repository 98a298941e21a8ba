use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::domain_types::{merge_and_dedup, CdsRecord, CdsStats, RangeQuery};
use crate::storage::database::CdsDatabase;
use crate::storage::error::StorageResult;
use crate::storage::models::{CdsDataInsert, CdsDataRow};
use crate::storage::repository::DbExecutor;
use crate::storage::traits::{CdsStorage, StorageBackend};

/// 每個 INSERT 語句的最大列數
pub const UPSERT_CHUNK_SIZE: usize = 1000;

const SELECT_COLUMNS: &str = "date, open, high, low, close, change_pct, created_at, updated_at";

/// PostgreSQL 上的 CDS 資料倉儲
#[derive(Debug, Clone)]
pub struct PgCdsRepository {
    db: CdsDatabase,
}

impl PgCdsRepository {
    pub fn new(db: CdsDatabase) -> Self {
        Self { db }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(CdsDatabase::from_pool(pool))
    }

    pub fn database(&self) -> &CdsDatabase {
        &self.db
    }

    /// 以日期為鍵寫入；已存在的日期整列覆蓋並更新 `updated_at`
    ///
    /// 批次內重複日期以最後一筆為準。所有分段在同一個交易中提交。
    pub async fn upsert(&self, records: &[CdsRecord]) -> StorageResult<usize> {
        let unique = merge_and_dedup(Vec::new(), records.iter().cloned());
        if unique.is_empty() {
            return Ok(0);
        }

        let rows = unique
            .iter()
            .map(CdsDataInsert::from_record)
            .collect::<StorageResult<Vec<_>>>()?;

        let mut tx = self.get_pool().begin().await?;

        for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO cds_data (date, open, high, low, close, change_pct) ");
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.date)
                    .push_bind(row.open)
                    .push_bind(row.high)
                    .push_bind(row.low)
                    .push_bind(row.close)
                    .push_bind(row.change_pct);
            });
            builder.push(
                " ON CONFLICT (date) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    change_pct = EXCLUDED.change_pct,
                    updated_at = NOW()",
            );

            builder.build().execute(&mut *tx).await?;
            debug!("已寫入 {} 筆 cds_data", chunk.len());
        }

        tx.commit().await?;
        info!("upsert 完成: {} 筆", rows.len());
        Ok(rows.len())
    }

    /// 刪除日期區間內的資料，未指定的端點不設限；回傳刪除筆數
    pub async fn delete(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> StorageResult<u64> {
        let result = sqlx::query(
            "DELETE FROM cds_data
             WHERE ($1::date IS NULL OR date >= $1)
               AND ($2::date IS NULL OR date <= $2)",
        )
        .bind(start)
        .bind(end)
        .execute(self.get_pool())
        .await?;

        info!("已刪除 {} 筆 cds_data", result.rows_affected());
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cds_data")
            .fetch_one(self.get_pool())
            .await?;
        Ok(count)
    }

    /// 最早與最新日期
    pub async fn date_range(&self) -> StorageResult<Option<(NaiveDate, NaiveDate)>> {
        let (min, max): (Option<NaiveDate>, Option<NaiveDate>) =
            sqlx::query_as("SELECT MIN(date), MAX(date) FROM cds_data")
                .fetch_one(self.get_pool())
                .await?;
        Ok(min.zip(max))
    }
}

impl DbExecutor for PgCdsRepository {
    fn get_pool(&self) -> &PgPool {
        self.db.pool()
    }
}

#[async_trait]
impl CdsStorage for PgCdsRepository {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Postgres
    }

    async fn load_existing(&self) -> StorageResult<Vec<CdsRecord>> {
        self.get(RangeQuery::all()).await
    }

    async fn store_batch(&self, batch: &[CdsRecord]) -> StorageResult<usize> {
        self.upsert(batch).await
    }

    async fn get(&self, query: RangeQuery) -> StorageResult<Vec<CdsRecord>> {
        // LIMIT NULL 等同不限制；內層取區間內最新的幾筆，外層轉回升冪
        let rows = sqlx::query_as::<_, CdsDataRow>(&format!(
            "SELECT * FROM (
                SELECT {SELECT_COLUMNS}
                FROM cds_data
                WHERE ($1::date IS NULL OR date >= $1)
                  AND ($2::date IS NULL OR date <= $2)
                ORDER BY date DESC
                LIMIT $3
             ) AS recent
             ORDER BY date ASC"
        ))
        .bind(query.start)
        .bind(query.end)
        .bind(query.limit.map(|n| n as i64))
        .fetch_all(self.get_pool())
        .await?;

        Ok(rows.into_iter().map(CdsRecord::from).collect())
    }

    async fn get_stats(&self) -> StorageResult<CdsStats> {
        let (total, oldest, latest, latest_close): (
            i64,
            Option<NaiveDate>,
            Option<NaiveDate>,
            Option<sqlx::types::Decimal>,
        ) = sqlx::query_as(
            "SELECT
                COUNT(*),
                MIN(date),
                MAX(date),
                (SELECT close FROM cds_data ORDER BY date DESC LIMIT 1)
             FROM cds_data",
        )
        .fetch_one(self.get_pool())
        .await?;

        Ok(CdsStats {
            total_records: total.max(0) as u64,
            oldest_date: oldest,
            latest_date: latest,
            latest_close: latest_close.and_then(|c| c.to_f64()),
        })
    }

    async fn health_check(&self) -> bool {
        self.db.health_check().await
    }

    async fn close(&self) {
        self.db.close().await
    }
}
