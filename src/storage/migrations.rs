use chrono::{DateTime, Utc};
use sqlx::{migrate::Migrator, PgPool};
use tracing::info;

use super::error::StorageResult;

// 靜態嵌入遷移目錄（此目錄應放在專案根目錄）
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// 已套用的遷移紀錄
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
    pub installed_on: DateTime<Utc>,
    pub success: bool,
}

/// 執行數據庫遷移
pub async fn run_migrations(pool: &PgPool) -> StorageResult<()> {
    info!("開始執行數據庫遷移...");
    MIGRATOR.run(pool).await?;
    info!("SQLx 遷移完成");
    Ok(())
}

/// 內嵌的遷移版本與描述
pub fn known_migrations() -> Vec<(i64, String)> {
    MIGRATOR
        .iter()
        .map(|m| (m.version, m.description.to_string()))
        .collect()
}

/// 查詢已套用的遷移；尚未建立遷移表時回傳空集合
pub async fn applied_migrations(pool: &PgPool) -> StorageResult<Vec<AppliedMigration>> {
    let exists: bool = sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await?;
    if !exists {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, AppliedMigration>(
        "SELECT version, description, installed_on, success
         FROM _sqlx_migrations
         ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations() {
        let known = known_migrations();
        assert!(!known.is_empty());
        assert!(known.iter().any(|(_, d)| d.contains("cds data")));
        assert!(known.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
