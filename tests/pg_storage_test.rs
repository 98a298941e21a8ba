//! 需要 PostgreSQL：`DATABASE_URL=... cargo test -- --ignored`

mod common;

use anyhow::Result;
use assert_matches::assert_matches;
use brazil_cds::domain_types::{CdsRecord, RangeQuery};
use brazil_cds::storage::{applied_migrations, CdsStorage, PgCdsRepository, StorageError};
use common::{day, series};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "需要 PostgreSQL"]
async fn test_upsert_is_idempotent(pool: PgPool) -> Result<()> {
    let repo = PgCdsRepository::from_pool(pool);
    let batch = series(10);

    assert_eq!(repo.upsert(&batch).await?, 10);
    let first = repo.load_existing().await?;

    assert_eq!(repo.upsert(&batch).await?, 10);
    let second = repo.load_existing().await?;

    assert_eq!(repo.count().await?, 10);
    assert_eq!(first, second);
    assert_eq!(second, batch);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "需要 PostgreSQL"]
async fn test_upsert_overwrites_and_dedups(pool: PgPool) -> Result<()> {
    let repo = PgCdsRepository::from_pool(pool);
    repo.upsert(&[CdsRecord::new(day(2025, 1, 1), 1.0).with_ohlc(Some(0.9), Some(1.1), Some(0.8))])
        .await?;

    // 同一批次內重複的日期以最後一筆為準
    let stored = repo
        .upsert(&[
            CdsRecord::new(day(2025, 1, 1), 5.0),
            CdsRecord::new(day(2025, 1, 2), 3.0),
            CdsRecord::new(day(2025, 1, 1), 2.0),
        ])
        .await?;
    assert_eq!(stored, 2);

    let records = repo.load_existing().await?;
    assert_eq!(
        records,
        vec![
            CdsRecord::new(day(2025, 1, 1), 2.0),
            CdsRecord::new(day(2025, 1, 2), 3.0),
        ]
    );
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "需要 PostgreSQL"]
async fn test_values_are_rounded_to_four_places(pool: PgPool) -> Result<()> {
    let repo = PgCdsRepository::from_pool(pool);
    repo.upsert(&[CdsRecord::new(day(2025, 1, 1), 0.014567891).with_change_pct(Some(-0.68))])
        .await?;

    let records = repo.load_existing().await?;
    assert_eq!(records[0].close, 0.0146);
    assert_eq!(records[0].change_pct, Some(-0.68));

    assert_matches!(
        repo.upsert(&[CdsRecord::new(day(2025, 1, 2), 2_000_000.0)]).await,
        Err(StorageError::InvalidData(_))
    );
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "需要 PostgreSQL"]
async fn test_queries_and_stats(pool: PgPool) -> Result<()> {
    let repo = PgCdsRepository::from_pool(pool);

    let stats = repo.get_stats().await?;
    assert_eq!(stats.total_records, 0);
    assert!(stats.latest_close.is_none());
    assert_eq!(repo.date_range().await?, None);

    repo.upsert(&series(10)).await?;

    let latest: Vec<f64> = repo.get_latest(5).await?.iter().map(|r| r.close).collect();
    assert_eq!(latest, vec![6.0, 7.0, 8.0, 9.0, 10.0]);

    let ranged = repo
        .get(RangeQuery::new(Some(day(2025, 3, 2)), Some(day(2025, 3, 6)), Some(2)))
        .await?;
    assert_eq!(ranged.iter().map(|r| r.close).collect::<Vec<_>>(), vec![5.0, 6.0]);

    let stats = repo.get_stats().await?;
    assert_eq!(stats.total_records, 10);
    assert_eq!(stats.oldest_date, Some(day(2025, 3, 1)));
    assert_eq!(stats.latest_date, Some(day(2025, 3, 10)));
    assert_eq!(stats.latest_close, Some(10.0));

    assert_eq!(repo.delete(Some(day(2025, 3, 9)), None).await?, 2);
    assert_eq!(repo.date_range().await?, Some((day(2025, 3, 1), day(2025, 3, 8))));
    assert!(repo.health_check().await);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "需要 PostgreSQL"]
async fn test_migrations_are_recorded(pool: PgPool) -> Result<()> {
    let applied = applied_migrations(&pool).await?;
    assert!(!applied.is_empty());
    assert!(applied.iter().all(|m| m.success));
    Ok(())
}
