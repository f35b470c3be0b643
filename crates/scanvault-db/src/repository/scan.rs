//! # Scan Repository
//!
//! Append-only storage of scan records, one row per save.
//!
//! ```text
//!   scan_records
//!   ┌──────────┬─────────────────────┬─────────────────────────────┬──────────┐
//!   │ id (v4)  │ payload             │ saved_at (RFC 3339, µs, Z)  │ owner_id │
//!   ├──────────┼─────────────────────┼─────────────────────────────┼──────────┤
//!   │ 7f3c…    │ https://example.com │ 2026-10-18T09:12:44.120301Z │ U1       │
//!   └──────────┴─────────────────────┴─────────────────────────────┴──────────┘
//!
//!   list_by_owner: WHERE owner_id = ? ORDER BY saved_at DESC, rowid DESC
//! ```
//!
//! Timestamps are written with a fixed precision so their text order is their
//! chronological order. Equal timestamps fall back to insertion order, newest
//! first.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use scanvault_core::ScanRecord;

/// Repository for scan records.
#[derive(Debug, Clone)]
pub struct ScanRepository {
    pool: SqlitePool,
}

impl ScanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ScanRepository { pool }
    }

    /// Inserts a record with an explicit timestamp.
    ///
    /// No deduplication: the same payload saved twice yields two rows.
    pub async fn insert(
        &self,
        owner_id: &str,
        payload: &str,
        saved_at: DateTime<Utc>,
    ) -> DbResult<ScanRecord> {
        let record = ScanRecord {
            id: Uuid::new_v4().to_string(),
            payload: payload.to_string(),
            saved_at,
            owner_id: owner_id.to_string(),
        };

        debug!(id = %record.id, owner_id = %owner_id, "Inserting scan record");

        sqlx::query(
            r#"
            INSERT INTO scan_records (id, payload, saved_at, owner_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&record.id)
        .bind(&record.payload)
        .bind(format_timestamp(&record.saved_at))
        .bind(&record.owner_id)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Inserts a record stamped with the current time.
    pub async fn insert_now(&self, owner_id: &str, payload: &str) -> DbResult<ScanRecord> {
        self.insert(owner_id, payload, Utc::now()).await
    }

    /// All records owned by `owner_id`, newest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<ScanRecord>> {
        let records = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT id, payload, saved_at, owner_id
            FROM scan_records
            WHERE owner_id = ?1
            ORDER BY saved_at DESC, rowid DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(owner_id = %owner_id, count = records.len(), "Listed scan records");
        Ok(records)
    }

    pub async fn count_by_owner(&self, owner_id: &str) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM scan_records WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use proptest::prelude::*;

    async fn repo() -> ScanRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().scans()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let repo = repo().await;
        let saved = repo.insert("U1", "https://example.com", at(100)).await.unwrap();

        let records = repo.list_by_owner("U1").await.unwrap();
        assert_eq!(records, vec![saved]);
    }

    #[tokio::test]
    async fn test_same_payload_twice_creates_two_records() {
        let repo = repo().await;
        let a = repo.insert_now("U1", "dup").await.unwrap();
        let b = repo.insert_now("U1", "dup").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(repo.count_by_owner("U1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let repo = repo().await;
        repo.insert_now("U1", "mine").await.unwrap();
        repo.insert_now("U2", "theirs").await.unwrap();

        let records = repo.list_by_owner("U1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, "mine");
        assert!(repo.list_by_owner("U3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newest_first_with_ties_by_insertion() {
        let repo = repo().await;
        repo.insert("U1", "old", at(10)).await.unwrap();
        repo.insert("U1", "tie-first", at(20)).await.unwrap();
        repo.insert("U1", "tie-second", at(20)).await.unwrap();
        repo.insert("U1", "middle", at(15)).await.unwrap();

        let payloads: Vec<_> = repo
            .list_by_owner("U1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.payload)
            .collect();
        assert_eq!(payloads, ["tie-second", "tie-first", "middle", "old"]);
    }

    #[tokio::test]
    async fn test_subsecond_precision_orders_correctly() {
        let repo = repo().await;
        let base = at(1_000);
        repo.insert("U1", "a", base + chrono::Duration::microseconds(900_000))
            .await
            .unwrap();
        repo.insert("U1", "b", base + chrono::Duration::microseconds(1_000_100))
            .await
            .unwrap();

        let records = repo.list_by_owner("U1").await.unwrap();
        assert_eq!(records[0].payload, "b");
        assert_eq!(
            records[0].saved_at,
            base + chrono::Duration::microseconds(1_000_100)
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_list_is_owned_and_sorted(
            rows in proptest::collection::vec((0u8..3, 0i64..50), 0..20)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let listed = runtime.block_on(async {
                let repo = repo().await;
                for (i, (owner, secs)) in rows.iter().enumerate() {
                    repo.insert(&format!("U{owner}"), &format!("p{i}"), at(*secs))
                        .await
                        .unwrap();
                }
                repo.list_by_owner("U0").await.unwrap()
            });

            let expected = rows.iter().filter(|(owner, _)| *owner == 0).count();
            prop_assert_eq!(listed.len(), expected);
            prop_assert!(listed.iter().all(|r| r.owner_id == "U0"));
            prop_assert!(listed.windows(2).all(|w| w[0].saved_at >= w[1].saved_at));
        }
    }
}
