//! # Document Sequence Generator
//!
//! Issues the human-readable document numbers: sale numbers
//! (`S20260823001`), payment numbers (`P20260823001`), product codes
//! (`P001`) and customer codes (`C001`).
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Two cashiers post at the same instant                              │
//! │                                                                     │
//! │  ❌ WRONG: SELECT MAX(code) ... then INSERT                         │
//! │     Both read 042, both write 043 → duplicate sale number           │
//! │                                                                     │
//! │  ✅ THIS MODULE: one atomic UPSERT per counter row                  │
//! │     INSERT .. ON CONFLICT DO UPDATE SET last_value = last_value + 1 │
//! │     RETURNING last_value                                            │
//! │                                                                     │
//! │  The increment and the read are a single statement, so concurrent   │
//! │  callers can never observe the same value.                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers pass the connection of their open transaction, so a rolled-back
//! posting may leave a gap in the counter but never a duplicate.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbError;
use crest_core::{CoreError, CoreResult, DocumentKind};

/// Highest counter value a 3-digit document number can carry.
pub const MAX_COUNTER: i64 = 999;

/// Issues the next document number of `kind`.
///
/// Daily kinds (sale/payment numbers) scope their counter to `date` and
/// restart at 001 each calendar day; global kinds (product/customer codes)
/// share one counter for the lifetime of the store.
///
/// ## Errors
/// - `SequenceExhausted` when the counter would pass 999. The failed
///   increment stays inside the caller's transaction and rolls back with it.
pub async fn next_code(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    date: NaiveDate,
) -> CoreResult<String> {
    let scope = if kind.is_daily() {
        date.format("%Y%m%d").to_string()
    } else {
        String::new()
    };

    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO document_sequences (kind, scope, last_value)
        VALUES (?1, ?2, 1)
        ON CONFLICT (kind, scope) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(kind.as_str())
    .bind(&scope)
    .fetch_one(conn)
    .await
    .map_err(DbError::from)?;

    if value > MAX_COUNTER {
        return Err(CoreError::SequenceExhausted {
            kind: kind.as_str().to_string(),
            scope,
        });
    }

    let code = if kind.is_daily() {
        format!("{}{}{:03}", kind.prefix(), scope, value)
    } else {
        format!("{}{:03}", kind.prefix(), value)
    };

    debug!(kind = kind.as_str(), %code, "Issued document number");
    Ok(code)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_first_code_starts_at_001() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let code = next_code(&mut conn, DocumentKind::SaleNumber, day(2026, 8, 23))
            .await
            .unwrap();
        assert_eq!(code, "S20260823001");

        let code = next_code(&mut conn, DocumentKind::ProductCode, day(2026, 8, 23))
            .await
            .unwrap();
        assert_eq!(code, "P001");
    }

    #[tokio::test]
    async fn test_daily_counter_resets_per_day() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let a = next_code(&mut conn, DocumentKind::SaleNumber, day(2026, 8, 23))
            .await
            .unwrap();
        let b = next_code(&mut conn, DocumentKind::SaleNumber, day(2026, 8, 23))
            .await
            .unwrap();
        let c = next_code(&mut conn, DocumentKind::SaleNumber, day(2026, 8, 24))
            .await
            .unwrap();

        assert_eq!(a, "S20260823001");
        assert_eq!(b, "S20260823002");
        assert_eq!(c, "S20260824001");
    }

    #[tokio::test]
    async fn test_global_counter_ignores_date() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let a = next_code(&mut conn, DocumentKind::CustomerCode, day(2026, 8, 23))
            .await
            .unwrap();
        let b = next_code(&mut conn, DocumentKind::CustomerCode, day(2026, 8, 24))
            .await
            .unwrap();

        assert_eq!(a, "C001");
        assert_eq!(b, "C002");
    }

    #[tokio::test]
    async fn test_payment_and_product_prefixes_do_not_collide() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        // Same prefix letter, separate counters.
        let payment = next_code(&mut conn, DocumentKind::PaymentNumber, day(2026, 8, 23))
            .await
            .unwrap();
        let product = next_code(&mut conn, DocumentKind::ProductCode, day(2026, 8, 23))
            .await
            .unwrap();

        assert_eq!(payment, "P20260823001");
        assert_eq!(product, "P001");
    }

    #[tokio::test]
    async fn test_counter_past_999_is_exhausted() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        sqlx::query(
            "INSERT INTO document_sequences (kind, scope, last_value) VALUES ('sale_number', '20260823', 999)",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let err = next_code(&mut conn, DocumentKind::SaleNumber, day(2026, 8, 23))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SequenceExhausted { .. }));
    }

    /// 100 tasks requesting numbers for the same scope must receive 100
    /// distinct, contiguous values.
    ///
    /// Runs against a file-backed database with a multi-connection pool:
    /// the in-memory config pins the pool to one connection, which would
    /// serialize the tasks instead of racing them.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_requests_never_collide() {
        let path = std::env::temp_dir().join(format!(
            "crest-seq-test-{}-{}.db",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        let date = day(2026, 8, 23);

        let mut handles = Vec::new();
        for _ in 0..100 {
            let pool = db.pool().clone();
            handles.push(tokio::spawn(async move {
                let mut tx = pool.begin().await.unwrap();
                let code = next_code(&mut tx, DocumentKind::SaleNumber, date)
                    .await
                    .unwrap();
                tx.commit().await.unwrap();
                code
            }));
        }

        let mut codes = Vec::new();
        for handle in handles {
            codes.push(handle.await.unwrap());
        }

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }

        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 100);
        assert_eq!(codes.first().unwrap(), "S20260823001");
        assert_eq!(codes.last().unwrap(), "S20260823100");
    }
}
