use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use quarry_core::error::AppError;
use quarry_core::query::CacheKey;
use quarry_core::traits::ResultCache;
use sqlx::PgPool;

/// PostgreSQL-backed [`ResultCache`].
///
/// Payloads live in `search_cache_entries`, ordered by their serial id.
/// A key's TTL lives in `search_cache_expiry` and is written only by
/// `expire`, so a key whose live scrape never finished has no expiry row.
#[derive(Clone)]
pub struct PgResultCache {
    pool: PgPool,
}

impl PgResultCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete every expired key. Reads already ignore them; this only
    /// reclaims space.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let now = Utc::now();

        let purged = sqlx::query(
            r#"
            DELETE FROM search_cache_entries e
            USING search_cache_expiry x
            WHERE e.cache_key = x.cache_key AND x.expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected();

        sqlx::query("DELETE FROM search_cache_expiry WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(purged)
    }
}

impl ResultCache for PgResultCache {
    async fn get(&self, key: &CacheKey) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT e.payload
            FROM search_cache_entries e
            WHERE e.cache_key = $1
              AND NOT EXISTS (
                  SELECT 1 FROM search_cache_expiry x
                  WHERE x.cache_key = $1 AND x.expires_at <= $2
              )
            ORDER BY e.id
            "#,
        )
        .bind(key.as_str())
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(|(payload,)| payload).collect())
    }

    async fn append(&self, key: &CacheKey, payload: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Only the transaction that removes the stale expiry row purges the
        // old list; concurrent appenders block on that row and then see it gone.
        let stale: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM search_cache_expiry
            WHERE cache_key = $1 AND expires_at <= $2
            RETURNING cache_key
            "#,
        )
        .bind(key.as_str())
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        if stale.is_some() {
            sqlx::query("DELETE FROM search_cache_entries WHERE cache_key = $1")
                .bind(key.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        sqlx::query("INSERT INTO search_cache_entries (cache_key, payload) VALUES ($1, $2)")
            .bind(key.as_str())
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn expire(&self, key: &CacheKey, ttl: Duration) -> Result<(), AppError> {
        let expires_at = expiry_time(Utc::now(), ttl)?;

        sqlx::query(
            r#"
            INSERT INTO search_cache_expiry (cache_key, expires_at)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM search_cache_entries WHERE cache_key = $1)
            ON CONFLICT (cache_key) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

fn expiry_time(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AppError> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AppError::CacheError(format!("TTL out of range: {ttl:?}")))
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::CacheError(e.to_string())
}
