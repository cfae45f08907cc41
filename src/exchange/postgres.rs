//! PostgreSQL-backed rate store.
//!
//! Maps to the `exchange_rates` table created by `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::rate::{Rate, RateSet};
use super::store::RateStore;
use crate::clock::date_to_midnight;
use crate::error::{SubtrackError, SubtrackResult};
use crate::macros::debug_with_pgpool;
use crate::money::CurrencyUnit;

#[derive(Debug, Clone, FromRow)]
struct RateRow {
    id: Uuid,
    from_currency: String,
    to_currency: String,
    rate_date: NaiveDate,
    exchange_rate: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RateRow> for Rate {
    type Error = SubtrackError;

    fn try_from(row: RateRow) -> Result<Self, Self::Error> {
        Ok(Rate {
            id: row.id,
            from: CurrencyUnit::parse(row.from_currency.trim())?,
            to: CurrencyUnit::parse(row.to_currency.trim())?,
            date: date_to_midnight(row.rate_date),
            exchange_rate: row.exchange_rate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Rate store over a Postgres connection pool
#[derive(Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

debug_with_pgpool!(PgRateStore { pool: PgPool });

impl PgRateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations
    pub async fn connect(database_url: &str) -> SubtrackResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> SubtrackResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Exchange rate migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn get_rate_at(
        &self,
        from: CurrencyUnit,
        to: CurrencyUnit,
        at: DateTime<Utc>,
    ) -> SubtrackResult<Option<Rate>> {
        let row = sqlx::query_as::<_, RateRow>(
            r#"
            SELECT id, from_currency, to_currency, rate_date, exchange_rate, created_at, updated_at
            FROM exchange_rates
            WHERE from_currency = $1 AND to_currency = $2 AND rate_date = $3
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at.date_naive())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Rate::try_from).transpose()
    }

    async fn get_rates_by_date(&self, at: DateTime<Utc>) -> SubtrackResult<RateSet> {
        let rows = sqlx::query_as::<_, RateRow>(
            r#"
            SELECT id, from_currency, to_currency, rate_date, exchange_rate, created_at, updated_at
            FROM exchange_rates
            WHERE rate_date = $1
            ORDER BY from_currency, to_currency
            "#,
        )
        .bind(at.date_naive())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Rate::try_from).collect()
    }

    async fn save(&self, rates: &[Rate]) -> SubtrackResult<()> {
        let mut tx = self.pool.begin().await?;

        for rate in rates {
            let result = sqlx::query(
                r#"
                INSERT INTO exchange_rates
                    (id, from_currency, to_currency, rate_date, exchange_rate, etag, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    from_currency = EXCLUDED.from_currency,
                    to_currency = EXCLUDED.to_currency,
                    rate_date = EXCLUDED.rate_date,
                    exchange_rate = EXCLUDED.exchange_rate,
                    etag = EXCLUDED.etag,
                    updated_at = EXCLUDED.updated_at
                WHERE exchange_rates.etag IS DISTINCT FROM EXCLUDED.etag
                "#,
            )
            .bind(rate.id)
            .bind(rate.from.as_str())
            .bind(rate.to.as_str())
            .bind(rate.day())
            .bind(rate.exchange_rate)
            .bind(rate.etag())
            .bind(rate.created_at)
            .bind(rate.updated_at)
            .execute(&mut *tx)
            .await?;

            debug!(
                rate_id = %rate.id,
                written = result.rows_affected() > 0,
                "Rate upsert"
            );
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_latest_update_date(&self) -> SubtrackResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(updated_at) FROM exchange_rates")
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }
}
