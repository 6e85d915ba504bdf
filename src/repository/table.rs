//! Database table operations and implementations.

use chrono::DateTime;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::entity::SubscriptionModel;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Trait for tables with CRUD operations.
#[async_trait::async_trait]
pub trait Table<T, ID>: TableBase {
    async fn select_all(&self) -> Result<Vec<T>, DatabaseError>;
    async fn insert(&self, model: &T) -> Result<ID, DatabaseError>;
    async fn select(&self, id: &ID) -> Result<Option<T>, DatabaseError>;
    async fn update(&self, model: &T) -> Result<(), DatabaseError>;
    async fn delete(&self, id: &ID) -> Result<(), DatabaseError>;
}

// ============================================================================
// SubscriptionTable
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionTable {
    base: BaseTable,
}

impl SubscriptionTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: BaseTable::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl TableBase for SubscriptionTable {
    async fn delete_all(&self) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM subscriptions")
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Table<SubscriptionModel, i32> for SubscriptionTable {
    async fn select_all(&self) -> Result<Vec<SubscriptionModel>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, SubscriptionModel>("SELECT * FROM subscriptions")
                .fetch_all(&self.base.pool)
                .await?,
        )
    }

    async fn insert(&self, model: &SubscriptionModel) -> Result<i32, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO subscriptions
                (query, destination, latest_id, latest_polled_at, flagged_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id"#,
        )
        .bind(&model.query)
        .bind(model.destination as i64)
        .bind(model.latest_id)
        .bind(model.latest_polled_at)
        .bind(model.flagged_at)
        .bind(model.created_at)
        .fetch_one(&self.base.pool)
        .await?;
        Ok(row.0 as i32)
    }

    async fn select(&self, id: &i32) -> Result<Option<SubscriptionModel>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, SubscriptionModel>("SELECT * FROM subscriptions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.base.pool)
                .await?,
        )
    }

    async fn update(&self, model: &SubscriptionModel) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"UPDATE subscriptions SET
                query = ?, destination = ?, latest_id = ?, latest_polled_at = ?,
                flagged_at = ?, created_at = ?
            WHERE id = ?"#,
        )
        .bind(&model.query)
        .bind(model.destination as i64)
        .bind(model.latest_id)
        .bind(model.latest_polled_at)
        .bind(model.flagged_at)
        .bind(model.created_at)
        .bind(model.id)
        .execute(&self.base.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &i32) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM subscriptions WHERE id = ?")
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }
}

impl SubscriptionTable {
    pub async fn select_by_key(
        &self,
        query: &str,
        destination: u64,
    ) -> Result<Option<SubscriptionModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            "SELECT * FROM subscriptions WHERE query = ? AND destination = ? LIMIT 1",
        )
        .bind(query)
        .bind(destination as i64)
        .fetch_optional(&self.base.pool)
        .await?)
    }

    /// Get all subscriptions of a destination, ordered by query
    pub async fn select_all_by_destination(
        &self,
        destination: u64,
    ) -> Result<Vec<SubscriptionModel>, DatabaseError> {
        Ok(sqlx::query_as::<_, SubscriptionModel>(
            "SELECT * FROM subscriptions WHERE destination = ? ORDER BY query",
        )
        .bind(destination as i64)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete_by_key(&self, query: &str, destination: u64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE query = ? AND destination = ?")
            .bind(query)
            .bind(destination as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_watermark(
        &self,
        query: &str,
        destination: u64,
        latest_id: Option<i64>,
        latest_polled_at: Option<DateTime<Utc>>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"UPDATE subscriptions SET latest_id = ?, latest_polled_at = ?
            WHERE query = ? AND destination = ?"#,
        )
        .bind(latest_id)
        .bind(latest_polled_at)
        .bind(query)
        .bind(destination as i64)
        .execute(&self.base.pool)
        .await?;
        Ok(())
    }

    pub async fn update_flagged_at(
        &self,
        query: &str,
        destination: u64,
        flagged_at: Option<DateTime<Utc>>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE subscriptions SET flagged_at = ? WHERE query = ? AND destination = ?")
            .bind(flagged_at)
            .bind(query)
            .bind(destination as i64)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u32, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.base.pool)
            .await?;
        Ok(row.0 as u32)
    }
}
