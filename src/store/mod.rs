mod credential;
mod txn;

use std::sync::Arc;

use axum::async_trait;
use sqlx::Error as SqlxError;
use thiserror::Error;

use crate::core::{Credential, Transaction};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Database(#[from] SqlxError),
}

pub type Result<T> = ::std::result::Result<T, Error>;

/// Persistence used by the link and sync services.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stores the access token for an institution, replacing any token the
    /// institution already has.
    async fn upsert_credential(&self, credential: &Credential) -> Result<()>;

    async fn credentials(&self) -> Result<Vec<Credential>>;

    /// Inserts transactions not already stored, returning how many rows were
    /// added. Transactions with a known `transaction_id` are skipped.
    async fn insert_transactions(&self, txns: &[Transaction]) -> Result<u64>;
}

pub struct SqliteStore {
    conn: Arc<sqlx::pool::Pool<sqlx::sqlite::Sqlite>>,
}

impl SqliteStore {
    pub async fn new(uri: &str) -> Result<Self> {
        // A single connection keeps `sqlite::memory:` databases alive and
        // shared between calls.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(uri)
            .await?;

        let mut conn = pool.acquire().await?;
        sqlx::migrate!("./migrations").run(&mut conn).await?;

        Ok(Self {
            conn: Arc::new(pool),
        })
    }

    pub fn access_tokens(&self) -> credential::Store {
        credential::Store::new(self)
    }

    pub fn txns(&self) -> txn::Store {
        txn::Store::new(self)
    }
}

#[async_trait]
impl Repository for SqliteStore {
    async fn upsert_credential(&self, credential: &Credential) -> Result<()> {
        self.access_tokens().upsert(credential).await
    }

    async fn credentials(&self) -> Result<Vec<Credential>> {
        self.access_tokens().list().await
    }

    async fn insert_transactions(&self, txns: &[Transaction]) -> Result<u64> {
        self.txns().insert_ignore(txns).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;

    pub(crate) async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    pub(crate) fn transaction(id: &str, date: &str, institution_id: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            name: format!("Transaction {}", id),
            amount: 10.0,
            account_id: "test-account-id".to_string(),
            category: vec!["Shops".to_string()],
            institution_id: institution_id.to_string(),
        }
    }

    pub(crate) async fn count_by_institution(store: &SqliteStore, institution_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE institution_id = ?")
            .bind(institution_id)
            .fetch_one(&mut store.conn.acquire().await.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn repository_round_trip() {
        let store = test_store().await;
        let repo: &dyn Repository = &store;

        repo.upsert_credential(&Credential::new("ins_1", "access-1"))
            .await
            .unwrap();
        let inserted = repo
            .insert_transactions(&[transaction("1", "2024-01-01", "ins_1")])
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(
            repo.credentials().await.unwrap(),
            vec![Credential::new("ins_1", "access-1")]
        );
    }
}
