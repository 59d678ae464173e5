use sea_query::{Iden, Order, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::debug;

use super::{Result, SqliteStore};
use crate::core::Transaction;

#[derive(Iden)]
enum Transactions {
    Table,
    TransactionId,
    Date,
    Name,
    Amount,
    AccountId,
    Category,
    InstitutionId,
}

pub struct Store<'a>(&'a SqliteStore);

impl<'a> Store<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self(store)
    }

    /// Inserts every transaction in a single database transaction, leaving
    /// rows with an already stored `transaction_id` untouched.
    pub async fn insert_ignore(&mut self, txns: &[Transaction]) -> Result<u64> {
        let mut conn = self.0.conn.begin().await?;

        let mut inserted = 0;
        for tx in txns {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO transactions (
                    transaction_id,
                    date,
                    name,
                    amount,
                    account_id,
                    category,
                    institution_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&tx.transaction_id)
            .bind(tx.date)
            .bind(&tx.name)
            .bind(tx.amount)
            .bind(&tx.account_id)
            .bind(tx.flat_category())
            .bind(&tx.institution_id)
            .execute(&mut conn)
            .await?;

            if result.rows_affected() == 0 {
                debug!("transaction {} already stored, skipping", tx.transaction_id);
            }
            inserted += result.rows_affected();
        }

        conn.commit().await?;

        Ok(inserted)
    }

    /// Stored transactions, newest first.
    pub async fn list(&mut self) -> Result<Vec<Transaction>> {
        let (query, values) = Query::select()
            .columns([
                Transactions::TransactionId,
                Transactions::Date,
                Transactions::Name,
                Transactions::Amount,
                Transactions::AccountId,
                Transactions::Category,
                Transactions::InstitutionId,
            ])
            .from(Transactions::Table)
            .order_by(Transactions::Date, Order::Desc)
            .order_by(Transactions::TransactionId, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&query, values)
            .fetch_all(&mut self.0.conn.acquire().await?)
            .await?;

        let mut txns = Vec::with_capacity(rows.len());
        for row in rows {
            txns.push(Transaction::from_row(&row)?);
        }

        Ok(txns)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Transaction {
    fn from_row(row: &'r SqliteRow) -> ::std::result::Result<Self, sqlx::Error> {
        let category: Option<String> = row.try_get("category")?;

        Ok(Transaction {
            transaction_id: row.try_get("transaction_id")?,
            date: row.try_get("date")?,
            name: row.try_get("name")?,
            amount: row.try_get("amount")?,
            account_id: row.try_get("account_id")?,
            category: Transaction::split_category(category.as_deref()),
            institution_id: row.try_get("institution_id")?,
        })
    }
}
