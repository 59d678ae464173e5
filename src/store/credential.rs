use sea_query::{Iden, OnConflict, Order, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::{Result, SqliteStore};
use crate::core::Credential;

#[derive(Iden)]
enum AccessTokens {
    Table,
    InstitutionId,
    AccessToken,
}

pub struct Store<'a>(&'a SqliteStore);

impl<'a> Store<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self(store)
    }

    pub async fn upsert(&mut self, credential: &Credential) -> Result<()> {
        let (query, values) = Query::insert()
            .into_table(AccessTokens::Table)
            .columns([AccessTokens::InstitutionId, AccessTokens::AccessToken])
            .values_panic(vec![
                credential.institution_id.as_str().into(),
                credential.access_token.as_str().into(),
            ])
            .on_conflict(
                OnConflict::column(AccessTokens::InstitutionId)
                    .update_column(AccessTokens::AccessToken)
                    .to_owned(),
            )
            .build_sqlx(SqliteQueryBuilder);

        sqlx::query_with(&query, values)
            .execute(&mut self.0.conn.acquire().await?)
            .await?;

        Ok(())
    }

    pub async fn list(&mut self) -> Result<Vec<Credential>> {
        let (query, values) = Query::select()
            .columns([AccessTokens::InstitutionId, AccessTokens::AccessToken])
            .from(AccessTokens::Table)
            .order_by(AccessTokens::InstitutionId, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&query, values)
            .fetch_all(&mut self.0.conn.acquire().await?)
            .await?;

        let mut credentials = Vec::with_capacity(rows.len());
        for row in rows {
            credentials.push(Credential::from_row(&row)?);
        }

        Ok(credentials)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Credential {
    fn from_row(row: &'r SqliteRow) -> ::std::result::Result<Self, sqlx::Error> {
        Ok(Credential {
            institution_id: row.try_get("institution_id")?,
            access_token: row.try_get("access_token")?,
        })
    }
}
