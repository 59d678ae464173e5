//! Plaid access for the bank linking flow.
//!
//! Everything that talks to the aggregator goes through the [`Aggregator`]
//! trait so callers can be handed a real Plaid client or an in-process fake.
use async_trait::async_trait;
use chrono::NaiveDate;
use rplaid::client::{ClientError, Plaid};
use rplaid::model::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use rplaid::client::{Builder, Credentials, Environment};

static PRODUCTS: [&str; 1] = ["transactions"];
static COUNTRY_CODES: [&str; 1] = ["US"];
static LANGUAGE: &str = "en";

/// Plaid error code returned while an item is still preparing its initial
/// transaction pull.
pub const PRODUCT_NOT_READY: &str = "PRODUCT_NOT_READY";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The linked item exists but its transactions are not available yet.
    #[error("{0}")]
    ProductNotReady(String),
    #[error("{0}")]
    Api(String),
    #[error("upstream transaction {id} has invalid date {date}")]
    InvalidDate { id: String, date: String },
}

impl From<ClientError> for UpstreamError {
    fn from(err: ClientError) -> Self {
        match &err {
            ClientError::App(res) if res.error_code.as_deref() == Some(PRODUCT_NOT_READY) => {
                UpstreamError::ProductNotReady(err.to_string())
            }
            _ => UpstreamError::Api(err.to_string()),
        }
    }
}

/// A transaction as reported by the aggregator for a single access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub amount: f64,
    pub account_id: String,
    pub category: Vec<String>,
}

impl TryFrom<rplaid::model::Transaction> for Transaction {
    type Error = UpstreamError;

    fn try_from(tx: rplaid::model::Transaction) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&tx.date, "%Y-%m-%d").map_err(|_| {
            UpstreamError::InvalidDate {
                id: tx.transaction_id.clone(),
                date: tx.date.clone(),
            }
        })?;

        Ok(Transaction {
            transaction_id: tx.transaction_id,
            date,
            name: tx.name,
            amount: tx.amount,
            account_id: tx.account_id,
            category: tx.category.unwrap_or_default(),
        })
    }
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Mints a link token for a hosted Link session.
    async fn create_link_token(&self) -> Result<String, UpstreamError>;

    /// Exchanges a public token from a completed Link session for an access
    /// token.
    async fn exchange_public_token(&self, public_token: &str) -> Result<String, UpstreamError>;

    /// Fetches transactions between `start` and `end`, both inclusive.
    async fn transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, UpstreamError>;
}

/// Fixed parameters of the link token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProfile {
    /// Name shown to the user inside the Link widget.
    pub client_name: String,
    /// The system-specific user the link is created for.
    pub user_id: String,
    pub redirect_uri: Option<String>,
}

pub struct PlaidAggregator {
    client: Plaid,
    profile: LinkProfile,
}

impl PlaidAggregator {
    pub fn new(client: Plaid, profile: LinkProfile) -> Self {
        Self { client, profile }
    }
}

#[async_trait]
impl Aggregator for PlaidAggregator {
    async fn create_link_token(&self) -> Result<String, UpstreamError> {
        let req = CreateLinkTokenRequest {
            client_name: &self.profile.client_name,
            user: LinkUser::new(&self.profile.user_id),
            language: LANGUAGE,
            country_codes: &COUNTRY_CODES,
            products: &PRODUCTS,
            redirect_uri: self.profile.redirect_uri.as_deref(),
            ..CreateLinkTokenRequest::default()
        };

        let res = self.client.create_link_token(&req).await?;
        Ok(res.link_token)
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<String, UpstreamError> {
        let res = self
            .client
            .exchange_public_token(public_token.to_string())
            .await?;
        debug!(item_id = %res.item_id, "exchanged public token");

        Ok(res.access_token)
    }

    async fn transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, UpstreamError> {
        let start_date = start.format("%Y-%m-%d").to_string();
        let end_date = end.format("%Y-%m-%d").to_string();
        let res = self
            .client
            .transactions_get(&GetTransactionsRequest {
                access_token,
                start_date: start_date.as_str(),
                end_date: end_date.as_str(),
                options: None,
            })
            .await?;

        res.transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

/// Parses a Plaid environment name, ignoring case.
pub fn parse_environment(env: &str) -> Option<Environment> {
    match env.to_lowercase().as_str() {
        "sandbox" => Some(Environment::Sandbox),
        "development" => Some(Environment::Development),
        "production" => Some(Environment::Production),
        _ => None,
    }
}
