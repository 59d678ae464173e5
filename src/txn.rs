use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use clap::ArgMatches;
use plaid_link::{Aggregator, UpstreamError};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::{Credential, Transaction};
use crate::settings::Settings;
use crate::store::{self, Repository, SqliteStore};

/// Days of history requested for every linked institution on each sync.
pub const SYNC_WINDOW_DAYS: i64 = 365 * 2;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No access token. Please link your bank first.")]
    NoLinkedInstitutions,
    #[error(transparent)]
    Store(#[from] store::Error),
}

#[derive(Debug, Error)]
enum CredentialError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Store(#[from] store::Error),
}

/// Pulls transactions for every stored credential into the store.
pub struct Syncer {
    aggregator: Arc<dyn Aggregator>,
    store: Arc<dyn Repository>,
}

impl Syncer {
    pub fn new(aggregator: Arc<dyn Aggregator>, store: Arc<dyn Repository>) -> Self {
        Self { aggregator, store }
    }

    /// Syncs the trailing window ending on `today` for each credential in
    /// turn and returns every fetched transaction, newest first.
    ///
    /// A credential that fails is logged and skipped; it does not stop the
    /// remaining credentials from syncing.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self, today: NaiveDate) -> std::result::Result<Vec<Transaction>, SyncError> {
        let credentials = self.store.credentials().await?;
        if credentials.is_empty() {
            return Err(SyncError::NoLinkedInstitutions);
        }

        let start = today - Duration::days(SYNC_WINDOW_DAYS);
        let mut all = vec![];
        for credential in &credentials {
            match self.sync_credential(credential, start, today).await {
                Ok(mut txns) => all.append(&mut txns),
                Err(CredentialError::Upstream(UpstreamError::ProductNotReady(_))) => {
                    debug!(
                        "Transactions for institution {} are not ready yet, skipping.",
                        credential.institution_id
                    );
                }
                Err(err) => {
                    error!(
                        "Failed to sync institution {}: {}",
                        credential.institution_id, err
                    );
                }
            }
        }

        all.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(all)
    }

    async fn sync_credential(
        &self,
        credential: &Credential,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<Transaction>, CredentialError> {
        info!(
            "Pulling transactions for institution {}.",
            credential.institution_id
        );

        let txns: Vec<Transaction> = self
            .aggregator
            .transactions(&credential.access_token, start, end)
            .await?
            .into_iter()
            .map(|tx| Transaction::from_upstream(tx, &credential.institution_id))
            .collect();

        let inserted = self.store.insert_transactions(&txns).await?;
        info!(
            "Stored {} new of {} transactions for institution {}.",
            inserted,
            txns.len(),
            credential.institution_id
        );

        Ok(txns)
    }
}

async fn pull(settings: Settings) -> Result<()> {
    let store = Arc::new(SqliteStore::new(&settings.database_uri()?).await?);
    let syncer = Syncer::new(crate::link::default_aggregator(&settings)?, store);

    let txns = syncer.sync(Local::now().date_naive()).await?;
    crate::display::print_transactions(std::io::stdout(), &txns)?;

    Ok(())
}

async fn print_stored(settings: Settings) -> Result<()> {
    let store = SqliteStore::new(&settings.database_uri()?).await?;
    let txns = store.txns().list().await?;

    crate::display::print_transactions(std::io::stdout(), &txns)?;

    Ok(())
}

pub(crate) async fn run(matches: &ArgMatches, settings: Settings) -> Result<()> {
    match matches.subcommand() {
        Some(("sync", _sync_matches)) => pull(settings).await,
        Some(("list", _list_matches)) => print_stored(settings).await,
        None => unreachable!("subcommand is required"),
        _ => unreachable!(),
    }
}
