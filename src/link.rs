use std::sync::Arc;

use anyhow::Result;
use plaid_link::{Aggregator, Builder, Credentials, LinkProfile, PlaidAggregator, UpstreamError};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::core::{Credential, UNKNOWN_INSTITUTION};
use crate::settings::Settings;
use crate::store::{self, Repository, SqliteStore};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Store(#[from] store::Error),
}

/// Metadata reported by the Link widget once a user finishes linking.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LinkMetadata {
    #[serde(default)]
    pub institution: Option<InstitutionMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct InstitutionMetadata {
    #[serde(default)]
    pub institution_id: Option<String>,
}

impl LinkMetadata {
    pub fn institution_id(metadata: Option<&LinkMetadata>) -> &str {
        metadata
            .and_then(|m| m.institution.as_ref())
            .and_then(|i| i.institution_id.as_deref())
            .unwrap_or(UNKNOWN_INSTITUTION)
    }
}

/// Issues link tokens and turns completed links into stored credentials.
pub struct Linker {
    aggregator: Arc<dyn Aggregator>,
    store: Arc<dyn Repository>,
}

impl Linker {
    pub fn new(aggregator: Arc<dyn Aggregator>, store: Arc<dyn Repository>) -> Self {
        Self { aggregator, store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_link_token(&self) -> std::result::Result<String, LinkError> {
        Ok(self.aggregator.create_link_token().await?)
    }

    #[tracing::instrument(skip(self, public_token))]
    pub async fn exchange(
        &self,
        public_token: &str,
        metadata: Option<&LinkMetadata>,
    ) -> std::result::Result<Credential, LinkError> {
        let institution_id = LinkMetadata::institution_id(metadata);
        let access_token = self.aggregator.exchange_public_token(public_token).await?;

        let credential = Credential::new(institution_id, access_token);
        self.store.upsert_credential(&credential).await?;
        info!("Stored access token for institution {}.", institution_id);

        Ok(credential)
    }
}

pub(crate) fn default_aggregator(settings: &Settings) -> Result<Arc<dyn Aggregator>> {
    let plaid = Builder::new()
        .with_credentials(Credentials {
            client_id: settings.plaid.client_id.clone(),
            secret: settings.plaid.secret.clone(),
        })
        .with_env(settings.plaid.environment()?)
        .build();

    Ok(Arc::new(PlaidAggregator::new(
        plaid,
        LinkProfile {
            client_name: settings.plaid.client_name.clone(),
            user_id: settings.plaid.user_id.clone(),
            redirect_uri: settings.plaid.redirect_uri.clone(),
        },
    )))
}

/// Prints every linked institution.
pub(crate) async fn run(settings: Settings) -> Result<()> {
    let store = SqliteStore::new(&settings.database_uri()?).await?;
    let credentials = store.credentials().await?;

    crate::display::print_links(std::io::stdout(), &credentials)?;

    Ok(())
}
