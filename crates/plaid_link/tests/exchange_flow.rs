use chrono::{Duration, Local};
use plaid_link::{Aggregator, Builder, Credentials, Environment, LinkProfile, PlaidAggregator};
use rplaid::model::*;

const INSTITUTION_ID: &str = "ins_129571";

fn sandbox_client() -> rplaid::client::Plaid {
    Builder::new()
        .with_credentials(Credentials {
            client_id: std::env::var("PLAID_CLIENT_ID").expect("PLAID_CLIENT_ID must be set"),
            secret: std::env::var("PLAID_SECRET").expect("PLAID_SECRET must be set"),
        })
        .with_env(Environment::Sandbox)
        .build()
}

fn test_profile() -> LinkProfile {
    LinkProfile {
        client_name: "banklink".to_string(),
        user_id: "test-user".to_string(),
        redirect_uri: None,
    }
}

#[ignore]
#[tokio::test]
async fn can_execute_exchange_flow() -> Result<(), Box<dyn std::error::Error>> {
    let public_token = sandbox_client()
        .create_public_token(CreatePublicTokenRequest {
            institution_id: INSTITUTION_ID,
            initial_products: &["transactions"],
            options: None,
        })
        .await?;

    let aggregator = PlaidAggregator::new(sandbox_client(), test_profile());

    let link_token = aggregator.create_link_token().await?;
    assert!(!link_token.is_empty());

    let access_token = aggregator.exchange_public_token(&public_token).await?;
    assert!(!access_token.is_empty());

    let today = Local::now().date_naive();
    match aggregator
        .transactions(&access_token, today - Duration::days(30), today)
        .await
    {
        Ok(_) | Err(plaid_link::UpstreamError::ProductNotReady(_)) => {}
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
