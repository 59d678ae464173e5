use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use plaid_link::Aggregator;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::Transaction;
use crate::link::{LinkError, LinkMetadata, Linker};
use crate::settings::Settings;
use crate::store::{Repository, SqliteStore};
use crate::txn::{SyncError, Syncer};

/// Error response rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        error!("link request failed: {}", err);
        ApiError::internal(err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NoLinkedInstitutions => ApiError::bad_request(err.to_string()),
            SyncError::Store(_) => {
                error!("sync request failed: {}", err);
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct LinkTokenBody {
    link_token: String,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct TransactionsBody {
    transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRequest {
    public_token: String,
    #[serde(default)]
    metadata: Option<LinkMetadata>,
}

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    linker: Arc<Linker>,
    syncer: Arc<Syncer>,
}

impl AppState {
    pub fn new(aggregator: Arc<dyn Aggregator>, store: Arc<dyn Repository>) -> Self {
        Self {
            linker: Arc::new(Linker::new(aggregator.clone(), store.clone())),
            syncer: Arc::new(Syncer::new(aggregator, store)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/create_link_token", post(create_link_token))
        .route("/api/exchange_public_token", post(exchange_public_token))
        .route("/api/sync_transactions", get(sync_transactions))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn create_link_token(
    Extension(state): Extension<AppState>,
) -> Result<Json<LinkTokenBody>, ApiError> {
    let link_token = state.linker.create_link_token().await?;

    Ok(Json(LinkTokenBody { link_token }))
}

async fn exchange_public_token(
    Extension(state): Extension<AppState>,
    body: std::result::Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.to_string()))?;

    state
        .linker
        .exchange(&req.public_token, req.metadata.as_ref())
        .await?;

    Ok(Json(StatusBody { status: "success" }))
}

async fn sync_transactions(
    Extension(state): Extension<AppState>,
) -> Result<Json<TransactionsBody>, ApiError> {
    let transactions = state.syncer.sync(Local::now().date_naive()).await?;

    Ok(Json(TransactionsBody { transactions }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}

pub(crate) async fn run(settings: Settings) -> Result<()> {
    let store = Arc::new(SqliteStore::new(&settings.database_uri()?).await?);
    let state = AppState::new(crate::link::default_aggregator(&settings)?, store);

    let addr = settings.socket_addr()?;
    let server = axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    info!("Listening on http://{}", addr);

    server.await?;

    Ok(())
}

static INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Personal Finance Tracker</title>
  <script src="https://cdn.plaid.com/link/v2/stable/link-initialize.js"></script>
</head>
<body>
  <button id="link">Link a bank</button>
  <button id="sync">Sync transactions</button>
  <p id="status"></p>
  <table>
    <thead><tr><th>Date</th><th>Name</th><th>Amount</th><th>Category</th></tr></thead>
    <tbody id="transactions"></tbody>
  </table>
  <script>
    const status = (msg) => document.getElementById("status").textContent = msg;

    document.getElementById("link").onclick = async () => {
      const res = await fetch("/api/create_link_token", { method: "POST" });
      const body = await res.json();
      if (!res.ok) return status(body.error);

      Plaid.create({
        token: body.link_token,
        onSuccess: async (public_token, metadata) => {
          const res = await fetch("/api/exchange_public_token", {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify({ public_token, metadata }),
          });
          const body = await res.json();
          status(res.ok ? "Bank linked." : body.error);
        },
        onExit: () => null,
      }).open();
    };

    document.getElementById("sync").onclick = async () => {
      status("Syncing...");
      const res = await fetch("/api/sync_transactions");
      const body = await res.json();
      if (!res.ok) return status(body.error);

      const rows = document.getElementById("transactions");
      rows.innerHTML = "";
      for (const tx of body.transactions) {
        const row = rows.insertRow();
        for (const value of [tx.date, tx.name, tx.amount.toFixed(2), tx.category.join(", ")]) {
          row.insertCell().textContent = value;
        }
      }
      status(`${body.transactions.length} transactions.`);
    };
  </script>
</body>
</html>
"#;
