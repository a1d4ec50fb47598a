use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, BlockData, LedgerError, Transaction};
use ledger_sync::{spawn_mining, MiningJob, P2pServer};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    p2p: P2pServer,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct MineIn {
    data: BlockData,
}

#[derive(Deserialize)]
struct TransactIn {
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKey {
    public_key: String,
}

#[derive(Serialize)]
struct Balance {
    balance: u64,
}

/// Ledger rejections are the caller's fault; anything else is ours.
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is::<LedgerError>() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = Json(serde_json::json!({ "error": format!("{:#}", self.0) }));
        (status, body).into_response()
    }
}

pub(crate) fn router(p2p: P2pServer) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/blocks", get(blocks))
        .route("/mine", post(mine))
        .route("/transactions", get(transactions))
        .route("/transact", post(transact))
        .route("/mine-transactions", get(mine_transactions))
        .route("/public-key", get(public_key))
        .route("/balance", get(balance))
        .with_state(AppState { p2p })
        .layer(TraceLayer::new_for_http())
}

async fn blocks(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.p2p.ledger().lock().await.chain.blocks().to_vec())
}

async fn mine(State(state): State<AppState>, Json(body): Json<MineIn>) -> Result<Json<Block>, ApiError> {
    let block = spawn_mining(&state.p2p, MiningJob::Data(body.data)).join().await?;
    info!("New block added: {block}");
    Ok(Json(block))
}

async fn transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.p2p.ledger().lock().await.pool.transactions().to_vec())
}

async fn transact(
    State(state): State<AppState>,
    Json(body): Json<TransactIn>,
) -> Result<Json<Transaction>, ApiError> {
    let mut ledger = state.p2p.ledger().lock().await;
    let transaction = ledger.transact(&body.recipient, body.amount, &state.p2p)?;
    Ok(Json(transaction))
}

async fn mine_transactions(State(state): State<AppState>) -> Result<Json<Block>, ApiError> {
    let block = spawn_mining(&state.p2p, MiningJob::Pool).join().await?;
    info!("New block has been added: {block}");
    Ok(Json(block))
}

async fn public_key(State(state): State<AppState>) -> Json<PublicKey> {
    let ledger = state.p2p.ledger().lock().await;
    Json(PublicKey {
        public_key: ledger.wallet.public_key().to_string(),
    })
}

async fn balance(State(state): State<AppState>) -> Json<Balance> {
    Json(Balance {
        balance: state.p2p.ledger().lock().await.balance(),
    })
}
