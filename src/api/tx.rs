use actix_web::{HttpResponse, Responder, get, post, rt, web};
use log::{debug, info};
use std::time::Instant;

use super::models::{AppState, MempoolResponse, NewTxResponse, TransferRequest};
use crate::error::LedgerError;
use crate::peer::PeerMessage;
use crate::transaction::TransactionRecord;

/// Relay an accepted transaction to every peer without making the caller
/// wait on delivery.
fn relay(state: &web::Data<AppState>, tx: TransactionRecord) {
    let state = state.clone();
    rt::spawn(async move {
        let reports = state.peers.broadcast(&PeerMessage::Tx(tx)).await;
        debug!("relayed tx to {} peers", reports.len());
    });
}

/// Submit a signed transaction (flat wire JSON) into the pending queue.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<TransactionRecord>,
) -> Result<HttpResponse, LedgerError> {
    let t0 = Instant::now();
    let tx = body.into_inner();
    let hash = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.add_transaction(tx.clone())?
    };
    relay(&state, tx);

    info!("POST /tx/ - {} OK ({} ms)", hash, t0.elapsed().as_millis());
    Ok(HttpResponse::Ok().json(NewTxResponse { hash }))
}

/// Build, sign and queue a transfer using the key registered for `from`.
#[post("/tx/transfer/")]
pub async fn post_transfer(
    state: web::Data<AppState>,
    body: web::Json<TransferRequest>,
) -> Result<HttpResponse, LedgerError> {
    let req = body.into_inner();
    let (tx, hash) = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        let key = ledger
            .registry()
            .private_key(&req.from)
            .map(str::to_string)
            .ok_or_else(|| {
                LedgerError::InvalidKey(format!("no private key registered for {}", req.from))
            })?;

        let mut tx = TransactionRecord::transfer(req.from, req.to, req.amount);
        tx.sign(&key)?;
        let hash = ledger.add_transaction(tx.clone())?;
        (tx, hash)
    };
    relay(&state, tx);

    info!("POST /tx/transfer/ - {hash} queued");
    Ok(HttpResponse::Ok().json(NewTxResponse { hash }))
}

#[get("/tx/{hash}/")]
pub async fn get_transaction(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let hash = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.get_transaction_by_hash(&hash) {
        Some(tx) => HttpResponse::Ok().json(tx),
        None => HttpResponse::NotFound().body("transaction not found"),
    }
}

/// List the pending queue in arrival order.
#[get("/mempool/")]
pub async fn get_mempool(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let pending = ledger.get_pending_transactions();
    HttpResponse::Ok().json(MempoolResponse {
        size: pending.len(),
        transactions: pending,
    })
}
