use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};

use super::models::{
    AppState, CancelResponse, ChainResponse, DifficultyResponse, MineRequest, MineResponse,
    ReplaceChainRequest, ReplaceChainResponse, SetDifficultyRequest, ValidateResponse,
};
use crate::blockchain::{DIFF_MAX, DIFF_MIN};
use crate::error::LedgerError;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let resp = ChainResponse {
        length: ledger.len(),
        difficulty: ledger.difficulty(),
        chain: ledger.chain(),
    };
    HttpResponse::Ok().json(resp)
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ValidateResponse {
        valid: ledger.is_valid(),
        length: ledger.len(),
        difficulty: ledger.difficulty(),
    })
}

/// Offer a candidate chain (longest valid chain wins).
#[post("/chain/replace/")]
pub async fn replace_chain(
    state: web::Data<AppState>,
    body: web::Json<ReplaceChainRequest>,
) -> Result<HttpResponse, LedgerError> {
    let candidate = body.into_inner().chain;
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    ledger.replace_chain(candidate)?;
    Ok(HttpResponse::Ok().json(ReplaceChainResponse {
        replaced: true,
        length: ledger.len(),
    }))
}

/// Mine a new block from the pending queue:
/// - Snapshot pending txs + reward for `miner_address` (under the lock)
/// - Run PoW on the blocking pool with the lock released
/// - Re-lock and append; txs that arrived meanwhile stay pending
#[post("/mine/")]
pub async fn mine_block(
    state: web::Data<AppState>,
    req: web::Json<MineRequest>,
) -> Result<HttpResponse, LedgerError> {
    let (mut block, difficulty) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        (ledger.prepare_block(&req.miner_address)?, ledger.difficulty())
    };
    debug!(
        "MINER - template #{} with {} txs at difficulty {}",
        block.index,
        block.transactions.len(),
        difficulty
    );

    let cancel = state.start_mining();
    let flag = cancel.clone();
    let mined = web::block(move || {
        block
            .mine_cancellable(difficulty, &flag)
            .map(|()| block)
    })
    .await;
    state.finish_mining(&cancel);
    let block = mined.map_err(|e| LedgerError::MiningFailed(e.to_string()))??;

    let resp = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        let sealed = ledger.commit_block(block)?;
        MineResponse {
            mined_index: sealed.index,
            hash: sealed.hash.clone(),
            nonce: sealed.nonce,
            difficulty: sealed.difficulty,
            transactions: sealed.transactions.len(),
        }
    };
    info!(
        "MINER - sealed block #{} (hash={}, nonce={})",
        resp.mined_index, resp.hash, resp.nonce
    );
    Ok(HttpResponse::Ok().json(resp))
}

/// Interrupt every in-flight mine.
#[post("/mine/cancel/")]
pub async fn cancel_mining(state: web::Data<AppState>) -> impl Responder {
    let interrupted = state.cancel_mining();
    HttpResponse::Ok().json(CancelResponse {
        cancel_requested: true,
        interrupted,
    })
}

/// Get current PoW difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: ledger.difficulty(),
    })
}

/// Update PoW difficulty (affects future blocks only).
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> impl Responder {
    if !(DIFF_MIN..=DIFF_MAX).contains(&body.difficulty) {
        return HttpResponse::BadRequest().body(format!(
            "difficulty must be between {DIFF_MIN} and {DIFF_MAX}"
        ));
    }
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: ledger.set_difficulty(body.difficulty),
    })
}

#[get("/blocks/latest/")]
pub async fn get_latest_block(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.get_latest_block())
}

#[get("/blocks/hash/{hash}/")]
pub async fn get_block_by_hash(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let hash = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.get_block_by_hash(&hash) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().body("block not found"),
    }
}

#[get("/blocks/{index}/")]
pub async fn get_block_by_index(
    state: web::Data<AppState>,
    path: web::Path<(u64,)>,
) -> impl Responder {
    let index = path.into_inner().0;
    let ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.get_block_by_index(index) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().body("block not found"),
    }
}
