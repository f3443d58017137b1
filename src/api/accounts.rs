use actix_web::{HttpResponse, Responder, delete, get, post, web};
use chrono::Utc;

use super::models::{AccountView, AccountsResponse, AppState, RegisterRequest};
use crate::error::LedgerError;

const ACTIVE_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Every cached address with its chain-derived activity.
#[get("/accounts/")]
pub async fn list_accounts(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let registry = ledger.registry();

    let mut accounts: Vec<AccountView> = registry
        .iter()
        .map(|entry| AccountView {
            stats: ledger.address_stats(&entry.address),
            cached_balance: entry.balance,
            created_at: entry.created_at,
            history: &entry.history,
        })
        .collect();
    accounts.sort_by(|a, b| a.stats.address.cmp(&b.stats.address));

    let since = Utc::now().timestamp_millis() - ACTIVE_WINDOW_MS;
    let resp = AccountsResponse {
        total: registry.len(),
        active_last_hour: registry.active_since(since).len(),
        total_balance: registry.total_balance(),
        accounts,
    };
    HttpResponse::Ok().json(resp)
}

/// Seed an address, optionally with a key and a funding amount that lands
/// with the next block.
#[post("/accounts/")]
pub async fn register_account(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, LedgerError> {
    let req = body.into_inner();
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    ledger.register_address(&req.address, req.initial_balance, req.private_key)?;
    Ok(HttpResponse::Created().json(ledger.address_stats(req.address.trim())))
}

/// Forget an address in the registry. The chain is not touched.
#[delete("/accounts/{address}/")]
pub async fn deregister_account(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let address = path.into_inner().0;
    let mut ledger = state.ledger.lock().expect("mutex poisoned");
    match ledger.deregister_address(&address) {
        Some(_) => HttpResponse::NoContent().finish(),
        None => HttpResponse::NotFound().body("address not registered"),
    }
}
