use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse};

#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;

    let (balance, cached_balance) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        (
            ledger.get_balance_of_address(&address),
            ledger.registry().balance_of(&address),
        )
    };

    HttpResponse::Ok().json(BalanceResponse {
        address,
        balance,
        cached_balance,
    })
}
