use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let (chain, registered_addresses) = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        (ledger.stats(), ledger.registry().len())
    };

    HttpResponse::Ok().json(StatsResponse {
        chain,
        registered_addresses,
        peers: state.peers.peers().len(),
    })
}
