use actix_web::{HttpResponse, Responder, post};
use serde::Serialize;

use crate::wallet::generate_keypair;

#[derive(Serialize)]
struct NewWalletResponse {
    private_key: String,
    address: String,
}

/// Dev helper: mint a keypair. Nothing is stored server-side.
#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let kp = generate_keypair();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: kp.private_key,
        address: kp.address,
    })
}
