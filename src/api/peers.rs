use actix_web::{HttpResponse, Responder, get, post, web};

use super::models::{
    AlertRequest, AppState, BroadcastResponse, ConnectRequest, InboundResponse, PeersResponse,
};
use crate::peer::{Inbound, PeerMessage};

#[get("/peers/")]
pub async fn list_peers(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(PeersResponse {
        node_name: state.peers.node_name().to_string(),
        peers: state.peers.peers(),
    })
}

/// Add a peer, sync with its chain and announce this node.
#[post("/peers/")]
pub async fn connect_peer(
    state: web::Data<AppState>,
    body: web::Json<ConnectRequest>,
) -> impl Responder {
    let report = state.peers.connect(&state.ledger, &body.url).await;
    HttpResponse::Ok().json(report)
}

/// Inbound wire endpoint: the raw body is one `TX:` / `ALERT:` message.
#[post("/peers/message/")]
pub async fn receive_message(state: web::Data<AppState>, body: String) -> impl Responder {
    let inbound = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        state.peers.dispatch(&mut ledger, &body)
    };

    match inbound {
        Inbound::Queued(hash) => HttpResponse::Accepted().json(InboundResponse {
            outcome: "queued",
            detail: Some(hash),
        }),
        Inbound::Alert(_) => HttpResponse::Accepted().json(InboundResponse {
            outcome: "alert",
            detail: None,
        }),
        Inbound::Dropped => HttpResponse::Accepted().json(InboundResponse {
            outcome: "dropped",
            detail: None,
        }),
        Inbound::Rejected(e) => HttpResponse::BadRequest().json(InboundResponse {
            outcome: "rejected",
            detail: Some(e.to_string()),
        }),
        Inbound::Malformed(reason) => HttpResponse::BadRequest().json(InboundResponse {
            outcome: "malformed",
            detail: Some(reason),
        }),
    }
}

/// Broadcast an `ALERT:` to every peer and report per-peer delivery.
#[post("/peers/alert/")]
pub async fn broadcast_alert(
    state: web::Data<AppState>,
    body: web::Json<AlertRequest>,
) -> impl Responder {
    let reports = state
        .peers
        .broadcast(&PeerMessage::Alert(body.into_inner().text))
        .await;
    HttpResponse::Ok().json(BroadcastResponse { reports })
}
