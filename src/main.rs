use actix_web::{App, HttpServer, rt, web};
use dotenvy::dotenv;
use log::info;

use pow_ledger::api::{self, AppState};
use pow_ledger::config::NodeConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env();
    info!(
        "⛓️ Starting ledger node \"{}\" at http://{}:{} (difficulty={}, reward={}, peers={})",
        config.node_name,
        config.host,
        config.port,
        config.difficulty,
        config.mining_reward,
        config.peers.len()
    );

    let state = web::Data::new(AppState::from_config(&config));

    // Reconcile with configured peers once the runtime is up.
    for peer in config.peers.clone() {
        let state = state.clone();
        rt::spawn(async move {
            let report = state.peers.connect(&state.ledger, &peer).await;
            info!(
                "connected to {} (chain adopted: {})",
                report.peer, report.chain_adopted
            );
        });
    }

    HttpServer::new({
        let state = state.clone();
        move || {
            App::new()
                .app_data(state.clone())
                .configure(api::init_routes)
        }
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
