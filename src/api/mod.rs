mod accounts;
mod balance;
mod chain;
mod health;
pub mod models;
mod peers;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::replace_chain)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::cancel_mining)
            .service(chain::get_difficulty)
            .service(chain::set_difficulty)
            .service(chain::get_latest_block)
            .service(chain::get_block_by_hash)
            .service(chain::get_block_by_index)
            .service(tx::post_transaction)
            .service(tx::post_transfer)
            .service(tx::get_transaction)
            .service(tx::get_mempool)
            .service(balance::get_balance)
            .service(accounts::list_accounts)
            .service(accounts::register_account)
            .service(accounts::deregister_account)
            .service(stats::get_stats)
            .service(wallet::create_wallet)
            .service(peers::list_peers)
            .service(peers::connect_peer)
            .service(peers::receive_message)
            .service(peers::broadcast_alert),
    );
}
