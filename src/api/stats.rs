use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};
use crate::blockchain::{BLOCK_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let (height, difficulty, cumulative_work, last_interval_secs, utxo_size) = {
        let node = state.node.lock().expect("mutex poisoned");
        let chain = node.chain();
        let last_interval = if chain.len() >= 2 {
            let newer = &chain[chain.len() - 1];
            let older = &chain[chain.len() - 2];
            Some((newer.timestamp - older.timestamp).max(0))
        } else {
            None
        };
        (
            node.len(),
            node.next_difficulty(),
            node.cumulative_work(),
            last_interval,
            node.utxos().len(),
        )
    };

    let pool_size = {
        let pool = state.pool.lock().expect("mutex poisoned");
        pool.len()
    };

    HttpResponse::Ok().json(StatsResponse {
        height,
        difficulty,
        cumulative_work,
        block_interval_secs: BLOCK_INTERVAL_SECS,
        adjustment_interval: DIFFICULTY_ADJUSTMENT_INTERVAL,
        last_interval_secs,
        pool_size,
        utxo_size,
    })
}
