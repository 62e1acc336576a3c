use actix_web::{HttpResponse, Responder, post, web};
use log::{info, warn};

use super::models::{AppState, MineRequest, MineResponse};
use crate::blockchain::assemble::{BlockTemplate, commit_mined_block};

/// Mine the next block: coinbase to `miner_address` plus the current pool.
///
/// The head, difficulty and pool are snapshotted into a template under the
/// lock, the nonce search runs on a blocking worker with no lock held, and
/// the sealed block then goes through the same append path as an inbound
/// block. If a heavier chain arrived mid-search the attempt is cancelled or
/// the append fails; either way it is discarded, never retried.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let miner_address = req.miner_address.trim().to_string();
    if miner_address.is_empty() {
        return HttpResponse::BadRequest().body("miner_address required");
    }

    let template = {
        let node = state.node.lock().expect("mutex poisoned");
        let pool = state.pool.lock().expect("mutex poisoned");
        BlockTemplate::next(&node, &pool, &miner_address)
    };
    info!(
        "MINER - searching block #{} (diff={}, txs={})",
        template.index,
        template.difficulty,
        template.transactions.len()
    );

    let cancel = state.miner.begin();
    let mined = web::block(move || template.mine(&cancel)).await;

    let block = match mined {
        Ok(Some(block)) => block,
        Ok(None) => {
            warn!("MINER - attempt cancelled (heavier chain arrived)");
            return HttpResponse::Conflict().body("mining attempt cancelled");
        }
        Err(_) => return HttpResponse::InternalServerError().body("mining worker failed"),
    };

    {
        let mut node = state.node.lock().expect("mutex poisoned");
        let mut pool = state.pool.lock().expect("mutex poisoned");
        if let Err(e) = commit_mined_block(&mut node, &mut pool, block.clone()) {
            return HttpResponse::Conflict().body(format!("block discarded: {e}"));
        }
    }
    state.peers.announce_new_head(&block);

    info!(
        "MINER - sealed block #{} (hash={}, nonce={})",
        block.index, block.hash, block.nonce
    );
    HttpResponse::Ok().json(MineResponse {
        mined_index: block.index,
        hash: block.hash,
        nonce: block.nonce,
        difficulty: block.difficulty,
    })
}
