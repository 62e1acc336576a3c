use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::Utc;
use log::info;

use super::models::{AppState, ChainResponse, DifficultyResponse, ReplaceResponse, ValidateResponse};
use crate::blockchain::Block;
use crate::blockchain::validate::validate_chain;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.lock().expect("mutex poisoned");
    let resp = ChainResponse {
        length: node.len(),
        cumulative_work: node.cumulative_work(),
        chain: node.chain(),
    };
    HttpResponse::Ok().json(resp)
}

/// Offer a full candidate chain (peer sync). The candidate is replayed from
/// genesis and adopted only if it carries strictly more cumulative work; on
/// adoption, any in-flight mining attempt is aborted, the pool is pruned
/// against the new ledger state and the new head is announced.
#[post("/chain/")]
pub async fn replace_chain(
    state: web::Data<AppState>,
    body: web::Json<Vec<Block>>,
) -> impl Responder {
    let candidate = body.into_inner();

    let outcome = {
        let mut node = state.node.lock().expect("mutex poisoned");
        match node.replace_chain(candidate) {
            Ok(true) => {
                state.miner.cancel_current();
                let mut pool = state.pool.lock().expect("mutex poisoned");
                pool.prune(node.utxos());
                Ok((true, node.len(), node.cumulative_work(), Some(node.latest_block().clone())))
            }
            Ok(false) => Ok((false, node.len(), node.cumulative_work(), None)),
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok((replaced, length, cumulative_work, new_head)) => {
            if let Some(head) = new_head {
                state.peers.announce_new_head(&head);
            }
            HttpResponse::Ok().json(ReplaceResponse {
                replaced,
                length,
                cumulative_work,
            })
        }
        Err(e) => HttpResponse::BadRequest().body(e.to_string()),
    }
}

/// Validate the local chain by full replay.
#[get("/validate/")]
pub async fn validate_local_chain(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.lock().expect("mutex poisoned");
    let valid = validate_chain(node.chain(), Utc::now().timestamp()).is_ok();
    if !valid {
        // only reachable if local state was corrupted in memory
        info!("CHAIN - local chain failed self-validation");
    }
    HttpResponse::Ok().json(ValidateResponse {
        valid,
        length: node.len(),
        cumulative_work: node.cumulative_work(),
    })
}

/// Difficulty the next block must meet.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: node.next_difficulty(),
    })
}
