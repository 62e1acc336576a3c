use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, NewTxRequest, NewTxResponse, PoolResponse, SendTxRequest};
use crate::transaction::Transaction;
use crate::wallet::create_signed_tx;

/// Submit a pre-signed transaction into the pool.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    if body.outputs.is_empty() {
        return HttpResponse::BadRequest().body("transaction must have at least one output");
    }
    if body.outputs.iter().any(|o| o.amount == 0) {
        return HttpResponse::BadRequest().body("output amount must be > 0");
    }

    let tx = Transaction::new(body.inputs.clone(), body.outputs.clone());
    let txid = tx.txid.clone();

    let added = {
        let node = state.node.lock().expect("mutex poisoned");
        let mut pool = state.pool.lock().expect("mutex poisoned");
        pool.add(tx, node.utxos())
    };
    if let Err(e) = added {
        warn!("POST /tx/ - rejected txid={txid}: {e}");
        return HttpResponse::BadRequest().body(e.to_string());
    }

    {
        let pool = state.pool.lock().expect("mutex poisoned");
        state.peers.announce_pool(pool.transactions());
    }
    info!("POST /tx/ - txid={txid} accepted into pool");
    HttpResponse::Ok().json(NewTxResponse { txid })
}

/// DEV: build, sign and pool a spend using a caller-supplied private key.
#[post("/tx/send/")]
pub async fn send_transaction(
    state: web::Data<AppState>,
    body: web::Json<SendTxRequest>,
) -> impl Responder {
    let result = {
        let node = state.node.lock().expect("mutex poisoned");
        let mut pool = state.pool.lock().expect("mutex poisoned");
        match create_signed_tx(&body.private_key, &body.to_address, body.amount, node.utxos()) {
            Ok(tx) => {
                let txid = tx.txid.clone();
                pool.add(tx, node.utxos())
                    .map(|_| txid)
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        }
    };

    match result {
        Ok(txid) => {
            {
                let pool = state.pool.lock().expect("mutex poisoned");
                state.peers.announce_pool(pool.transactions());
            }
            info!("POST /tx/send/ - txid={txid} accepted into pool");
            HttpResponse::Ok().json(NewTxResponse { txid })
        }
        Err(e) => {
            warn!("POST /tx/send/ - rejected: {e}");
            HttpResponse::BadRequest().body(e)
        }
    }
}

/// List the current pool (just txids to keep it compact).
#[get("/pool/")]
pub async fn get_pool(state: web::Data<AppState>) -> impl Responder {
    let pool = state.pool.lock().expect("mutex poisoned");
    let txids = pool
        .transactions()
        .iter()
        .map(|t| t.txid.clone())
        .collect::<Vec<_>>();
    HttpResponse::Ok().json(PoolResponse {
        size: pool.len(),
        transactions: txids,
    })
}
