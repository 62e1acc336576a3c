use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::blockchain::{Blockchain, MinerControl};
use crate::p2p::{Broadcast, LogBroadcast};
use crate::transaction::TransactionPool;

/// Shared application state. Chain and UTXO set live together inside
/// `Blockchain` behind a single mutex, so no reader ever sees one without
/// the matching other.
pub struct AppState {
    pub node: Mutex<Blockchain>,
    pub pool: Mutex<TransactionPool>,
    pub miner: MinerControl,
    pub peers: Arc<dyn Broadcast>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            node: Mutex::new(Blockchain::new()),
            pool: Mutex::new(TransactionPool::new()),
            miner: MinerControl::new(),
            peers: Arc::new(LogBroadcast),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub cumulative_work: u128,
    pub chain: &'a [crate::blockchain::Block],
}

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub replaced: bool,
    pub length: usize,
    pub cumulative_work: u128,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub cumulative_work: u128,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub mined_index: u64,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub inputs: Vec<crate::transaction::TxInput>,
    pub outputs: Vec<crate::transaction::TxOutput>,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub txid: String,
}

/// DEV convenience: the node builds and signs the spend itself.
#[derive(Deserialize)]
pub struct SendTxRequest {
    pub private_key: String,
    pub to_address: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct PoolResponse {
    pub size: usize,
    pub transactions: Vec<String>, // list txids for brevity
}

/* ---------- Balance / Stats API Models ---------- */

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u128,
    pub utxos: usize,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub cumulative_work: u128,
    pub block_interval_secs: i64,
    pub adjustment_interval: u64,
    pub last_interval_secs: Option<i64>,
    pub pool_size: usize,
    pub utxo_size: usize,
}
