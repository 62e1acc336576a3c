use std::sync::atomic::AtomicBool;

use chrono::Utc;
use log::warn;

use super::block::Block;
use super::miner::find_block;
use super::model::Blockchain;
use super::validate::ValidationError;
use crate::transaction::{Transaction, TransactionPool};

/// Everything the proof-of-work search needs, snapshotted from the local
/// head so no lock is held while mining.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub index: u64,
    pub prev_hash: String,
    pub timestamp: i64,
    pub difficulty: u32,
    pub transactions: Vec<Transaction>,
}

impl BlockTemplate {
    /// Template for an explicit transaction list.
    pub fn with_transactions(bc: &Blockchain, transactions: Vec<Transaction>) -> Self {
        let head = bc.latest_block();
        Self {
            index: head.index + 1,
            prev_hash: head.hash.clone(),
            timestamp: Utc::now().timestamp(),
            difficulty: bc.next_difficulty(),
            transactions,
        }
    }

    /// Standard template: coinbase to `miner_address` first, then the
    /// current pool contents in order.
    pub fn next(bc: &Blockchain, pool: &TransactionPool, miner_address: &str) -> Self {
        let head = bc.latest_block();
        let mut transactions = Vec::with_capacity(1 + pool.len());
        transactions.push(Transaction::coinbase(miner_address, head.index + 1));
        transactions.extend_from_slice(pool.transactions());
        Self::with_transactions(bc, transactions)
    }

    /// Run the nonce search for this template. None means cancelled.
    pub fn mine(&self, cancel: &AtomicBool) -> Option<Block> {
        find_block(
            self.index,
            &self.prev_hash,
            self.timestamp,
            &self.transactions,
            self.difficulty,
            cancel,
        )
    }
}

/// Append a freshly mined block through the same path inbound blocks take,
/// then prune the pool against the new ledger state. A failed append leaves
/// both untouched; the block is discarded, never retried.
pub fn commit_mined_block(
    bc: &mut Blockchain,
    pool: &mut TransactionPool,
    block: Block,
) -> Result<(), ValidationError> {
    if let Err(e) = bc.append_block(block.clone()) {
        warn!("MINER - discarding self-mined block #{}: {e}", block.index);
        return Err(e);
    }
    pool.prune(bc.utxos());
    Ok(())
}

/// Mine and append the next block in one sitting: coinbase + pool contents,
/// the nonce search, then `commit_mined_block`. Returns the sealed block,
/// or None when the search was cancelled or the commit failed.
///
/// This drives the whole pipeline synchronously; the HTTP layer splits it
/// around `web::block` so the state lock is not held during the search.
pub fn generate_next_block(
    bc: &mut Blockchain,
    pool: &mut TransactionPool,
    miner_address: &str,
    cancel: &AtomicBool,
) -> Option<Block> {
    let template = BlockTemplate::next(bc, pool, miner_address);
    let block = template.mine(cancel)?;
    commit_mined_block(bc, pool, block.clone()).ok()?;
    Some(block)
}
