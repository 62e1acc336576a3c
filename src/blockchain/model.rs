use chrono::Utc;
use log::{info, warn};

use super::block::Block;
use super::difficulty::next_difficulty;
use super::validate::{ValidationError, validate_chain, validate_new_block};
use crate::transaction::{UtxoSet, process_transactions};

/// Fork-choice weight of a chain: sum of 2^difficulty over its blocks.
/// Higher difficulty weighs exponentially, not linearly.
///
/// The shift is clamped to 127 so the term fits in u128. Hostile blocks may
/// claim any u32 difficulty; those saturate rather than panic.
pub fn cumulative_work(blocks: &[Block]) -> u128 {
    blocks
        .iter()
        .map(|b| 1u128 << b.difficulty.min(127))
        .sum()
}

/// The chain and its ledger state, owned as one unit.
///
/// The UTXO set is always exactly the fold of the accepted chain; `append`
/// and `replace` mutate both or neither, so anyone holding this behind a
/// lock never observes a half-updated pair.
#[derive(Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
    utxos: UtxoSet,
}

impl Blockchain {
    /// Start from the canonical genesis block and its ledger state.
    pub fn new() -> Self {
        let genesis = Block::genesis();
        let utxos = process_transactions(&genesis.transactions, 0, &UtxoSet::new())
            .expect("genesis ledger state");
        Self {
            chain: vec![genesis],
            utxos,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.last().expect("chain holds at least genesis")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Difficulty required of the next block.
    pub fn next_difficulty(&self) -> u32 {
        next_difficulty(&self.chain)
    }

    pub fn cumulative_work(&self) -> u128 {
        cumulative_work(&self.chain)
    }

    /// Append one block: validate it against the local head, run the ledger
    /// transition, and only then mutate chain and UTXO set together. Used
    /// identically for inbound and self-mined blocks; a failure leaves this
    /// state untouched and is terminal for that block.
    pub fn append_block(&mut self, block: Block) -> Result<(), ValidationError> {
        let now = Utc::now().timestamp();
        validate_new_block(&block, self.latest_block(), now)?;
        let next = process_transactions(&block.transactions, block.index, &self.utxos)?;

        info!(
            "CHAIN - appended block #{} (hash={}, txs={}, diff={})",
            block.index,
            block.hash,
            block.transactions.len(),
            block.difficulty
        );
        self.chain.push(block);
        self.utxos = next;
        Ok(())
    }

    /// Heaviest-chain reconciliation. The candidate is replayed in full and
    /// adopted only with strictly greater cumulative work than the local
    /// chain, swapping chain and ledger state together. A valid candidate
    /// without more work, ties included, is a no-op returning `Ok(false)`.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<bool, ValidationError> {
        let now = Utc::now().timestamp();
        let replayed = match validate_chain(&candidate, now) {
            Ok(utxos) => utxos,
            Err(e) => {
                warn!("CHAIN - rejected candidate chain: {e}");
                return Err(e);
            }
        };

        let local_work = self.cumulative_work();
        let candidate_work = cumulative_work(&candidate);
        if candidate_work <= local_work {
            info!(
                "CHAIN - candidate valid but not heavier ({candidate_work} <= {local_work}), keeping local chain"
            );
            return Ok(false);
        }

        info!(
            "CHAIN - adopting candidate chain: {} blocks, work {candidate_work} > {local_work}",
            candidate.len()
        );
        self.chain = candidate;
        self.utxos = replayed;
        Ok(true)
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::miner::find_block;
    use crate::transaction::{COINBASE_AMOUNT, Transaction};
    use std::sync::atomic::AtomicBool;

    /// Mine a successor of `prev` at the given difficulty, coinbase to `miner`.
    fn mined_next(prev: &Block, difficulty: u32, miner: &str) -> Block {
        let txs = vec![Transaction::coinbase(miner, prev.index + 1)];
        let cancel = AtomicBool::new(false);
        find_block(
            prev.index + 1,
            &prev.hash,
            Utc::now().timestamp(),
            &txs,
            difficulty,
            &cancel,
        )
        .expect("search terminates")
    }

    /// Genesis plus `len` mined blocks, all at `difficulty`.
    fn fork_from_genesis(len: usize, difficulty: u32, miner: &str) -> Vec<Block> {
        let mut blocks = vec![Block::genesis()];
        for _ in 0..len {
            let next = mined_next(blocks.last().unwrap(), difficulty, miner);
            blocks.push(next);
        }
        blocks
    }

    #[test]
    fn work_is_exponential_in_difficulty() {
        let mut blocks = fork_from_genesis(3, 0, "m");
        // 4 blocks at difficulty 0: 4 * 2^0
        assert_eq!(cumulative_work(&blocks), 4);

        // raising one block's difficulty by 1 adds exactly 2^old
        blocks[2].difficulty += 1;
        assert_eq!(cumulative_work(&blocks), 5);

        blocks[2].difficulty = 5;
        assert_eq!(cumulative_work(&blocks), 3 + 32);
    }

    #[test]
    fn absurd_difficulty_claims_saturate_without_panicking() {
        let mut blocks = fork_from_genesis(1, 0, "m");
        blocks[1].difficulty = u32::MAX;
        assert_eq!(cumulative_work(&blocks), 1 + (1u128 << 127));

        blocks[1].difficulty = 255;
        assert_eq!(cumulative_work(&blocks), 1 + (1u128 << 127));
    }

    #[test]
    fn work_grows_with_length_at_constant_difficulty() {
        let blocks = fork_from_genesis(4, 0, "m");
        for i in 1..blocks.len() {
            assert!(cumulative_work(&blocks[..=i]) > cumulative_work(&blocks[..i]));
        }
    }

    #[test]
    fn append_keeps_ledger_in_lockstep() {
        let mut bc = Blockchain::new();
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.utxos().len(), 1);

        let block = mined_next(bc.latest_block(), 0, "alice");
        bc.append_block(block).expect("append");

        assert_eq!(bc.len(), 2);
        assert_eq!(bc.utxos().len(), 2);
        assert_eq!(bc.utxos().balance_of("alice"), COINBASE_AMOUNT as u128);
    }

    #[test]
    fn failed_append_leaves_state_untouched() {
        let mut bc = Blockchain::new();
        let mut block = mined_next(bc.latest_block(), 0, "alice");
        block.transactions[0].outputs[0].amount = COINBASE_AMOUNT * 3;
        block.hash = block.compute_hash();

        let err = bc.append_block(block).unwrap_err();
        assert!(matches!(err, ValidationError::LedgerTransition(_)));
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.utxos().len(), 1);
    }

    #[test]
    fn single_mined_block_yields_two_utxos_totalling_100() {
        let mut bc = Blockchain::new();
        let block = mined_next(bc.latest_block(), 0, "a");
        bc.append_block(block).expect("append");

        let total: u128 = bc.utxos().iter().map(|(_, o)| o.amount as u128).sum();
        assert_eq!(bc.utxos().len(), 2);
        assert_eq!(total, 100);
    }

    #[test]
    fn heavier_fork_wins_regardless_of_length() {
        let mut bc = Blockchain::new();
        let fork_x = fork_from_genesis(5, 2, "x");
        let fork_y = fork_from_genesis(5, 3, "y");
        // same length; 5 * 2^3 + 1 beats 5 * 2^2 + 1
        assert!(cumulative_work(&fork_y) > cumulative_work(&fork_x));

        assert_eq!(bc.replace_chain(fork_x.clone()), Ok(true));
        let work_before = bc.cumulative_work();

        assert_eq!(bc.replace_chain(fork_y.clone()), Ok(true));
        assert!(bc.cumulative_work() > work_before);
        assert_eq!(bc.utxos().balance_of("y"), 5 * COINBASE_AMOUNT as u128);

        // the lighter fork is valid but never re-adopted
        assert_eq!(bc.replace_chain(fork_x), Ok(false));
        assert_eq!(bc.utxos().balance_of("y"), 5 * COINBASE_AMOUNT as u128);
    }

    #[test]
    fn equal_work_keeps_the_local_chain() {
        let mut bc = Blockchain::new();
        let fork_a = fork_from_genesis(2, 1, "a");
        let fork_b = fork_from_genesis(2, 1, "b");
        assert_eq!(cumulative_work(&fork_a), cumulative_work(&fork_b));

        assert_eq!(bc.replace_chain(fork_a), Ok(true));
        assert_eq!(bc.replace_chain(fork_b), Ok(false));
        assert_eq!(bc.utxos().balance_of("a"), 2 * COINBASE_AMOUNT as u128);
        assert_eq!(bc.utxos().balance_of("b"), 0);
    }

    #[test]
    fn work_never_decreases_across_replace_attempts() {
        let mut bc = Blockchain::new();
        let before = bc.cumulative_work();

        // invalid candidate: rejected, no change
        let mut broken = fork_from_genesis(2, 0, "m");
        broken[1].nonce += 1;
        assert!(bc.replace_chain(broken).is_err());
        assert_eq!(bc.cumulative_work(), before);

        // valid and heavier: strictly more work afterwards
        assert_eq!(bc.replace_chain(fork_from_genesis(1, 1, "m")), Ok(true));
        assert!(bc.cumulative_work() > before);
    }
}
