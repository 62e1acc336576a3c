use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use super::block::{Block, calculate_hash, hash_matches_difficulty};
use crate::transaction::Transaction;

/// Nonces tried between looks at the stop flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Proof-of-work search: try nonces from 0 upward until the canonical hash
/// meets the difficulty. Unbounded and CPU-bound; callers run it on a
/// blocking worker and may abort it through `cancel`, in which case the
/// attempt yields nothing. Any satisfying nonce qualifies.
pub fn find_block(
    index: u64,
    prev_hash: &str,
    timestamp: i64,
    transactions: &[Transaction],
    difficulty: u32,
    cancel: &AtomicBool,
) -> Option<Block> {
    let mut nonce: u64 = 0;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            debug!("MINER - search for block #{index} cancelled at nonce {nonce}");
            return None;
        }
        let hash = calculate_hash(
            index,
            Some(prev_hash),
            timestamp,
            transactions,
            difficulty,
            nonce,
        );
        if hash_matches_difficulty(&hash, difficulty) {
            return Some(Block {
                index,
                hash,
                prev_hash: Some(prev_hash.to_string()),
                timestamp,
                transactions: transactions.to_vec(),
                difficulty,
                nonce,
            });
        }
        nonce = nonce.wrapping_add(1);
    }
}

/// Tracks the stop flag of the latest mining attempt so a heavier inbound
/// chain can preempt a now-futile search. Starting a new attempt supersedes
/// (and cancels) the previous one.
#[derive(Debug, Default)]
pub struct MinerControl {
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl MinerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh attempt and return its stop flag.
    pub fn begin(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut current = self.current.lock().expect("mutex poisoned");
        if let Some(old) = current.replace(flag.clone()) {
            old.store(true, Ordering::Relaxed);
        }
        flag
    }

    /// Abort whatever attempt is in flight, if any.
    pub fn cancel_current(&self) {
        let current = self.current.lock().expect("mutex poisoned");
        if let Some(flag) = current.as_ref() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mined_block_passes_independent_recheck() {
        let txs = vec![Transaction::coinbase("miner", 1)];
        let cancel = AtomicBool::new(false);
        let block = find_block(1, "00aa", 1_700_000_000, &txs, 8, &cancel).expect("terminates");

        assert_eq!(block.index, 1);
        assert_eq!(block.prev_hash.as_deref(), Some("00aa"));
        assert_eq!(block.hash, block.compute_hash());
        assert!(hash_matches_difficulty(&block.hash, block.difficulty));
    }

    #[test]
    fn zero_difficulty_accepts_first_nonce() {
        let cancel = AtomicBool::new(false);
        let block = find_block(1, "prev", 0, &[], 0, &cancel).expect("terminates");
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn cancelled_search_returns_none() {
        let cancel = AtomicBool::new(true);
        assert!(find_block(1, "prev", 0, &[], 32, &cancel).is_none());
    }

    #[test]
    fn new_attempt_supersedes_previous_one() {
        let ctl = MinerControl::new();
        let first = ctl.begin();
        assert!(!first.load(Ordering::Relaxed));

        let second = ctl.begin();
        assert!(first.load(Ordering::Relaxed), "old attempt aborted");
        assert!(!second.load(Ordering::Relaxed));

        ctl.cancel_current();
        assert!(second.load(Ordering::Relaxed));
    }
}
