use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transaction::{COINBASE_AMOUNT, OutPoint, Transaction, TxInput, TxOutput};

/// Hard-coded genesis constants. These are part of the wire-compatibility
/// surface: every conforming node carries the same literals.
pub const GENESIS_HASH: &str = "816534932c2b7154836da6afc367695e6337db8a921823784c14378abed4f7d7";
pub const GENESIS_TX_ID: &str = "b4cd43dcf8ae6f51316d388ded308ff99ead8c2e1fc1e2e1247475e058b6b1d7";
pub const GENESIS_ADDRESS: &str =
    "4e64c77bac3408cd916d0ce4fea383df2c56954e22e88d2859dca5e2e4187d49";
pub const GENESIS_TIMESTAMP: i64 = 1664476570;

/// A single block in the chain. `prev_hash` is None only for genesis.
/// Equality is structural over all fields, nested transactions included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub hash: String,
    pub prev_hash: Option<String>,
    pub timestamp: i64, // Unix timestamp (UTC seconds)
    pub transactions: Vec<Transaction>,
    pub difficulty: u32,
    pub nonce: u64,
}

impl Block {
    /// The canonical genesis block. Never mutated, never replaced; its hash
    /// and coinbase transaction are fixed literals rather than recomputed.
    pub fn genesis() -> Self {
        let coinbase = Transaction {
            txid: GENESIS_TX_ID.to_string(),
            inputs: vec![TxInput {
                outpoint: OutPoint {
                    txid: String::new(),
                    vout: 0,
                },
                pubkey: String::new(),
                signature: String::new(),
            }],
            outputs: vec![TxOutput {
                address: GENESIS_ADDRESS.to_string(),
                amount: COINBASE_AMOUNT,
            }],
        };
        Self {
            index: 0,
            hash: GENESIS_HASH.to_string(),
            prev_hash: None,
            timestamp: GENESIS_TIMESTAMP,
            transactions: vec![coinbase],
            difficulty: 0,
            nonce: 0,
        }
    }

    /// Recompute the canonical hash of this block's contents
    /// (excluding the cached `hash` field itself).
    pub fn compute_hash(&self) -> String {
        calculate_hash(
            self.index,
            self.prev_hash.as_deref(),
            self.timestamp,
            &self.transactions,
            self.difficulty,
            self.nonce,
        )
    }
}

/// Canonical SHA-256 over a block's fixed-order field encoding. Transactions
/// are serialized deterministically as JSON (struct declaration order), so
/// any two nodes hashing the same logical block agree bit-for-bit.
pub fn calculate_hash(
    index: u64,
    prev_hash: Option<&str>,
    timestamp: i64,
    transactions: &[Transaction],
    difficulty: u32,
    nonce: u64,
) -> String {
    let txs_json = serde_json::to_string(transactions).expect("serialize txs");
    let preimage = format!(
        "{}:{}:{}:{}:{}:{}",
        index,
        prev_hash.unwrap_or(""),
        timestamp,
        txs_json,
        difficulty,
        nonce
    );
    let mut hasher = Sha256::new();
    hasher.update(preimage.as_bytes());
    hex::encode(hasher.finalize())
}

/// Does the hash start with `difficulty` zero bits?
///
/// Counted over the digest's full 256-bit width: the hex digest is decoded
/// to bytes and leading zero bits are counted byte by byte. A malformed hex
/// string never satisfies any difficulty.
pub fn hash_matches_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    let Ok(bytes) = hex::decode(hash_hex) else {
        return false;
    };
    let mut zeros: u32 = 0;
    for byte in bytes {
        if byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
        if zeros >= difficulty {
            return true;
        }
    }
    zeros >= difficulty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_carries_reference_literals() {
        let g = Block::genesis();
        assert_eq!(g.index, 0);
        assert_eq!(g.hash, GENESIS_HASH);
        assert!(g.prev_hash.is_none());
        assert_eq!(g.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(g.difficulty, 0);
        assert_eq!(g.transactions.len(), 1);
        assert_eq!(g.transactions[0].txid, GENESIS_TX_ID);
        assert_eq!(g.transactions[0].outputs[0].amount, COINBASE_AMOUNT);
        assert_eq!(g, Block::genesis(), "structural equality");
    }

    #[test]
    fn hash_is_deterministic_and_nonce_sensitive() {
        let txs = vec![Transaction::coinbase("miner", 1)];
        let a = calculate_hash(1, Some(GENESIS_HASH), 1_700_000_000, &txs, 2, 9);
        let b = calculate_hash(1, Some(GENESIS_HASH), 1_700_000_000, &txs, 2, 9);
        let c = calculate_hash(1, Some(GENESIS_HASH), 1_700_000_000, &txs, 2, 10);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn tampering_with_a_transaction_changes_the_hash() {
        let mut block = Block::genesis();
        let before = block.compute_hash();
        block.transactions[0].outputs[0].amount += 1;
        assert_ne!(before, block.compute_hash());
    }

    #[test]
    fn difficulty_counts_bits_over_the_full_digest_width() {
        let tail = "f".repeat(62);

        // 0x7f.. = 0111…, exactly one leading zero bit. A conversion that
        // strips natural leading zeros would miss it.
        let one_zero_bit = format!("7f{tail}");
        assert!(hash_matches_difficulty(&one_zero_bit, 0));
        assert!(hash_matches_difficulty(&one_zero_bit, 1));
        assert!(!hash_matches_difficulty(&one_zero_bit, 2));

        // 0x00 0xff.. = exactly eight leading zero bits.
        let eight_zero_bits = format!("00{tail}");
        assert!(hash_matches_difficulty(&eight_zero_bits, 8));
        assert!(!hash_matches_difficulty(&eight_zero_bits, 9));

        // 0x0f.. = four leading zero bits.
        let four_zero_bits = format!("0f{tail}");
        assert!(hash_matches_difficulty(&four_zero_bits, 4));
        assert!(!hash_matches_difficulty(&four_zero_bits, 5));

        // the all-zero digest satisfies the whole width, nothing beyond it
        let all_zero = "0".repeat(64);
        assert!(hash_matches_difficulty(&all_zero, 256));
        assert!(!hash_matches_difficulty(&all_zero, 257));

        assert!(!hash_matches_difficulty("not hex", 0));
    }
}
