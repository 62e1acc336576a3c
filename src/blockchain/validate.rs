use thiserror::Error;

use super::block::{Block, hash_matches_difficulty};
use crate::transaction::{LedgerError, UtxoSet, process_transactions};

/// Clock-skew tolerance for timestamp checks, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 60;

/// Why a block or candidate chain was rejected. Validation short-circuits,
/// so only the first failing check is ever reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid block structure")]
    StructuralInvalid,
    #[error("block timestamp out of range")]
    TimestampOutOfRange,
    #[error("block index does not follow its predecessor")]
    IndexMismatch,
    #[error("previous-hash link does not match predecessor")]
    LinkageMismatch,
    #[error("block hash does not match contents or difficulty")]
    HashMismatch,
    #[error("first block differs from the canonical genesis")]
    GenesisMismatch,
    #[error("ledger transition failed: {0}")]
    LedgerTransition(#[from] LedgerError),
}

/// Validate one block against its immediate predecessor. Checks run in a
/// fixed order (structure, timestamp, index, linkage, proof-of-work) and
/// the first failure wins. `now` is the validator's wall clock.
pub fn validate_new_block(new: &Block, prev: &Block, now: i64) -> Result<(), ValidationError> {
    // The type system already guarantees field shapes; what remains is that
    // a non-genesis block links somewhere and carries a well-formed digest.
    if new.prev_hash.is_none() || new.hash.len() != 64 || hex::decode(&new.hash).is_err() {
        return Err(ValidationError::StructuralInvalid);
    }
    let in_range = now + TIMESTAMP_TOLERANCE_SECS > new.timestamp
        && new.timestamp > prev.timestamp - TIMESTAMP_TOLERANCE_SECS;
    if !in_range {
        return Err(ValidationError::TimestampOutOfRange);
    }
    if new.index != prev.index + 1 {
        return Err(ValidationError::IndexMismatch);
    }
    if new.prev_hash.as_deref() != Some(prev.hash.as_str()) {
        return Err(ValidationError::LinkageMismatch);
    }
    if new.compute_hash() != new.hash || !hash_matches_difficulty(&new.hash, new.difficulty) {
        return Err(ValidationError::HashMismatch);
    }
    Ok(())
}

/// Replay a full candidate chain from genesis: structural genesis equality,
/// per-block validation against the candidate's own predecessor, and the
/// ledger-transition fold. Any failure discards the whole candidate.
/// Success yields the ledger state reached by the replay.
pub fn validate_chain(candidate: &[Block], now: i64) -> Result<UtxoSet, ValidationError> {
    if candidate.first() != Some(&Block::genesis()) {
        return Err(ValidationError::GenesisMismatch);
    }

    let mut utxos = UtxoSet::new();
    for (i, block) in candidate.iter().enumerate() {
        if i > 0 {
            validate_new_block(block, &candidate[i - 1], now)?;
        }
        utxos = process_transactions(&block.transactions, block.index, &utxos)?;
    }
    Ok(utxos)
}
