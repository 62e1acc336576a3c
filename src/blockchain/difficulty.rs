use super::block::Block;
use super::{BLOCK_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL};

/// Difficulty the next block must satisfy. Retargets only when the head
/// sits exactly on a positive multiple of the adjustment interval;
/// otherwise the head's stored difficulty carries forward.
pub fn next_difficulty(chain: &[Block]) -> u32 {
    let head = chain.last().expect("chain holds at least genesis");
    if head.index != 0 && head.index % DIFFICULTY_ADJUSTMENT_INTERVAL == 0 {
        adjusted_difficulty(chain, head)
    } else {
        head.difficulty
    }
}

/// Compare how long the closing interval actually took against the target.
/// Under half the expected time bumps difficulty, over double lowers it
/// (never below zero). The baseline is the difficulty of the block that
/// started the interval, not the head's.
fn adjusted_difficulty(chain: &[Block], head: &Block) -> u32 {
    // Validated chains are indexed contiguously from genesis, so the block
    // that opened the interval sits at position head.index - interval.
    let anchor = &chain[(head.index - DIFFICULTY_ADJUSTMENT_INTERVAL) as usize];
    let expected = BLOCK_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
    let taken = head.timestamp - anchor.timestamp;

    if taken < expected / 2 {
        anchor.difficulty + 1
    } else if taken > expected * 2 {
        anchor.difficulty.saturating_sub(1)
    } else {
        anchor.difficulty
    }
}
