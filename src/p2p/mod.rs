use log::info;

use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Fire-and-forget peer announcements, invoked after every successful chain
/// mutation (new head) or pool mutation. No delivery guarantee is assumed;
/// the consensus core never waits on the result.
pub trait Broadcast: Send + Sync {
    fn announce_new_head(&self, head: &Block);
    fn announce_pool(&self, transactions: &[Transaction]);
}

/// Default announcer for a standalone node: logs what would go out on the
/// wire. Actual transport plugs in behind the same trait.
pub struct LogBroadcast;

impl Broadcast for LogBroadcast {
    fn announce_new_head(&self, head: &Block) {
        info!(
            "P2P - announcing new head #{} (hash={}, diff={})",
            head.index, head.hash, head.difficulty
        );
    }

    fn announce_pool(&self, transactions: &[Transaction]) {
        info!("P2P - announcing pool ({} transactions)", transactions.len());
    }
}
