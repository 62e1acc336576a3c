use log::debug;
use thiserror::Error;

use super::model::Transaction;
use super::process::{LedgerError, check_spend};
use super::utxo::UtxoSet;

/// Why a transaction was refused entry into the pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("coinbase transactions are not accepted into the pool")]
    Coinbase,
    #[error("input {0}:{1} conflicts with a pooled transaction")]
    Conflict(String, u32),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Ordered set of not-yet-mined transactions, validated on entry against the
/// current ledger state and pruned after every chain mutation.
#[derive(Debug, Default)]
pub struct TransactionPool {
    txs: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self { txs: Vec::new() }
    }

    /// Validate and admit a transaction. Rejects coinbase-style entries,
    /// anything not spendable against `utxos`, and spends of outpoints
    /// already claimed by a pooled transaction.
    pub fn add(&mut self, tx: Transaction, utxos: &UtxoSet) -> Result<(), PoolError> {
        if tx.is_coinbase() {
            return Err(PoolError::Coinbase);
        }
        // a forged txid would only fail at block apply; refuse it here
        if tx.txid != tx.computed_txid() {
            return Err(PoolError::Ledger(LedgerError::TxidMismatch));
        }
        check_spend(&tx, utxos)?;
        for input in &tx.inputs {
            let taken = self
                .txs
                .iter()
                .flat_map(|t| t.inputs.iter())
                .any(|i| i.outpoint == input.outpoint);
            if taken {
                return Err(PoolError::Conflict(
                    input.outpoint.txid.clone(),
                    input.outpoint.vout,
                ));
            }
        }
        debug!("POOL - admitted txid={} (size now {})", tx.txid, self.txs.len() + 1);
        self.txs.push(tx);
        Ok(())
    }

    /// Ordered snapshot of the pool contents.
    pub fn transactions(&self) -> &[Transaction] {
        &self.txs
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Drop every transaction referencing an input no longer in `utxos`.
    /// Called after append/replace so mined or orphaned spends leave the
    /// pool. Returns how many entries were evicted.
    pub fn prune(&mut self, utxos: &UtxoSet) -> usize {
        let before = self.txs.len();
        self.txs
            .retain(|tx| tx.inputs.iter().all(|i| utxos.contains(&i.outpoint)));
        let removed = before - self.txs.len();
        if removed > 0 {
            debug!("POOL - pruned {removed} stale transactions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{OutPoint, TxOutput};
    use crate::wallet::{create_signed_tx, generate_keypair_hex};

    fn funded(address: &str, amount: u64) -> UtxoSet {
        let mut set = UtxoSet::new();
        set.insert(
            OutPoint {
                txid: "a".repeat(64),
                vout: 0,
            },
            TxOutput {
                address: address.to_string(),
                amount,
            },
        );
        set
    }

    #[test]
    fn admits_valid_and_rejects_conflicting_spend() {
        let (sk, _pk, addr) = generate_keypair_hex();
        let set = funded(&addr, 50);
        let mut pool = TransactionPool::new();

        let tx = create_signed_tx(&sk, "x", 10, &set).expect("tx");
        pool.add(tx, &set).expect("first spend admitted");

        // second spend of the same outpoint
        let rival = create_signed_tx(&sk, "y", 10, &set).expect("tx");
        let err = pool.add(rival, &set).unwrap_err();
        assert!(matches!(err, PoolError::Conflict(_, _)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn rejects_coinbase_and_unknown_inputs() {
        let set = UtxoSet::new();
        let mut pool = TransactionPool::new();
        assert_eq!(
            pool.add(Transaction::coinbase("m", 1), &set).unwrap_err(),
            PoolError::Coinbase
        );

        let (sk, _pk, addr) = generate_keypair_hex();
        let funded_set = funded(&addr, 50);
        let tx = create_signed_tx(&sk, "x", 10, &funded_set).expect("tx");
        // validated against an empty set instead
        assert!(matches!(
            pool.add(tx, &set).unwrap_err(),
            PoolError::Ledger(LedgerError::MissingUtxo(_, _))
        ));
    }

    #[test]
    fn rejects_transaction_with_rewritten_txid() {
        let (sk, _pk, addr) = generate_keypair_hex();
        let set = funded(&addr, 50);
        let mut pool = TransactionPool::new();

        let mut tx = create_signed_tx(&sk, "x", 10, &set).expect("tx");
        tx.txid = "b".repeat(64);
        assert_eq!(
            pool.add(tx, &set).unwrap_err(),
            PoolError::Ledger(LedgerError::TxidMismatch)
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn prune_drops_spent_entries() {
        let (sk, _pk, addr) = generate_keypair_hex();
        let set = funded(&addr, 50);
        let mut pool = TransactionPool::new();
        let tx = create_signed_tx(&sk, "x", 10, &set).expect("tx");
        pool.add(tx, &set).expect("admitted");

        // funding output disappears (mined elsewhere)
        assert_eq!(pool.prune(&UtxoSet::new()), 1);
        assert!(pool.is_empty());

        // nothing to prune on a fresh pass
        assert_eq!(pool.prune(&set), 0);
    }
}
