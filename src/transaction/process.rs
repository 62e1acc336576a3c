use std::collections::HashSet;

use thiserror::Error;

use super::model::Transaction;
use super::utxo::UtxoSet;
use super::COINBASE_AMOUNT;
use crate::wallet::{pubkey_to_address_hex, verify_signature_hex};

/// Why a block's transactions could not be applied to the ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction must spend at least one output")]
    NoInputs,
    #[error("duplicate input outpoint in transaction")]
    DuplicateInput,
    #[error("referenced output {0}:{1} is unknown or already spent")]
    MissingUtxo(String, u32),
    #[error("pubkey does not own the referenced output")]
    OwnershipMismatch,
    #[error("signature check failed: {0}")]
    Signature(&'static str),
    #[error("inputs total is less than outputs total")]
    Unbalanced,
    #[error("coinbase allowed only as the first transaction of a block")]
    MisplacedCoinbase,
    #[error("coinbase index marker does not match the block index")]
    CoinbaseIndex,
    #[error("coinbase must mint exactly the block subsidy")]
    CoinbaseAmount,
    #[error("txid does not match the transaction content")]
    TxidMismatch,
}

/// Validate a regular (non-coinbase) spend against a UTXO set, without
/// mutating it: inputs must exist, be owned by the signer and carry a valid
/// signature over the tx sighash, and inputs must cover outputs.
pub fn check_spend(tx: &Transaction, utxos: &UtxoSet) -> Result<(), LedgerError> {
    if tx.inputs.is_empty() {
        return Err(LedgerError::NoInputs);
    }

    let mut seen = HashSet::<(&str, u32)>::new();
    let sighash = tx.sighash();
    let mut input_sum: u128 = 0;

    for input in &tx.inputs {
        let op = &input.outpoint;
        if !seen.insert((op.txid.as_str(), op.vout)) {
            return Err(LedgerError::DuplicateInput);
        }

        let prev_out = utxos
            .get(op)
            .ok_or_else(|| LedgerError::MissingUtxo(op.txid.clone(), op.vout))?;

        let derived_addr = pubkey_to_address_hex(&input.pubkey).map_err(LedgerError::Signature)?;
        if prev_out.address != derived_addr {
            return Err(LedgerError::OwnershipMismatch);
        }

        if input.signature.is_empty() {
            return Err(LedgerError::Signature("missing signature"));
        }
        let ok = verify_signature_hex(&input.pubkey, &input.signature, sighash)
            .map_err(LedgerError::Signature)?;
        if !ok {
            return Err(LedgerError::Signature("signature does not verify"));
        }

        input_sum += prev_out.amount as u128;
    }

    if input_sum < tx.total_output_amount() {
        return Err(LedgerError::Unbalanced);
    }
    Ok(())
}

/// The ledger-transition function: apply one block's ordered transaction
/// list to a UTXO set and return the successor set.
///
/// All-or-nothing: the input set is never touched, and the first failing
/// transaction discards the whole call. Spends are applied against the
/// running set, so a double-spend inside the block surfaces as a missing
/// UTXO on the second spend.
pub fn process_transactions(
    transactions: &[Transaction],
    block_index: u64,
    utxos: &UtxoSet,
) -> Result<UtxoSet, LedgerError> {
    let mut next = utxos.clone();

    for (i, tx) in transactions.iter().enumerate() {
        // The txid keys the new outputs in the set, so it must be the
        // content hash and not an attacker-chosen string that collides with
        // a live outpoint. Block 0 is exempt: its coinbase txid is the
        // genesis literal, pinned by the structural genesis check instead.
        if block_index > 0 && tx.txid != tx.computed_txid() {
            return Err(LedgerError::TxidMismatch);
        }
        if tx.is_coinbase() {
            if i != 0 {
                return Err(LedgerError::MisplacedCoinbase);
            }
            if u64::from(tx.inputs[0].outpoint.vout) != block_index {
                return Err(LedgerError::CoinbaseIndex);
            }
            if tx.total_output_amount() != u128::from(COINBASE_AMOUNT) {
                return Err(LedgerError::CoinbaseAmount);
            }
        } else {
            check_spend(tx, &next)?;
            for input in &tx.inputs {
                next.spend(&input.outpoint);
            }
        }
        next.add_tx_outputs(tx);
    }

    Ok(next)
}
