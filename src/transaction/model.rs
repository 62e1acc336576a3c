use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::COINBASE_AMOUNT;
use super::utxo::OutPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    /// References a previous unspent output (UTXO).
    pub outpoint: OutPoint,
    pub pubkey: String,
    /// Hex-encoded DER ECDSA signature.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// A stable identifier computed from content.
    pub txid: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Build a transaction and compute its txid deterministically from its content.
    /// TXID includes signatures; SIGHASH (used for signing) excludes signatures/pubkeys.
    pub fn new(mut inputs: Vec<TxInput>, mut outputs: Vec<TxOutput>) -> Self {
        let txid = content_txid(&inputs, &outputs);
        Self {
            txid,
            inputs: inputs.drain(..).collect(),
            outputs: outputs.drain(..).collect(),
        }
    }

    /// Recompute the content-derived txid; equal to `txid` for any honestly
    /// built transaction. The ledger transition rejects mismatches.
    pub fn computed_txid(&self) -> String {
        content_txid(&self.inputs, &self.outputs)
    }

    /// Build the coinbase reward for a block. The single marker input carries
    /// the block index so coinbase txids stay unique across heights. The
    /// marker reuses `vout` (u32), which holds every reachable height: at
    /// one block per 10 seconds, u32::MAX is over a thousand years away.
    pub fn coinbase(miner_address: &str, block_index: u64) -> Self {
        let marker = TxInput {
            outpoint: OutPoint {
                txid: String::new(),
                vout: block_index as u32,
            },
            pubkey: String::new(),
            signature: String::new(),
        };
        Self::new(
            vec![marker],
            vec![TxOutput {
                address: miner_address.to_string(),
                amount: COINBASE_AMOUNT,
            }],
        )
    }

    /// A coinbase spends nothing: its only input is the empty-txid marker.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].outpoint.txid.is_empty()
    }

    pub fn total_output_amount(&self) -> u128 {
        self.outputs.iter().map(|o| o.amount as u128).sum()
    }

    /// Canonical signing payload (JSON) that excludes signatures and pubkeys.
    /// This is what should be hashed and signed by each input's owner.
    pub fn signing_payload(&self) -> Vec<u8> {
        // Only the outpoints (txid, vout) and outputs are included
        let lite_inputs: Vec<_> = self
            .inputs
            .iter()
            .map(|i| serde_json::json!({ "txid": i.outpoint.txid, "vout": i.outpoint.vout }))
            .collect();
        let payload = serde_json::json!({
            "inputs": lite_inputs,
            "outputs": self.outputs,
        });
        serde_json::to_vec(&payload).expect("serialize signing payload")
    }

    /// SHA-256 of the signing payload.
    pub fn sighash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_payload());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        out
    }
}

/// Deterministic content hash shared by `Transaction::new` and
/// `computed_txid`: SHA-256 over the JSON of inputs and outputs.
fn content_txid(inputs: &[TxInput], outputs: &[TxOutput]) -> String {
    let payload = serde_json::json!({
        "inputs": inputs,
        "outputs": outputs,
    });
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&payload).expect("json serialize"));
    hex::encode(hasher.finalize())
}
