use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

use crate::transaction::{OutPoint, Transaction, TxInput, TxOutput, UtxoSet};

/// Generate a new secp256k1 keypair and return (priv_hex, pub_hex_compressed, address_hex).
/// Address is simply the hex of the compressed public key (didactic).
pub fn generate_keypair_hex() -> (String, String, String) {
    let secp = Secp256k1::new(); // context with All capabilities
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    let sk_hex = hex::encode(sk.secret_bytes());
    let pk_hex = hex::encode(pk.serialize()); // compressed (33 bytes)
    let address = pk_hex.clone();
    (sk_hex, pk_hex, address)
}

/// Derive address (hex of compressed pubkey) from a given hex pubkey.
/// Returns normalized hex (lowercase) if valid.
pub fn pubkey_to_address_hex(pubkey_hex: &str) -> Result<String, &'static str> {
    let bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&bytes).map_err(|_| "invalid pubkey bytes")?;
    Ok(hex::encode(pk.serialize()))
}

/// Verify a signature (hex DER) against the given pubkey (hex, compressed) and message hash (32 bytes).
pub fn verify_signature_hex(
    pubkey_hex: &str,
    sig_hex: &str,
    msg32: [u8; 32],
) -> Result<bool, &'static str> {
    // Verification-only context is enough here
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_der(&sig_bytes).map_err(|_| "invalid DER signature")?;

    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = Message::from_slice(&msg32).map_err(|_| "invalid message length")?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// Sign a 32-byte message hash with a hex private key, returning the DER
/// signature as hex.
pub fn sign_hash_hex(privkey_hex: &str, msg32: [u8; 32]) -> Result<String, &'static str> {
    let secp = Secp256k1::signing_only();
    let sk_bytes = hex::decode(privkey_hex).map_err(|_| "invalid private key hex")?;
    let sk = SecretKey::from_slice(&sk_bytes).map_err(|_| "invalid private key bytes")?;
    let msg = Message::from_slice(&msg32).map_err(|_| "invalid message length")?;
    let sig = secp.sign_ecdsa(&msg, &sk);
    Ok(hex::encode(sig.serialize_der()))
}

/// Build a fully signed spend of `amount` units to `to_address`, selecting
/// the sender's UTXOs deterministically and returning any change to the
/// sender. The sender is whoever owns `privkey_hex`.
pub fn create_signed_tx(
    privkey_hex: &str,
    to_address: &str,
    amount: u64,
    utxos: &UtxoSet,
) -> Result<Transaction, &'static str> {
    if amount == 0 {
        return Err("amount must be > 0");
    }

    let secp = Secp256k1::new();
    let sk_bytes = hex::decode(privkey_hex).map_err(|_| "invalid private key hex")?;
    let sk = SecretKey::from_slice(&sk_bytes).map_err(|_| "invalid private key bytes")?;
    let pk_hex = hex::encode(PublicKey::from_secret_key(&secp, &sk).serialize());
    let own_address = pk_hex.clone();

    // Deterministic selection: own outputs sorted by (txid, vout)
    let mut owned: Vec<(OutPoint, u64)> = utxos
        .iter()
        .filter(|(_, out)| out.address == own_address)
        .map(|(op, out)| (op.clone(), out.amount))
        .collect();
    owned.sort_by(|a, b| (&a.0.txid, a.0.vout).cmp(&(&b.0.txid, b.0.vout)));

    let mut selected: Vec<OutPoint> = Vec::new();
    let mut total: u64 = 0;
    for (op, value) in owned {
        selected.push(op);
        total = total.saturating_add(value);
        if total >= amount {
            break;
        }
    }
    if total < amount {
        return Err("insufficient funds for transaction");
    }

    let mut outputs = vec![TxOutput {
        address: to_address.to_string(),
        amount,
    }];
    let change = total - amount;
    if change > 0 {
        outputs.push(TxOutput {
            address: own_address,
            amount: change,
        });
    }

    let inputs: Vec<TxInput> = selected
        .into_iter()
        .map(|outpoint| TxInput {
            outpoint,
            pubkey: pk_hex.clone(),
            signature: String::new(),
        })
        .collect();

    // The sighash excludes signatures, so signing the unsigned form is stable.
    let unsigned = Transaction::new(inputs, outputs.clone());
    let sig_hex = sign_hash_hex(privkey_hex, unsigned.sighash())?;
    let signed_inputs = unsigned
        .inputs
        .into_iter()
        .map(|input| TxInput {
            signature: sig_hex.clone(),
            ..input
        })
        .collect();

    Ok(Transaction::new(signed_inputs, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxOutput;
    use sha2::{Digest, Sha256};

    fn digest(data: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(data));
        out
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (sk, pk, addr) = generate_keypair_hex();
        assert_eq!(pk, addr);

        let msg = digest(b"hello");
        let sig = sign_hash_hex(&sk, msg).expect("sign");
        assert!(verify_signature_hex(&pk, &sig, msg).expect("verify"));

        // wrong message
        assert!(!verify_signature_hex(&pk, &sig, digest(b"other")).expect("verify"));
    }

    #[test]
    fn create_signed_tx_selects_enough_and_returns_change() {
        let (sk, _pk, addr) = generate_keypair_hex();
        let mut utxos = UtxoSet::new();
        for (i, amount) in [30u64, 25, 10].into_iter().enumerate() {
            utxos.insert(
                OutPoint {
                    txid: format!("{:064}", i),
                    vout: 0,
                },
                TxOutput {
                    address: addr.clone(),
                    amount,
                },
            );
        }

        let tx = create_signed_tx(&sk, "dest", 40, &utxos).expect("build");
        assert_eq!(tx.inputs.len(), 2, "30 + 25 covers 40");
        let paid: u64 = tx
            .outputs
            .iter()
            .filter(|o| o.address == "dest")
            .map(|o| o.amount)
            .sum();
        let change: u64 = tx
            .outputs
            .iter()
            .filter(|o| o.address == addr)
            .map(|o| o.amount)
            .sum();
        assert_eq!(paid, 40);
        assert_eq!(change, 15);
    }

    #[test]
    fn create_signed_tx_rejects_overdraft_and_zero() {
        let (sk, _pk, addr) = generate_keypair_hex();
        let mut utxos = UtxoSet::new();
        utxos.insert(
            OutPoint {
                txid: "0".repeat(64),
                vout: 0,
            },
            TxOutput {
                address: addr,
                amount: 5,
            },
        );
        assert_eq!(
            create_signed_tx(&sk, "dest", 6, &utxos).unwrap_err(),
            "insufficient funds for transaction"
        );
        assert_eq!(
            create_signed_tx(&sk, "dest", 0, &utxos).unwrap_err(),
            "amount must be > 0"
        );
    }
}
