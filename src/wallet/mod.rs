use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

use crate::error::{LedgerError, Result};

/// A freshly generated key pair. The ledger address is the hex of the
/// compressed public key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private_key: String,
    pub address: String,
}

/// Generate a new secp256k1 keypair.
pub fn generate_keypair() -> KeyPair {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    KeyPair {
        private_key: hex::encode(sk.secret_bytes()),
        address: hex::encode(pk.serialize()),
    }
}

fn parse_secret_key(private_key_hex: &str) -> Result<SecretKey> {
    let bytes = hex::decode(private_key_hex.trim())
        .map_err(|_| LedgerError::InvalidKey("private key is not hex".into()))?;
    SecretKey::from_slice(&bytes)
        .map_err(|_| LedgerError::InvalidKey("private key is not a valid secp256k1 scalar".into()))
}

/// Address (hex compressed pubkey) owned by the given private key.
pub fn address_of(private_key_hex: &str) -> Result<String> {
    let sk = parse_secret_key(private_key_hex)?;
    let secp = Secp256k1::signing_only();
    let pk = PublicKey::from_secret_key(&secp, &sk);
    Ok(hex::encode(pk.serialize()))
}

/// Normalize an address. Returns lowercase compressed hex if it parses as a
/// public key.
pub fn normalize_address(address: &str) -> Option<String> {
    let bytes = hex::decode(address.trim()).ok()?;
    let pk = PublicKey::from_slice(&bytes).ok()?;
    Some(hex::encode(pk.serialize()))
}

/// Sign a 32-byte digest, returning the hex DER signature.
pub fn sign_digest_hex(private_key_hex: &str, msg32: [u8; 32]) -> Result<String> {
    let sk = parse_secret_key(private_key_hex)?;
    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest_slice(&msg32)
        .map_err(|_| LedgerError::InvalidKey("digest must be 32 bytes".into()))?;
    let sig = secp.sign_ecdsa(&msg, &sk);
    Ok(hex::encode(sig.serialize_der()))
}

/// Verify a hex DER signature against a hex public key over `msg32`.
/// Any decoding failure counts as a failed verification.
pub fn verify_signature_hex(pubkey_hex: &str, sig_hex: &str, msg32: [u8; 32]) -> bool {
    let secp = Secp256k1::verification_only();

    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        return false;
    };
    let Ok(pk_bytes) = hex::decode(pubkey_hex) else {
        return false;
    };
    let Ok(pk) = PublicKey::from_slice(&pk_bytes) else {
        return false;
    };
    let Ok(msg) = Message::from_digest_slice(&msg32) else {
        return false;
    };
    secp.verify_ecdsa(&msg, &sig, &pk).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_address_matches_private_key() {
        let kp = generate_keypair();
        assert_eq!(address_of(&kp.private_key).unwrap(), kp.address);
        assert_eq!(kp.address.len(), 66);
    }

    #[test]
    fn signature_roundtrip_and_wrong_key() {
        let alice = generate_keypair();
        let bob = generate_keypair();
        let digest = [7u8; 32];

        let sig = sign_digest_hex(&alice.private_key, digest).unwrap();
        assert!(verify_signature_hex(&alice.address, &sig, digest));
        assert!(!verify_signature_hex(&bob.address, &sig, digest));
        assert!(!verify_signature_hex(&alice.address, &sig, [8u8; 32]));
    }

    #[test]
    fn garbage_inputs_do_not_verify() {
        assert!(!verify_signature_hex("zz", "00", [0u8; 32]));
        assert!(address_of("not-hex").is_err());
        assert!(normalize_address("02abcd").is_none());
    }
}
