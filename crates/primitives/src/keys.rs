//! Ed25519 payment keys.

use std::{fmt, str::FromStr};

use ed25519_dalek::{Signer, SigningKey};

use crate::{
    address::{key_hash, Address, Network},
    errors::{AddressError, KeyError},
};

/// Prefix of a 32-byte key serialized as a CBOR byte string, as written by `cardano-cli`.
const CBOR_KEY_PREFIX: &str = "5820";

/// A payment signing key.
///
/// Accepts either 32 raw bytes in hex or the `cardano-cli` text-envelope form (`5820` followed by
/// the key).
#[derive(Clone)]
pub struct PaymentKey {
    inner: SigningKey,
}

impl PaymentKey {
    /// Creates a key from its 32-byte seed.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: SigningKey::from_bytes(bytes),
        }
    }

    /// The verification key bytes.
    pub fn vkey(&self) -> [u8; 32] {
        self.inner.verifying_key().to_bytes()
    }

    /// The blake2b-224 hash of the verification key.
    pub fn key_hash(&self) -> [u8; 28] {
        key_hash(&self.vkey())
    }

    /// The enterprise address controlled by this key.
    pub fn enterprise_address(&self, network: Network) -> Result<Address, AddressError> {
        Address::enterprise_from_vkey(&self.vkey(), network)
    }

    /// Signs `msg`, returning the 64-byte signature.
    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        self.inner.sign(msg).to_bytes()
    }
}

impl FromStr for PaymentKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = match s.strip_prefix(CBOR_KEY_PREFIX) {
            Some(rest) if rest.len() == 64 => rest,
            _ => s,
        };

        let bytes = hex::decode(raw)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Length(bytes.len()))?;

        Ok(Self::from_bytes(&seed))
    }
}

impl fmt::Debug for PaymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentKey")
            .field("vkey", &hex::encode(self.vkey()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    use super::*;

    const SEED: &str = "09ed97acc546fc5d85b28eb02e49e0f6d01de5f85da316eae83847c1a218ce45";

    #[test]
    fn parses_plain_and_cbor_wrapped_keys() {
        let plain: PaymentKey = SEED.parse().unwrap();
        let wrapped: PaymentKey = format!("5820{SEED}").parse().unwrap();

        assert_eq!(plain.vkey(), wrapped.vkey());
    }

    #[test]
    fn rejects_short_keys() {
        assert!(matches!(
            "abcd".parse::<PaymentKey>(),
            Err(KeyError::Length(2))
        ));
        assert!("xyz".parse::<PaymentKey>().is_err());
    }

    #[test]
    fn signatures_verify_against_vkey() {
        let key: PaymentKey = SEED.parse().unwrap();
        let sig = key.sign(b"tx body hash");

        let vk = VerifyingKey::from_bytes(&key.vkey()).unwrap();
        vk.verify(b"tx body hash", &Signature::from_bytes(&sig))
            .unwrap();
    }

    #[test]
    fn debug_does_not_leak_the_seed() {
        let key: PaymentKey = SEED.parse().unwrap();
        assert!(!format!("{key:?}").contains(SEED));
    }
}
