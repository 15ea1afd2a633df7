//! Bech32 Cardano addresses.
//!
//! The bridge only ever constructs enterprise (payment key, no stake part) addresses, but it must
//! be able to read any address a user puts in a datum in order to reject the ones it cannot pay.

use std::{fmt, str::FromStr};

use bech32::{Bech32, Hrp};
use blake2::{digest::consts::U28, Blake2b, Digest};
use serde::{Deserialize, Serialize};

use crate::errors::AddressError;

/// Header nibble of an enterprise address whose payment part is a key hash.
const ENTERPRISE_KEY_HEADER: u8 = 0b0110;

/// The network an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Any test network (preprod, preview, local devnets).
    #[default]
    Testnet,

    /// The main network.
    Mainnet,
}

impl Network {
    /// The network id carried in the low nibble of the address header.
    pub const fn id(&self) -> u8 {
        match self {
            Network::Testnet => 0,
            Network::Mainnet => 1,
        }
    }

    /// The human readable part used for payment addresses on this network.
    pub const fn hrp(&self) -> &'static str {
        match self {
            Network::Testnet => "addr_test",
            Network::Mainnet => "addr",
        }
    }
}

/// A Cardano address as raw header + payload bytes along with its bech32 prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    hrp: Hrp,
    bytes: Vec<u8>,
}

impl Address {
    /// Builds the enterprise address controlled by the given verification key.
    pub fn enterprise_from_vkey(vkey: &[u8; 32], network: Network) -> Result<Self, AddressError> {
        Self::enterprise_from_key_hash(&key_hash(vkey), network)
    }

    /// Builds the enterprise address for a payment key hash.
    pub fn enterprise_from_key_hash(
        key_hash: &[u8; 28],
        network: Network,
    ) -> Result<Self, AddressError> {
        let mut bytes = Vec::with_capacity(29);
        bytes.push((ENTERPRISE_KEY_HEADER << 4) | network.id());
        bytes.extend_from_slice(key_hash);

        Ok(Self {
            hrp: Hrp::parse(network.hrp())?,
            bytes,
        })
    }

    /// Raw address bytes, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The address header byte.
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    /// Whether this is a simple address: an enterprise address whose payment credential is a key
    /// hash, with no script and no staking part.
    pub fn is_enterprise_key(&self) -> bool {
        self.header() >> 4 == ENTERPRISE_KEY_HEADER
    }

    /// Parses an address out of a datum payload holding its UTF-8 bech32 form.
    pub fn from_utf8_bytes(bytes: Vec<u8>) -> Result<Self, AddressError> {
        String::from_utf8(bytes)?.parse()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, bytes) = bech32::decode(s)?;
        if bytes.is_empty() {
            return Err(AddressError::Empty);
        }

        Ok(Self { hrp, bytes })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode::<Bech32>(self.hrp, &self.bytes).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

/// Computes the blake2b-224 hash of a verification key.
pub fn key_hash(vkey: &[u8; 32]) -> [u8; 28] {
    Blake2b::<U28>::digest(vkey).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VKEY: [u8; 32] = [7u8; 32];

    #[test]
    fn enterprise_address_round_trips_through_bech32() {
        let address = Address::enterprise_from_vkey(&VKEY, Network::Testnet).unwrap();
        let encoded = address.to_string();

        assert!(encoded.starts_with("addr_test1v"), "got {encoded}");
        assert_eq!(address.header(), 0x60);
        assert!(address.is_enterprise_key());

        let parsed: Address = encoded.parse().unwrap();
        assert_eq!(parsed, address);
        assert_eq!(&parsed.as_bytes()[1..], key_hash(&VKEY).as_slice());
    }

    #[test]
    fn mainnet_addresses_use_the_mainnet_prefix() {
        let address = Address::enterprise_from_vkey(&VKEY, Network::Mainnet).unwrap();
        assert_eq!(address.header(), 0x61);
        assert!(address.to_string().starts_with("addr1v"));
    }

    #[test]
    fn script_addresses_are_not_simple() {
        // script hash enterprise header (0b0111)
        let mut bytes = vec![0x70];
        bytes.extend_from_slice(&[1u8; 28]);
        let encoded = bech32::encode::<Bech32>(Hrp::parse("addr_test").unwrap(), &bytes).unwrap();

        let address: Address = encoded.parse().unwrap();
        assert!(!address.is_enterprise_key());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("not-an-address".parse::<Address>().is_err());
        assert!(Address::from_utf8_bytes(vec![0xff, 0xfe]).is_err());
    }
}
