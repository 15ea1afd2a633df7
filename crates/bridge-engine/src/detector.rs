//! Turns ledger activity into new bridge operations.
//!
//! Both detectors are pure: they look at one output or one transaction and say whether it asks
//! the bridge to do something. Deduplication against recorded operations is the caller's job.

use hydra_bridge_primitives::{
    address::{Address, Network},
    cbor::decode_bytes_datum,
    errors::{AddressError, CborError},
    operation::{LedgerKind, NewBridgeOperation},
    tx::Transaction,
    types::{Asset, Utxo},
};
use thiserror::Error;

use crate::config::WrappedAsset;

/// Why an L1 output is not a deposit.
#[derive(Debug, Error)]
pub enum InvalidDeposit {
    /// No inline datum to read the destination from.
    #[error("no inline datum")]
    NoDatum,

    /// The datum is not a byte string.
    #[error("datum: {0}")]
    Datum(#[from] CborError),

    /// The datum does not hold a bech32 address.
    #[error("destination: {0}")]
    Destination(#[from] AddressError),

    /// The destination is a script or carries a staking part.
    #[error("destination {0} is not a payment key address")]
    NotSimpleAddress(String),

    /// The output holds something other than lovelace.
    #[error("output holds {0}, only lovelace is bridged")]
    NonLovelace(String),
}

/// Why a head transaction burning the wrapped asset cannot be released.
#[derive(Debug, Error)]
pub enum InvalidBurn {
    /// The transaction could not be inspected.
    #[error("transaction: {0}")]
    Cbor(#[from] CborError),

    /// No verification key witness identifies the sender.
    #[error("no vkey witness")]
    NoWitness,

    /// No redeemer carries the destination.
    #[error("no redeemer")]
    NoRedeemer,

    /// An address could not be built or parsed.
    #[error("address: {0}")]
    Address(#[from] AddressError),
}

/// Reads the destination address out of a hex bytes datum holding its UTF-8 bech32 form.
fn datum_address(datum: &[u8]) -> Result<Address, InvalidDeposit> {
    Ok(Address::from_utf8_bytes(decode_bytes_datum(datum)?)?)
}

/// Checks an output reported at the bridge address and describes the mint it asks for.
pub fn detect_deposit(utxo: &Utxo) -> Result<NewBridgeOperation, InvalidDeposit> {
    let datum = utxo
        .output
        .inline_datum
        .as_deref()
        .ok_or(InvalidDeposit::NoDatum)?;
    let datum = hex::decode(datum).map_err(CborError::from)?;

    let destination = datum_address(&datum)?;
    if !destination.is_enterprise_key() {
        return Err(InvalidDeposit::NotSimpleAddress(destination.to_string()));
    }

    if let Some(asset) = utxo.output.amount.iter().find(|a| !a.is_lovelace()) {
        return Err(InvalidDeposit::NonLovelace(asset.unit.clone()));
    }

    Ok(NewBridgeOperation {
        origin: LedgerKind::Cardano,
        origin_address: utxo.output.address.clone(),
        origin_tx_hash: utxo.input.tx_hash.clone(),
        origin_output_index: utxo.input.output_index,
        amount: utxo.output.amount.clone(),
        destination_address: destination.to_string(),
    })
}

/// Checks a transaction applied in the head for a burn of the wrapped asset.
///
/// Returns `Ok(None)` for transactions that do not burn it.
pub fn detect_burn(
    tx: &Transaction,
    wrapped: &WrappedAsset,
    network: Network,
) -> Result<Option<NewBridgeOperation>, InvalidBurn> {
    let quantity = tx.mint_quantity(&wrapped.policy_id, &wrapped.asset_name)?;
    if quantity >= 0 {
        return Ok(None);
    }

    let vkey = tx.first_vkey()?.ok_or(InvalidBurn::NoWitness)?;
    let sender = Address::enterprise_from_vkey(&vkey, network)?;

    let redeemer = tx.first_redeemer_data()?.ok_or(InvalidBurn::NoRedeemer)?;
    let destination = Address::from_utf8_bytes(decode_bytes_datum(&redeemer)?)?;

    Ok(Some(NewBridgeOperation {
        origin: LedgerKind::Hydra,
        origin_address: sender.to_string(),
        origin_tx_hash: tx.hash(),
        origin_output_index: 0,
        amount: vec![Asset::lovelace(quantity.unsigned_abs())],
        destination_address: destination.to_string(),
    }))
}
