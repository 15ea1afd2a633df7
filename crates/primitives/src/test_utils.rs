//! Synthetic transactions and an in-memory ledger for tests across the workspace.

use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;

use crate::{
    cbor::{wrap_bytes, write_head, MAJOR_ARRAY, MAJOR_MAP, MAJOR_TAG},
    ledger::{filter_by_address, Ledger, LedgerError},
    tx::tx_hash,
    types::Utxo,
};

/// Minting policy used by the fixtures.
pub const POLICY: &str = "d47ea75b975baa070978b1acd882029d2f95541d678d06bd63b4b9aa";

/// Hex asset name used by the fixtures (`HydrADA`).
pub const WRAPPED_ASSET: &str = "48796472414441";

/// Builder for minimal but well-formed transactions.
#[derive(Debug, Clone, Default)]
pub struct TxFixture {
    fee: u64,
    mint: Vec<(String, String, i64)>,
    vkeys: Vec<([u8; 32], [u8; 64])>,
    tagged_vkeys: bool,
    redeemer: Option<(Vec<u8>, bool)>,
}

impl TxFixture {
    /// Sets the fee, which changes the body and therefore the id.
    pub fn with_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Adds a mint entry.
    pub fn with_mint(mut self, policy: &str, asset_name: &str, quantity: i64) -> Self {
        self.mint
            .push((policy.to_string(), asset_name.to_string(), quantity));
        self
    }

    /// Adds a verification key witness.
    pub fn with_vkey_witness(mut self, vkey: [u8; 32], signature: [u8; 64]) -> Self {
        self.vkeys.push((vkey, signature));
        self
    }

    /// Wraps the vkey witnesses in a set tag.
    pub fn with_tagged_vkeys(mut self, tagged: bool) -> Self {
        self.tagged_vkeys = tagged;
        self
    }

    /// Sets the single redeemer's data, in list or map form.
    pub fn with_redeemer(mut self, data: Vec<u8>, map_form: bool) -> Self {
        self.redeemer = Some((data, map_form));
        self
    }

    /// Encodes the transaction.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_head(&mut out, MAJOR_ARRAY, 4);
        self.write_body(&mut out);
        self.write_witness_set(&mut out);
        out.push(0xf5); // valid
        out.push(0xf6); // no auxiliary data
        out
    }

    /// Encodes the transaction as hex.
    pub fn build_hex(&self) -> String {
        hex::encode(self.build())
    }

    fn write_body(&self, out: &mut Vec<u8>) {
        let entries = 3 + u64::from(!self.mint.is_empty());
        write_head(out, MAJOR_MAP, entries);

        // inputs, outputs, fee
        write_head(out, 0, 0);
        write_head(out, MAJOR_ARRAY, 0);
        write_head(out, 0, 1);
        write_head(out, MAJOR_ARRAY, 0);
        write_head(out, 0, 2);
        write_head(out, 0, self.fee);

        if self.mint.is_empty() {
            return;
        }

        write_head(out, 0, 9);
        let mut policies: Vec<&str> = self.mint.iter().map(|(p, _, _)| p.as_str()).collect();
        policies.dedup();
        write_head(out, MAJOR_MAP, policies.len() as u64);
        for policy in policies {
            out.extend(wrap_bytes(&hex::decode(policy).unwrap()));
            let assets: Vec<_> = self.mint.iter().filter(|(p, _, _)| p == policy).collect();
            write_head(out, MAJOR_MAP, assets.len() as u64);
            for (_, name, quantity) in assets {
                out.extend(wrap_bytes(&hex::decode(name).unwrap()));
                write_int(out, *quantity);
            }
        }
    }

    fn write_witness_set(&self, out: &mut Vec<u8>) {
        let entries = u64::from(!self.vkeys.is_empty()) + u64::from(self.redeemer.is_some());
        write_head(out, MAJOR_MAP, entries);

        if !self.vkeys.is_empty() {
            write_head(out, 0, 0);
            if self.tagged_vkeys {
                write_head(out, MAJOR_TAG, 258);
            }
            write_head(out, MAJOR_ARRAY, self.vkeys.len() as u64);
            for (vkey, sig) in &self.vkeys {
                write_head(out, MAJOR_ARRAY, 2);
                out.extend(wrap_bytes(vkey));
                out.extend(wrap_bytes(sig));
            }
        }

        if let Some((data, map_form)) = &self.redeemer {
            write_head(out, 0, 5);
            if *map_form {
                write_head(out, MAJOR_MAP, 1);
                write_head(out, MAJOR_ARRAY, 2);
                write_head(out, 0, 1); // mint
                write_head(out, 0, 0);
                write_head(out, MAJOR_ARRAY, 2);
                out.extend_from_slice(data);
                write_ex_units(out);
            } else {
                write_head(out, MAJOR_ARRAY, 1);
                write_head(out, MAJOR_ARRAY, 4);
                write_head(out, 0, 1);
                write_head(out, 0, 0);
                out.extend_from_slice(data);
                write_ex_units(out);
            }
        }
    }
}

fn write_int(out: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        write_head(out, 0, n as u64);
    } else {
        write_head(out, 1, (-1 - n) as u64);
    }
}

fn write_ex_units(out: &mut Vec<u8>) {
    write_head(out, MAJOR_ARRAY, 2);
    write_head(out, 0, 1_000);
    write_head(out, 0, 1_000_000);
}

/// An in-memory [`Ledger`] that records what is submitted to it.
#[derive(Debug, Default)]
pub struct MockLedger {
    utxos: Mutex<Vec<Utxo>>,
    submitted: Mutex<Vec<Vec<u8>>>,
    confirmed: Mutex<HashSet<String>>,
    confirm_on_submit: Mutex<bool>,
    reject_with: Mutex<Option<String>>,
}

impl MockLedger {
    /// A ledger holding `utxos`.
    pub fn with_utxos(utxos: Vec<Utxo>) -> Self {
        let ledger = Self::default();
        ledger.set_utxos(utxos);
        ledger
    }

    /// Replaces the unspent outputs.
    pub fn set_utxos(&self, utxos: Vec<Utxo>) {
        *lock(&self.utxos) = utxos;
    }

    /// Every transaction submitted so far.
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        lock(&self.submitted).clone()
    }

    /// Marks `tx_hash` confirmed.
    pub fn confirm(&self, tx_hash: &str) {
        lock(&self.confirmed).insert(tx_hash.to_string());
    }

    /// Confirms every transaction as soon as it is submitted.
    pub fn confirm_on_submit(&self, enabled: bool) {
        *lock(&self.confirm_on_submit) = enabled;
    }

    /// Rejects every submission with `reason`, or accepts them again with `None`.
    pub fn reject_with(&self, reason: Option<&str>) {
        *lock(&self.reject_with) = reason.map(str::to_string);
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn fetch_address_utxos(
        &self,
        address: &str,
        asset: Option<&str>,
    ) -> Result<Vec<Utxo>, LedgerError> {
        Ok(filter_by_address(lock(&self.utxos).iter(), address, asset))
    }

    async fn fetch_utxos_by_tx(&self, hash: &str) -> Result<Vec<Utxo>, LedgerError> {
        Ok(lock(&self.utxos)
            .iter()
            .filter(|utxo| utxo.input.tx_hash == hash)
            .cloned()
            .collect())
    }

    async fn submit_tx(&self, tx: &[u8]) -> Result<String, LedgerError> {
        if let Some(reason) = lock(&self.reject_with).clone() {
            return Err(LedgerError::Rejected(reason));
        }

        let hash = tx_hash(tx).map_err(|e| LedgerError::InvalidData(e.to_string()))?;
        lock(&self.submitted).push(tx.to_vec());
        if *lock(&self.confirm_on_submit) {
            self.confirm(&hash);
        }
        Ok(hash)
    }

    async fn is_tx_confirmed(&self, hash: &str) -> Result<bool, LedgerError> {
        Ok(lock(&self.confirmed).contains(hash))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
