//! Read-mostly view over a CBOR-encoded Cardano transaction.
//!
//! Only the handful of fields the bridge inspects are decoded: the body hash, the mint field, the
//! verification-key witnesses and the first redeemer. Everything else is kept as raw bytes so that
//! adding a signature never changes the body bytes and thus never changes the transaction id.

use std::ops::Range;

use blake2::{digest::consts::U32, Blake2b, Digest};
use minicbor::{data::Type, Decoder};

use crate::{
    cbor::{wrap_bytes, write_head, MAJOR_ARRAY, MAJOR_MAP, MAJOR_TAG},
    errors::CborError,
    keys::PaymentKey,
};

/// Transaction body key holding the mint field.
const BODY_MINT_KEY: u64 = 9;

/// Witness set key holding the verification key witnesses.
const WITNESS_VKEYS_KEY: u64 = 0;

/// Witness set key holding the redeemers.
const WITNESS_REDEEMERS_KEY: u64 = 5;

/// CBOR tag for sets.
const SET_TAG: u64 = 258;

/// One entry of a transaction's mint field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEntry {
    /// Hex minting policy id.
    pub policy_id: String,

    /// Hex asset name.
    pub asset_name: String,

    /// Quantity minted, negative when burning.
    pub quantity: i64,
}

/// A verification key witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VkeyWitness {
    /// Ed25519 verification key.
    pub vkey: [u8; 32],

    /// Signature over the transaction id.
    pub signature: Vec<u8>,
}

/// A decoded transaction envelope.
#[derive(Debug, Clone)]
pub struct Transaction {
    raw: Vec<u8>,
    len: u64,
    body: Range<usize>,
    witness_set: Range<usize>,
    rest: Range<usize>,
}

impl Transaction {
    /// Splits `raw` into its top-level parts.
    pub fn decode(raw: Vec<u8>) -> Result<Self, CborError> {
        let (len, body, witness_set, rest) = {
            let mut d = Decoder::new(&raw);
            let len = d
                .array()?
                .ok_or(CborError::Indefinite("transaction"))?;
            if len < 2 {
                return Err(CborError::malformed(
                    "transaction",
                    format!("expected at least 2 elements, found {len}"),
                ));
            }

            let body_start = d.position();
            d.skip()?;
            let body = body_start..d.position();

            d.skip()?;
            let witness_set = body.end..d.position();

            for _ in 2..len {
                d.skip()?;
            }
            let rest = witness_set.end..d.position();

            if rest.end != raw.len() {
                return Err(CborError::malformed(
                    "transaction",
                    format!("{} trailing bytes", raw.len() - rest.end),
                ));
            }

            (len, body, witness_set, rest)
        };

        Ok(Self {
            raw,
            len,
            body,
            witness_set,
            rest,
        })
    }

    /// Decodes a transaction from hex.
    pub fn from_hex(s: &str) -> Result<Self, CborError> {
        Self::decode(hex::decode(s)?)
    }

    /// The full transaction bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Consumes the view and returns the transaction bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }

    /// The raw body bytes, exactly as they appear in the transaction.
    pub fn body_bytes(&self) -> &[u8] {
        &self.raw[self.body.clone()]
    }

    fn witness_bytes(&self) -> &[u8] {
        &self.raw[self.witness_set.clone()]
    }

    /// Blake2b-256 of the body bytes.
    pub fn id(&self) -> [u8; 32] {
        Blake2b::<U32>::digest(self.body_bytes()).into()
    }

    /// Hex transaction id.
    pub fn hash(&self) -> String {
        hex::encode(self.id())
    }

    /// All entries of the mint field, in encoding order.
    pub fn mint(&self) -> Result<Vec<MintEntry>, CborError> {
        let mut d = Decoder::new(self.body_bytes());
        let entries = d
            .map()?
            .ok_or(CborError::Indefinite("transaction body"))?;

        for _ in 0..entries {
            if d.u64()? != BODY_MINT_KEY {
                d.skip()?;
                continue;
            }

            return decode_multiasset(&mut d);
        }

        Ok(Vec::new())
    }

    /// Net quantity minted of the given asset, negative when it is burned.
    pub fn mint_quantity(&self, policy_id: &str, asset_name: &str) -> Result<i64, CborError> {
        Ok(self
            .mint()?
            .iter()
            .filter(|entry| {
                entry.policy_id.eq_ignore_ascii_case(policy_id)
                    && entry.asset_name.eq_ignore_ascii_case(asset_name)
            })
            .map(|entry| entry.quantity)
            .sum())
    }

    /// All verification-key witnesses, in encoding order.
    pub fn vkey_witnesses(&self) -> Result<Vec<VkeyWitness>, CborError> {
        let ws = self.witness_bytes();
        let Some(span) = find_witness_entry(ws, WITNESS_VKEYS_KEY)? else {
            return Ok(Vec::new());
        };

        let mut d = Decoder::new(&ws[span]);
        skip_set_tag(&mut d)?;
        let count = d
            .array()?
            .ok_or(CborError::Indefinite("vkey witnesses"))?;

        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if d.array()? != Some(2) {
                return Err(CborError::malformed("vkey witness", "expected a pair"));
            }

            let vkey: [u8; 32] = d
                .bytes()?
                .try_into()
                .map_err(|_| CborError::malformed("vkey witness", "vkey is not 32 bytes"))?;
            let signature = d.bytes()?.to_vec();
            out.push(VkeyWitness { vkey, signature });
        }

        Ok(out)
    }

    /// The verification key of the first witness, if any.
    pub fn first_vkey(&self) -> Result<Option<[u8; 32]>, CborError> {
        Ok(self.vkey_witnesses()?.first().map(|w| w.vkey))
    }

    /// Raw CBOR of the data attached to the first redeemer, if any.
    ///
    /// Both the legacy list form and the map form keyed by `[tag, index]` are accepted.
    pub fn first_redeemer_data(&self) -> Result<Option<Vec<u8>>, CborError> {
        let ws = self.witness_bytes();
        let Some(span) = find_witness_entry(ws, WITNESS_REDEEMERS_KEY)? else {
            return Ok(None);
        };

        let redeemers = &ws[span];
        let mut d = Decoder::new(redeemers);
        match d.datatype()? {
            Type::Array => {
                if d.array()? == Some(0) {
                    return Ok(None);
                }
                // [tag, index, data, ex_units]
                d.array()?;
                d.skip()?;
                d.skip()?;
            }
            Type::Map => {
                if d.map()? == Some(0) {
                    return Ok(None);
                }
                // [tag, index] => [data, ex_units]
                d.skip()?;
                d.array()?;
            }
            other => {
                return Err(CborError::malformed(
                    "redeemers",
                    format!("unexpected {other:?}"),
                ))
            }
        }

        let start = d.position();
        d.skip()?;
        Ok(Some(redeemers[start..d.position()].to_vec()))
    }

    /// Returns the transaction bytes with a witness for `key` added to the witness set.
    ///
    /// The body bytes are copied verbatim. Signing twice with the same key is a no-op.
    pub fn sign(&self, key: &PaymentKey) -> Result<Vec<u8>, CborError> {
        let vkey = key.vkey();
        if self.vkey_witnesses()?.iter().any(|w| w.vkey == vkey) {
            return Ok(self.raw.clone());
        }

        let signature = key.sign(&self.id());
        let witness_set = self.witness_set_with(&vkey, &signature)?;

        let mut out = Vec::with_capacity(self.raw.len() + 110);
        write_head(&mut out, MAJOR_ARRAY, self.len);
        out.extend_from_slice(self.body_bytes());
        out.extend_from_slice(&witness_set);
        out.extend_from_slice(&self.raw[self.rest.clone()]);
        Ok(out)
    }

    fn witness_set_with(&self, vkey: &[u8; 32], signature: &[u8]) -> Result<Vec<u8>, CborError> {
        let ws = self.witness_bytes();
        let entries = witness_entries(ws)?;

        let mut new_witness = Vec::with_capacity(101);
        write_head(&mut new_witness, MAJOR_ARRAY, 2);
        new_witness.extend_from_slice(&wrap_bytes(vkey));
        new_witness.extend_from_slice(&wrap_bytes(signature));

        let has_vkeys = entries.iter().any(|(k, _)| *k == WITNESS_VKEYS_KEY);
        let mut out = Vec::with_capacity(ws.len() + new_witness.len() + 4);
        write_head(
            &mut out,
            MAJOR_MAP,
            entries.len() as u64 + u64::from(!has_vkeys),
        );

        if !has_vkeys {
            write_head(&mut out, 0, WITNESS_VKEYS_KEY);
            write_head(&mut out, MAJOR_ARRAY, 1);
            out.extend_from_slice(&new_witness);
        }

        for (key, span) in entries {
            write_head(&mut out, 0, key);
            if key != WITNESS_VKEYS_KEY {
                out.extend_from_slice(&ws[span]);
                continue;
            }

            let existing = &ws[span];
            let mut d = Decoder::new(existing);
            let tagged = skip_set_tag(&mut d)?;
            let count = d
                .array()?
                .ok_or(CborError::Indefinite("vkey witnesses"))?;
            let items_start = d.position();
            for _ in 0..count {
                d.skip()?;
            }
            let items_end = d.position();

            if tagged {
                write_head(&mut out, MAJOR_TAG, SET_TAG);
            }
            write_head(&mut out, MAJOR_ARRAY, count + 1);
            out.extend_from_slice(&existing[items_start..items_end]);
            out.extend_from_slice(&new_witness);
        }

        Ok(out)
    }
}

/// Computes the hex id of a CBOR-encoded transaction.
pub fn tx_hash(raw: &[u8]) -> Result<String, CborError> {
    Transaction::decode(raw.to_vec()).map(|tx| tx.hash())
}

fn decode_multiasset(d: &mut Decoder<'_>) -> Result<Vec<MintEntry>, CborError> {
    let policies = d.map()?.ok_or(CborError::Indefinite("mint"))?;
    let mut out = Vec::new();

    for _ in 0..policies {
        let policy_id = hex::encode(d.bytes()?);
        let assets = d.map()?.ok_or(CborError::Indefinite("mint assets"))?;
        for _ in 0..assets {
            let asset_name = hex::encode(d.bytes()?);
            let quantity = d.i64()?;
            out.push(MintEntry {
                policy_id: policy_id.clone(),
                asset_name,
                quantity,
            });
        }
    }

    Ok(out)
}

/// Reads the witness set map into `(key, value span)` pairs.
fn witness_entries(ws: &[u8]) -> Result<Vec<(u64, Range<usize>)>, CborError> {
    let mut d = Decoder::new(ws);
    let count = d.map()?.ok_or(CborError::Indefinite("witness set"))?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = d.u64()?;
        let start = d.position();
        d.skip()?;
        entries.push((key, start..d.position()));
    }

    Ok(entries)
}

fn find_witness_entry(ws: &[u8], key: u64) -> Result<Option<Range<usize>>, CborError> {
    Ok(witness_entries(ws)?
        .into_iter()
        .find_map(|(k, span)| (k == key).then_some(span)))
}

/// Consumes a leading set tag if present, returning whether there was one.
fn skip_set_tag(d: &mut Decoder<'_>) -> Result<bool, CborError> {
    if d.datatype()? != Type::Tag {
        return Ok(false);
    }

    let tag = d.tag()?;
    if tag.as_u64() != SET_TAG {
        return Err(CborError::malformed(
            "witness set",
            format!("unexpected tag {}", tag.as_u64()),
        ));
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    use super::*;
    use crate::test_utils::{TxFixture, POLICY, WRAPPED_ASSET};

    #[test]
    fn body_hash_ignores_witnesses() {
        let unsigned = TxFixture::default().build();
        let signed = TxFixture::default()
            .with_vkey_witness([1; 32], [2; 64])
            .build();

        let a = Transaction::decode(unsigned).unwrap();
        let b = Transaction::decode(signed).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn reads_burn_quantity() {
        let raw = TxFixture::default()
            .with_mint(POLICY, WRAPPED_ASSET, -42)
            .with_mint(POLICY, "aa", 5)
            .build();
        let tx = Transaction::decode(raw).unwrap();

        assert_eq!(tx.mint().unwrap().len(), 2);
        assert_eq!(tx.mint_quantity(POLICY, WRAPPED_ASSET).unwrap(), -42);
        assert_eq!(tx.mint_quantity(POLICY, "bb").unwrap(), 0);
    }

    #[test]
    fn missing_mint_reads_as_empty() {
        let tx = Transaction::decode(TxFixture::default().build()).unwrap();
        assert!(tx.mint().unwrap().is_empty());
        assert_eq!(tx.first_vkey().unwrap(), None);
        assert_eq!(tx.first_redeemer_data().unwrap(), None);
    }

    #[test]
    fn reads_first_redeemer_in_both_encodings() {
        let datum = crate::cbor::wrap_bytes(b"addr_test1xyz");

        for map_form in [false, true] {
            let raw = TxFixture::default()
                .with_redeemer(datum.clone(), map_form)
                .build();
            let tx = Transaction::decode(raw).unwrap();
            assert_eq!(tx.first_redeemer_data().unwrap(), Some(datum.clone()));
        }
    }

    #[test]
    fn signing_appends_a_valid_witness() {
        let key = PaymentKey::from_bytes(&[9; 32]);

        for tagged in [false, true] {
            let raw = TxFixture::default()
                .with_vkey_witness([1; 32], [2; 64])
                .with_tagged_vkeys(tagged)
                .with_redeemer(crate::cbor::wrap_bytes(b"x"), false)
                .build();
            let tx = Transaction::decode(raw).unwrap();

            let signed = Transaction::decode(tx.sign(&key).unwrap()).unwrap();
            assert_eq!(signed.body_bytes(), tx.body_bytes());

            let witnesses = signed.vkey_witnesses().unwrap();
            assert_eq!(witnesses.len(), 2);
            assert_eq!(witnesses[0].vkey, [1; 32]);
            assert_eq!(witnesses[1].vkey, key.vkey());

            let vk = VerifyingKey::from_bytes(&key.vkey()).unwrap();
            let sig = Signature::from_slice(&witnesses[1].signature).unwrap();
            vk.verify(&signed.id(), &sig).unwrap();

            // other witness entries survive
            assert!(signed.first_redeemer_data().unwrap().is_some());
        }
    }

    #[test]
    fn signing_without_witnesses_creates_the_vkey_entry() {
        let key = PaymentKey::from_bytes(&[3; 32]);
        let tx = Transaction::decode(TxFixture::default().build()).unwrap();

        let signed = Transaction::decode(tx.sign(&key).unwrap()).unwrap();
        assert_eq!(signed.first_vkey().unwrap(), Some(key.vkey()));

        // idempotent
        let again = signed.sign(&key).unwrap();
        assert_eq!(again, signed.as_bytes());
    }

    #[test]
    fn rejects_trailing_bytes_and_short_envelopes() {
        let mut raw = TxFixture::default().build();
        raw.push(0x00);
        assert!(Transaction::decode(raw).is_err());

        // [ {} ]
        assert!(Transaction::decode(vec![0x81, 0xa0]).is_err());
    }
}
