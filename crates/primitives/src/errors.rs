//! Error types for the primitives crate.

use thiserror::Error;

/// Errors that can occur while reading or writing CBOR-encoded ledger data.
#[derive(Debug, Error)]
pub enum CborError {
    /// The payload was empty.
    #[error("empty cbor payload")]
    Empty,

    /// The payload was not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The initial byte does not describe a definite length header.
    #[error("unsupported cbor length prefix: {0:#04x}")]
    UnsupportedPrefix(u8),

    /// The payload ended before the declared header.
    #[error("cbor payload truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Number of bytes required by the header.
        needed: usize,

        /// Number of bytes actually present.
        available: usize,
    },

    /// Indefinite-length containers are not accepted where they were found.
    #[error("indefinite-length {0} not supported")]
    Indefinite(&'static str),

    /// The data did not have the expected shape.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// What was being decoded.
        what: &'static str,

        /// Why it was rejected.
        reason: String,
    },

    /// Low-level decoder failure.
    #[error("cbor decode: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

impl CborError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while parsing or building addresses.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The string is not valid bech32.
    #[error("invalid bech32: {0}")]
    Bech32(#[from] bech32::DecodeError),

    /// The human readable part could not be constructed.
    #[error("invalid hrp: {0}")]
    Hrp(#[from] bech32::primitives::hrp::Error),

    /// Encoding failed.
    #[error("bech32 encoding: {0}")]
    Encode(#[from] bech32::EncodeError),

    /// The address payload is empty.
    #[error("empty address payload")]
    Empty,

    /// The decoded bytes are not valid UTF-8.
    #[error("address is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur while parsing signing keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key was not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The key had the wrong length.
    #[error("expected a 32-byte key, got {0} bytes")]
    Length(usize),
}
