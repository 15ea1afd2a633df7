//! Small CBOR helpers shared by the head client and the bridge.
//!
//! Transactions travel over the head protocol wrapped in a CBOR byte string header. The helpers
//! here strip that header, write CBOR heads when re-encoding witness sets, and read the byte
//! string datums the bridge uses to carry destination addresses.

use minicbor::{data::Type, Decoder};

use crate::errors::CborError;

/// CBOR major type for byte strings.
pub const MAJOR_BYTES: u8 = 2;

/// CBOR major type for arrays.
pub const MAJOR_ARRAY: u8 = 4;

/// CBOR major type for maps.
pub const MAJOR_MAP: u8 = 5;

/// CBOR major type for tags.
pub const MAJOR_TAG: u8 = 6;

/// Returns the number of bytes occupied by the header whose initial byte is `byte0`.
///
/// The additional-information field (low 5 bits) selects the size of the length that follows the
/// initial byte: values below 24 are stored inline, 24..=27 are followed by `2^(ai - 24)` bytes.
pub fn header_len(byte0: u8) -> Result<usize, CborError> {
    match byte0 & 0x1f {
        0..=23 => Ok(1),
        ai @ 24..=27 => Ok(1 + (1usize << (ai - 24))),
        _ => Err(CborError::UnsupportedPrefix(byte0)),
    }
}

/// Strips the CBOR length-prefix header from `bytes` and returns the payload that follows it.
pub fn unwrap_prefix(bytes: &[u8]) -> Result<&[u8], CborError> {
    let byte0 = *bytes.first().ok_or(CborError::Empty)?;
    let needed = header_len(byte0)?;

    if bytes.len() < needed {
        return Err(CborError::Truncated {
            needed,
            available: bytes.len(),
        });
    }

    Ok(&bytes[needed..])
}

/// Same as [`unwrap_prefix`] but operating on a hex string.
pub fn unwrap_prefix_hex(payload: &str) -> Result<Vec<u8>, CborError> {
    let bytes = hex::decode(payload)?;
    unwrap_prefix(&bytes).map(<[u8]>::to_vec)
}

/// Returns the major type of the CBOR item starting with `byte0`.
pub const fn major_type(byte0: u8) -> u8 {
    byte0 >> 5
}

/// Appends a definite-length CBOR head for `major` with argument `len` to `buf`.
pub fn write_head(buf: &mut Vec<u8>, major: u8, len: u64) {
    let major = major << 5;
    match len {
        0..=23 => buf.push(major | len as u8),
        24..=0xff => {
            buf.push(major | 24);
            buf.push(len as u8);
        }
        0x100..=0xffff => {
            buf.push(major | 25);
            buf.extend_from_slice(&(len as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(major | 26);
            buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        _ => {
            buf.push(major | 27);
            buf.extend_from_slice(&len.to_be_bytes());
        }
    }
}

/// Encodes `bytes` as a CBOR byte string.
pub fn wrap_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(bytes.len() + 9);
    write_head(&mut buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
    buf
}

/// Decodes a plutus datum that is a single byte string, definite or chunked.
pub fn decode_bytes_datum(data: &[u8]) -> Result<Vec<u8>, CborError> {
    let mut d = Decoder::new(data);
    match d.datatype()? {
        Type::Bytes => Ok(d.bytes()?.to_vec()),
        Type::BytesIndef => {
            let mut out = Vec::new();
            for chunk in d.bytes_iter()? {
                out.extend_from_slice(chunk?);
            }
            Ok(out)
        }
        other => Err(CborError::malformed(
            "datum",
            format!("expected a byte string, found {other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn one_byte_length_header_strips_two_bytes() {
        let payload = hex::decode("5803aabbcc").unwrap();
        assert_eq!(unwrap_prefix(&payload).unwrap(), &[0xaa, 0xbb, 0xcc]);

        let stripped = unwrap_prefix_hex("5803aabbcc").unwrap();
        assert_eq!(hex::encode(stripped), "aabbcc");
    }

    #[test]
    fn two_byte_length_header_strips_three_bytes() {
        let stripped = unwrap_prefix_hex("590003aabbcc").unwrap();
        assert_eq!(hex::encode(stripped), "aabbcc");
    }

    #[test]
    fn inline_length_strips_initial_byte_only() {
        let stripped = unwrap_prefix_hex("43aabbcc").unwrap();
        assert_eq!(hex::encode(stripped), "aabbcc");
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(unwrap_prefix(&[]), Err(CborError::Empty)));
        assert!(matches!(
            unwrap_prefix(&[0x5f]),
            Err(CborError::UnsupportedPrefix(0x5f))
        ));
        assert!(matches!(
            unwrap_prefix(&[0x5a, 0x00]),
            Err(CborError::Truncated {
                needed: 5,
                available: 2
            })
        ));
        assert!(unwrap_prefix_hex("zz").is_err());
    }

    #[test]
    fn reads_chunked_datum() {
        // (_ h'6162', h'63')
        let data = hex::decode("5f4261624163ff").unwrap();
        assert_eq!(decode_bytes_datum(&data).unwrap(), b"abc");

        let definite = wrap_bytes(b"addr_test1");
        assert_eq!(decode_bytes_datum(&definite).unwrap(), b"addr_test1");

        // an integer is not a byte string datum
        assert!(decode_bytes_datum(&[0x01]).is_err());
    }

    proptest! {
        #[test]
        fn wrapped_payload_unwraps_to_itself(payload in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let wrapped = wrap_bytes(&payload);
            prop_assert_eq!(unwrap_prefix(&wrapped).unwrap(), payload.as_slice());
        }

        #[test]
        fn head_len_matches_header_len(len in any::<u64>(), major in 0u8..8) {
            let mut buf = Vec::new();
            write_head(&mut buf, major, len);
            prop_assert_eq!(buf.len(), header_len(buf[0]).unwrap());
            prop_assert_eq!(major_type(buf[0]), major);
        }
    }
}
