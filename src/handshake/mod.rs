//! The cryptographic handshakes: BAC, PACE, Chip Authentication and Active
//! Authentication.
//!
//! Each handshake is a short-lived routine that borrows the tag reader for
//! its duration; nothing here outlives the exchange except the session keys
//! installed into the reader's secure-messaging layer.

pub mod active_authentication;
pub mod bac;
pub mod chip_authentication;
pub mod pace;

use crate::{ensure_err, Error, Result};

/// Split a concatenation of context-tagged data objects (`0x80`-`0x8A`) as
/// they appear inside dynamic authentication data.
pub(crate) fn parse_dos(mut data: &[u8]) -> Result<Vec<(u8, Vec<u8>)>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        ensure_err!(data.len() >= 2, Error::Parse("truncated data object".into()));
        let tag = data[0];
        let (len, header) = match data[1] {
            0x81 => (data[2] as usize, 3),
            0x82 => (u16::from_be_bytes([data[2], data[3]]) as usize, 4),
            n if n < 0x80 => (n as usize, 2),
            _ => return Err(Error::Parse("unsupported data object length".into())),
        };
        ensure_err!(
            data.len() >= header + len,
            Error::Parse("data object length exceeds input".into())
        );
        out.push((tag, data[header..header + len].to_vec()));
        data = &data[header + len..];
    }
    Ok(out)
}

/// One context-tagged data object.
pub(crate) fn wrap_do(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend_from_slice(&crate::secure_messaging::ber_length(value.len()));
    out.extend_from_slice(value);
    out
}

pub(crate) fn find_do(dos: &[(u8, Vec<u8>)], tag: u8) -> Result<&[u8]> {
    dos.iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| v.as_slice())
        .ok_or_else(|| Error::Parse(format!("missing data object {tag:#04X}")))
}

/// `0x7F49` public key data object: the authentication-token input of PACE.
/// See ICAO 9303-11 section 4.4.3.4.
pub(crate) fn public_key_do(protocol: &der::asn1::ObjectIdentifier, key_tag: u8, key: &[u8]) -> Vec<u8> {
    let oid = protocol.as_bytes();
    let mut inner = Vec::with_capacity(oid.len() + key.len() + 8);
    inner.push(0x06);
    inner.extend_from_slice(&crate::secure_messaging::ber_length(oid.len()));
    inner.extend_from_slice(oid);
    inner.push(key_tag);
    inner.extend_from_slice(&crate::secure_messaging::ber_length(key.len()));
    inner.extend_from_slice(key);

    let mut out = vec![0x7F, 0x49];
    out.extend_from_slice(&crate::secure_messaging::ber_length(inner.len()));
    out.extend_from_slice(&inner);
    out
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    #[test]
    fn test_parse_dos() {
        let dos = parse_dos(&hex!("800101 8202AABB 8A00")).unwrap();
        assert_eq!(dos.len(), 3);
        assert_eq!(find_do(&dos, 0x82).unwrap(), hex!("AABB"));
        assert_eq!(find_do(&dos, 0x8A).unwrap(), [0u8; 0]);
        assert!(find_do(&dos, 0x85).is_err());
    }

    #[test]
    fn test_long_do() {
        let mut input = vec![0x80, 0x81, 0x80];
        input.extend_from_slice(&[0x55; 0x80]);
        let dos = parse_dos(&input).unwrap();
        assert_eq!(find_do(&dos, 0x80).unwrap().len(), 0x80);
    }
}
