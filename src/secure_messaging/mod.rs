//! Secure Messaging per ICAO 9303-11 section 9.8.
//!
//! Session keys come from BAC, PACE or Chip Authentication; commands are
//! wrapped into DO'87'/'97'/'8E' envelopes and responses authenticated before
//! decryption. The send sequence counter is incremented exactly once per
//! wrapped command and once per verified response.

pub mod aes;
pub mod tdes;

use {
    crate::{
        ensure_err,
        iso7816::{Apdu, Response, StatusWord},
        Error, Result,
    },
    zeroize::{Zeroize, ZeroizeOnDrop},
};

pub const KDF_ENC: u32 = 1;
pub const KDF_MAC: u32 = 2;
pub const KDF_PACE: u32 = 3;

pub trait SecureMessaging {
    /// Wrap a plain command APDU for transmission.
    fn enc_apdu(&mut self, apdu: &Apdu) -> Result<Vec<u8>>;

    /// Authenticate and decrypt a response. The returned status word is the
    /// one carried in DO'99'.
    fn dec_response(&mut self, status: StatusWord, resp: &[u8]) -> Result<Response>;

    /// Current send sequence counter value, for diagnostics and tests.
    fn ssc(&self) -> u128;
}

/// Secure Messaging protocol that passes APDUs and responses as-is.
pub struct PlainText;

impl SecureMessaging for PlainText {
    fn enc_apdu(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        Ok(apdu.encode())
    }

    fn dec_response(&mut self, status: StatusWord, resp: &[u8]) -> Result<Response> {
        Ok(Response {
            data: resp.to_vec(),
            status,
        })
    }

    fn ssc(&self) -> u128 {
        0
    }
}

/// Session ciphers negotiated by PACE or Chip Authentication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmCipher {
    Tdes,
    Aes128,
    Aes192,
    Aes256,
}

impl SmCipher {
    /// Derive fresh session keys from a shared secret and build the matching
    /// secure messaging session with SSC = 0.
    pub fn construct(self, shared_secret: &[u8]) -> Box<dyn SecureMessaging + Send> {
        match self {
            Self::Tdes => Box::new(tdes::TdesSecureMessaging::new(
                tdes::kdf(shared_secret, KDF_ENC),
                tdes::kdf(shared_secret, KDF_MAC),
                0,
            )),
            Self::Aes128 | Self::Aes192 | Self::Aes256 => {
                let enc = aes::kdf(self, shared_secret, KDF_ENC);
                let mac = aes::kdf(self, shared_secret, KDF_MAC);
                Box::new(aes::AesSecureMessaging::new(self, enc, mac, 0))
            }
        }
    }

    pub const fn block_size(self) -> usize {
        match self {
            Self::Tdes => 8,
            _ => 16,
        }
    }
}

/// Session key material; zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    pub enc: Vec<u8>,
    pub mac: Vec<u8>,
}

/// ISO/IEC 7816-4 padding: `0x80` then zeros to the block boundary.
pub fn pad(data: &mut Vec<u8>, block: usize) {
    data.push(0x80);
    while data.len() % block != 0 {
        data.push(0x00);
    }
}

pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    let end = data
        .iter()
        .rposition(|&b| b != 0x00)
        .ok_or(Error::SecureMessaging("empty padded plaintext"))?;
    ensure_err!(
        data[end] == 0x80,
        Error::SecureMessaging("bad ISO 7816 padding")
    );
    Ok(&data[..end])
}

/// BER definite length octets.
pub(crate) fn ber_length(len: usize) -> Vec<u8> {
    match len {
        0..=0x7F => vec![len as u8],
        0x80..=0xFF => vec![0x81, len as u8],
        _ => {
            let mut out = vec![0x82];
            out.extend_from_slice(&(len as u16).to_be_bytes());
            out
        }
    }
}

/// The protected-APDU envelope shared by the 3DES and AES sessions.
///
/// `encrypt` sees the padded command data, `iv` feeds the response decrypt,
/// `mac` computes the (already truncated) 8-byte checksum.
pub(crate) struct Envelope<'a> {
    pub ssc_bytes:  Vec<u8>,
    pub block:      usize,
    pub encrypt:    &'a dyn Fn(&[u8]) -> Vec<u8>,
    pub decrypt:    &'a dyn Fn(&[u8]) -> Vec<u8>,
    pub mac:        &'a dyn Fn(&[u8]) -> [u8; 8],
}

impl Envelope<'_> {
    /// Build the wrapped command for `apdu`.
    pub fn wrap(&self, apdu: &Apdu) -> Result<Vec<u8>> {
        let extended = apdu.data.len() > 255 || apdu.le.is_some_and(|le| le > 256);

        // ICAO 9303-11 9.8.4: mask the class byte and pad the header.
        let mut header = apdu.header();
        header[0] |= 0x0C;
        let mut padded_header = header.to_vec();
        pad(&mut padded_header, self.block);

        let mut do87 = Vec::new();
        if !apdu.data.is_empty() {
            let mut plain = apdu.data.clone();
            pad(&mut plain, self.block);
            let cryptogram = (self.encrypt)(&plain);
            do87.push(0x87);
            do87.extend_from_slice(&ber_length(cryptogram.len() + 1));
            do87.push(0x01);
            do87.extend_from_slice(&cryptogram);
        }

        let mut do97 = Vec::new();
        if let Some(le) = apdu.le {
            do97.push(0x97);
            if extended {
                do97.push(0x02);
                do97.extend_from_slice(&((le % 0x1_0000) as u16).to_be_bytes());
            } else {
                do97.push(0x01);
                do97.push((le % 0x100) as u8);
            }
        }

        let mut mac_input = self.ssc_bytes.clone();
        mac_input.extend_from_slice(&padded_header);
        mac_input.extend_from_slice(&do87);
        mac_input.extend_from_slice(&do97);
        pad(&mut mac_input, self.block);
        let mac = (self.mac)(&mac_input);

        let mut payload = do87;
        payload.extend_from_slice(&do97);
        payload.push(0x8E);
        payload.push(0x08);
        payload.extend_from_slice(&mac);

        let wrapped = Apdu {
            cla:  header[0],
            ins:  apdu.ins,
            p1:   apdu.p1,
            p2:   apdu.p2,
            data: payload,
            le:   Some(if extended { 0x1_0000 } else { 0x100 }),
        };
        Ok(wrapped.encode())
    }

    /// Verify and decrypt a wrapped response body.
    pub fn unwrap(&self, resp: &[u8]) -> Result<Response> {
        // DOs arrive in fixed order: optional '87', then '99', then '8E'.
        let mut objects = Vec::new();
        let mut rest = resp;
        while !rest.is_empty() {
            ensure_err!(rest.len() >= 2, Error::SecureMessaging("truncated DO"));
            let tag = rest[0];
            let (len, consumed) = match rest[1] {
                0x81 => (rest[2] as usize, 3),
                0x82 => (u16::from_be_bytes([rest[2], rest[3]]) as usize, 4),
                n if n < 0x80 => (n as usize, 2),
                _ => return Err(Error::SecureMessaging("unsupported DO length")),
            };
            ensure_err!(
                rest.len() >= consumed + len,
                Error::SecureMessaging("DO length exceeds response")
            );
            objects.push((tag, rest[..consumed + len].to_vec()));
            rest = &rest[consumed + len..];
        }

        let find = |tag: u8| objects.iter().find(|(t, _)| *t == tag);
        let do87 = find(0x87);
        let do99 = find(0x99).ok_or(Error::SecureMessaging("missing DO'99'"))?;
        let do8e = find(0x8E).ok_or(Error::SecureMessaging("missing DO'8E'"))?;

        let mut mac_input = self.ssc_bytes.clone();
        if let Some((_, raw)) = do87 {
            mac_input.extend_from_slice(raw);
        }
        mac_input.extend_from_slice(&do99.1);
        pad(&mut mac_input, self.block);
        let expected = (self.mac)(&mac_input);
        let presented = &do8e.1[do8e.1.len() - 8..];
        ensure_err!(
            presented == expected.as_slice(),
            Error::SecureMessaging("response MAC mismatch")
        );

        let sw = &do99.1[do99.1.len() - 2..];
        let inner_status = StatusWord::from((sw[0], sw[1]));

        let data = match do87 {
            Some((_, raw)) => {
                let header = raw.len() - match raw[1] {
                    0x81 => raw[2] as usize,
                    0x82 => u16::from_be_bytes([raw[2], raw[3]]) as usize,
                    n => n as usize,
                };
                let value = &raw[header..];
                ensure_err!(
                    value.first() == Some(&0x01),
                    Error::SecureMessaging("missing padding indicator")
                );
                let plain = (self.decrypt)(&value[1..]);
                unpad(&plain)?.to_vec()
            }
            None => Vec::new(),
        };

        Ok(Response {
            data,
            status: inner_status,
        })
    }
}
