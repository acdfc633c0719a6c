//! 3DES secure messaging: CBC with zero IV and the ISO/IEC 9797-1 MAC
//! algorithm 3 ("retail MAC") with DES.

use {
    super::{Envelope, SecureMessaging, SessionKeys},
    crate::{
        crypto::set_parity_bits,
        iso7816::{Apdu, Response, StatusWord},
        Result,
    },
    cbc_mac::{CbcMac, Mac},
    cipher::{
        block_padding::NoPadding, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut,
        KeyInit, KeyIvInit,
    },
    des::{Des, TdesEde2},
    sha1::{Digest, Sha1},
};

type TdesCbcEnc = cbc::Encryptor<TdesEde2>;
type TdesCbcDec = cbc::Decryptor<TdesEde2>;

/// 3DES key derivation: SHA-1 over seed and counter, first 16 bytes with DES
/// parity. See ICAO 9303-11 section 9.7.1.
pub fn kdf(seed: &[u8], counter: u32) -> [u8; 16] {
    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(counter.to_be_bytes());
    let hash = hasher.finalize();
    let mut key: [u8; 16] = hash[0..16].try_into().unwrap();
    set_parity_bits(&mut key);
    key
}

/// Derive (Kenc, Kmac) from a key seed.
pub fn derive_keys(seed: &[u8]) -> ([u8; 16], [u8; 16]) {
    (kdf(seed, super::KDF_ENC), kdf(seed, super::KDF_MAC))
}

/// Two-key 3DES in CBC mode with zero IV; input must be block aligned.
pub fn enc_3des(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let cipher = TdesCbcEnc::new_from_slices(key, &[0u8; 8]).unwrap();
    cipher.encrypt_padded_vec_mut::<NoPadding>(data)
}

pub fn dec_3des(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let cipher = TdesCbcDec::new_from_slices(key, &[0u8; 8]).unwrap();
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .expect("block aligned input")
}

/// ISO 9797-1 MAC algorithm 3: single-DES CBC-MAC under K1 with a final
/// D(K2)/E(K1) transform. Input must be padded.
pub fn retail_mac(key: &[u8; 16], data: &[u8]) -> [u8; 8] {
    let (k1, k2) = key.split_at(8);
    let mut mac = <CbcMac<Des> as Mac>::new_from_slice(k1).unwrap();
    mac.update(data);
    let mut block = mac.finalize().into_bytes();
    Des::new_from_slice(k2).unwrap().decrypt_block(&mut block);
    Des::new_from_slice(k1).unwrap().encrypt_block(&mut block);
    block.into()
}

pub struct TdesSecureMessaging {
    keys: SessionKeys,
    ssc:  u64,
}

impl TdesSecureMessaging {
    pub fn new(ksenc: [u8; 16], ksmac: [u8; 16], ssc: u64) -> Self {
        Self {
            keys: SessionKeys {
                enc: ksenc.to_vec(),
                mac: ksmac.to_vec(),
            },
            ssc,
        }
    }

    fn enc_key(&self) -> [u8; 16] {
        self.keys.enc.as_slice().try_into().unwrap()
    }

    fn mac_key(&self) -> [u8; 16] {
        self.keys.mac.as_slice().try_into().unwrap()
    }
}

impl SecureMessaging for TdesSecureMessaging {
    fn enc_apdu(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        self.ssc = self.ssc.wrapping_add(1);
        let (enc_key, mac_key) = (self.enc_key(), self.mac_key());
        let encrypt = |data: &[u8]| enc_3des(&enc_key, data);
        let decrypt = |data: &[u8]| dec_3des(&enc_key, data);
        let mac = |data: &[u8]| retail_mac(&mac_key, data);
        Envelope {
            ssc_bytes: self.ssc.to_be_bytes().to_vec(),
            block: 8,
            encrypt: &encrypt,
            decrypt: &decrypt,
            mac: &mac,
        }
        .wrap(apdu)
    }

    fn dec_response(&mut self, _status: StatusWord, resp: &[u8]) -> Result<Response> {
        self.ssc = self.ssc.wrapping_add(1);
        let (enc_key, mac_key) = (self.enc_key(), self.mac_key());
        let encrypt = |data: &[u8]| enc_3des(&enc_key, data);
        let decrypt = |data: &[u8]| dec_3des(&enc_key, data);
        let mac = |data: &[u8]| retail_mac(&mac_key, data);
        Envelope {
            ssc_bytes: self.ssc.to_be_bytes().to_vec(),
            block: 8,
            encrypt: &encrypt,
            decrypt: &decrypt,
            mac: &mac,
        }
        .unwrap(resp)
    }

    fn ssc(&self) -> u128 {
        self.ssc.into()
    }
}
