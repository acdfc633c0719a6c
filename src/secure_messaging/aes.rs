//! AES secure messaging: CBC with an encrypted-SSC IV and CMAC
//! authentication. See ICAO 9303-11 section 9.8.

use {
    super::{Envelope, SecureMessaging, SessionKeys, SmCipher},
    crate::{
        iso7816::{Apdu, Response, StatusWord},
        Result,
    },
    aes::{Aes128, Aes192, Aes256},
    cipher::{
        block_padding::NoPadding, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit,
        KeyIvInit,
    },
    cmac::{Cmac, Mac},
    sha1::Sha1,
    sha2::{Digest, Sha256},
};

/// AES key derivation per ICAO 9303-11 section 9.7.1: SHA-1 for 128-bit
/// keys, SHA-256 truncated for the larger sizes.
pub fn kdf(cipher: SmCipher, seed: &[u8], counter: u32) -> Vec<u8> {
    match cipher {
        SmCipher::Tdes => super::tdes::kdf(seed, counter).to_vec(),
        SmCipher::Aes128 => {
            let mut hasher = Sha1::new();
            hasher.update(seed);
            hasher.update(counter.to_be_bytes());
            hasher.finalize()[..16].to_vec()
        }
        SmCipher::Aes192 | SmCipher::Aes256 => {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update(counter.to_be_bytes());
            let take = if cipher == SmCipher::Aes192 { 24 } else { 32 };
            hasher.finalize()[..take].to_vec()
        }
    }
}

fn ecb_encrypt_block(key: &[u8], block: &mut [u8; 16]) {
    let block = block.into();
    match key.len() {
        16 => Aes128::new_from_slice(key).unwrap().encrypt_block(block),
        24 => Aes192::new_from_slice(key).unwrap().encrypt_block(block),
        _ => Aes256::new_from_slice(key).unwrap().encrypt_block(block),
    }
}

fn cbc_encrypt(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
    match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(data),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(data),
        _ => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(data),
    }
}

pub(crate) fn cbc_decrypt(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
    match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .unwrap()
            .decrypt_padded_vec_mut::<NoPadding>(data),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .unwrap()
            .decrypt_padded_vec_mut::<NoPadding>(data),
        _ => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .unwrap()
            .decrypt_padded_vec_mut::<NoPadding>(data),
    }
    .expect("block aligned input")
}

/// CMAC truncated to the 8 bytes DO'8E' carries.
pub fn cmac8(key: &[u8], data: &[u8]) -> [u8; 8] {
    let full = match key.len() {
        16 => {
            let mut mac = <Cmac<Aes128> as Mac>::new_from_slice(key).unwrap();
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        24 => {
            let mut mac = <Cmac<Aes192> as Mac>::new_from_slice(key).unwrap();
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        _ => {
            let mut mac = <Cmac<Aes256> as Mac>::new_from_slice(key).unwrap();
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    };
    full[..8].try_into().unwrap()
}

pub struct AesSecureMessaging {
    cipher: SmCipher,
    keys:   SessionKeys,
    ssc:    u128,
}

impl AesSecureMessaging {
    pub fn new(cipher: SmCipher, ksenc: Vec<u8>, ksmac: Vec<u8>, ssc: u128) -> Self {
        Self {
            cipher,
            keys: SessionKeys {
                enc: ksenc,
                mac: ksmac,
            },
            ssc,
        }
    }

    /// IV = E(KSenc, SSC), ICAO 9303-11 section 9.8.6.1.
    fn iv(&self) -> [u8; 16] {
        let mut block = self.ssc.to_be_bytes();
        ecb_encrypt_block(&self.keys.enc, &mut block);
        block
    }
}

impl SecureMessaging for AesSecureMessaging {
    fn enc_apdu(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        self.ssc = self.ssc.wrapping_add(1);
        let iv = self.iv();
        let encrypt = |data: &[u8]| cbc_encrypt(&self.keys.enc, &iv, data);
        let decrypt = |data: &[u8]| cbc_decrypt(&self.keys.enc, &iv, data);
        let mac = |data: &[u8]| cmac8(&self.keys.mac, data);
        Envelope {
            ssc_bytes: self.ssc.to_be_bytes().to_vec(),
            block: self.cipher.block_size(),
            encrypt: &encrypt,
            decrypt: &decrypt,
            mac: &mac,
        }
        .wrap(apdu)
    }

    fn dec_response(&mut self, _status: StatusWord, resp: &[u8]) -> Result<Response> {
        self.ssc = self.ssc.wrapping_add(1);
        let iv = self.iv();
        let encrypt = |data: &[u8]| cbc_encrypt(&self.keys.enc, &iv, data);
        let decrypt = |data: &[u8]| cbc_decrypt(&self.keys.enc, &iv, data);
        let mac = |data: &[u8]| cmac8(&self.keys.mac, data);
        Envelope {
            ssc_bytes: self.ssc.to_be_bytes().to_vec(),
            block: self.cipher.block_size(),
            encrypt: &encrypt,
            decrypt: &decrypt,
            mac: &mac,
        }
        .unwrap(resp)
    }

    fn ssc(&self) -> u128 {
        self.ssc
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    /// PACE key derivation example from ICAO 9303-11 appendix G
    #[test]
    fn test_kdf_pace() {
        let k = hex!("7E2D2A41C74EA0B38CD36F863939BFA8E9032AAD");
        let k_pi = kdf(SmCipher::Aes128, &k, super::super::KDF_PACE);
        assert_eq!(k_pi, hex!("89DED1B26624EC1E634C1989302849DD"));
    }

    #[test]
    fn test_kdf_lengths() {
        let seed = [0x42u8; 32];
        assert_eq!(kdf(SmCipher::Aes128, &seed, 1).len(), 16);
        assert_eq!(kdf(SmCipher::Aes192, &seed, 1).len(), 24);
        assert_eq!(kdf(SmCipher::Aes256, &seed, 1).len(), 32);
    }

    /// Wrap/unwrap round trip against a simulated chip sharing the SSC.
    #[test]
    fn test_loopback() {
        let seed = [0x17u8; 32];
        let ksenc = kdf(SmCipher::Aes256, &seed, super::super::KDF_ENC);
        let ksmac = kdf(SmCipher::Aes256, &seed, super::super::KDF_MAC);

        let mut terminal =
            AesSecureMessaging::new(SmCipher::Aes256, ksenc.clone(), ksmac.clone(), 0);
        let apdu = Apdu::new(0x00, 0xB0, 0x00, 0x00).with_le(0xA0);
        let wrapped = terminal.enc_apdu(&apdu).unwrap();
        assert_eq!(wrapped[0], 0x0C);
        assert_eq!(terminal.ssc(), 1);

        // Chip side: advance SSC and build DO'87' + DO'99' + DO'8E'.
        let mut chip = AesSecureMessaging::new(SmCipher::Aes256, ksenc, ksmac, 1);
        chip.ssc = chip.ssc.wrapping_add(1);
        let iv = chip.iv();
        let mut plain = b"response payload".to_vec();
        super::super::pad(&mut plain, 16);
        let cryptogram = cbc_encrypt(&chip.keys.enc, &iv, &plain);

        let mut body = vec![0x87, (cryptogram.len() + 1) as u8, 0x01];
        body.extend_from_slice(&cryptogram);
        body.extend_from_slice(&hex!("99029000"));
        let mut mac_input = chip.ssc.to_be_bytes().to_vec();
        mac_input.extend_from_slice(&body);
        super::super::pad(&mut mac_input, 16);
        let mac = cmac8(&chip.keys.mac, &mac_input);
        body.push(0x8E);
        body.push(0x08);
        body.extend_from_slice(&mac);

        let resp = terminal
            .dec_response(StatusWord::SUCCESS, &body)
            .unwrap();
        assert_eq!(resp.data, b"response payload");
        assert_eq!(resp.status, StatusWord::SUCCESS);
        assert_eq!(terminal.ssc(), 2);
    }
}
