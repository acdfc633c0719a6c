//! Basic Access Control.
//!
//! Symmetric mutual authentication deriving 3DES session keys from the MRZ.
//! See ICAO 9303-11 section 4.3.

use {
    crate::{
        crypto::seed_from_mrz,
        ensure_err,
        reader::TagReader,
        secure_messaging::{
            pad,
            tdes::{dec_3des, derive_keys, enc_3des, retail_mac, TdesSecureMessaging},
        },
        transport::Transport,
        Error, Result,
    },
    rand::{CryptoRng, Rng, RngCore},
    tracing::debug,
    zeroize::Zeroize,
};

/// Run BAC and install the derived 3DES session into the reader.
///
/// A cryptogram that fails verification maps to [`Error::InvalidMrzKey`];
/// everything else the chip does wrong is a connection-level failure.
pub fn establish<T: Transport>(
    reader: &mut TagReader<T>,
    mrz_key: &str,
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<()> {
    let mut seed = seed_from_mrz(mrz_key);
    let (kenc, kmac) = derive_keys(&seed);
    seed.zeroize();

    let rnd_ic = reader.get_challenge().map_err(connection_error)?;
    let rnd_ifd: [u8; 8] = rng.gen();
    let mut k_ifd: [u8; 16] = rng.gen();

    // S = RND.IFD || RND.IC || K.IFD, encrypted then MACed.
    let mut s = Vec::with_capacity(32);
    s.extend_from_slice(&rnd_ifd);
    s.extend_from_slice(&rnd_ic);
    s.extend_from_slice(&k_ifd);
    let e_ifd = enc_3des(&kenc, &s);
    s.zeroize();

    let mut padded = e_ifd.clone();
    pad(&mut padded, 8);
    let m_ifd = retail_mac(&kmac, &padded);

    let mut cryptogram = e_ifd;
    cryptogram.extend_from_slice(&m_ifd);
    let response = reader
        .external_authenticate(&cryptogram)
        .map_err(connection_error)?;
    ensure_err!(response.len() == 40, Error::Connection);

    // Verify the chip's MAC before trusting anything in the response.
    let (e_ic, m_ic) = response.split_at(32);
    let mut padded = e_ic.to_vec();
    pad(&mut padded, 8);
    ensure_err!(
        retail_mac(&kmac, &padded).as_slice() == m_ic,
        Error::InvalidMrzKey
    );

    let mut plain = dec_3des(&kenc, e_ic);
    ensure_err!(plain[0..8] == rnd_ic, Error::InvalidMrzKey);
    ensure_err!(plain[8..16] == rnd_ifd, Error::InvalidMrzKey);
    let k_ic: [u8; 16] = plain[16..32].try_into().unwrap();
    plain.zeroize();

    // Session keys from K.IFD xor K.IC; SSC from the nonce halves.
    // See ICAO 9303-11 section 9.8.6.3.
    let mut k_seed = [0u8; 16];
    for (out, (a, b)) in k_seed.iter_mut().zip(k_ifd.iter().zip(k_ic.iter())) {
        *out = a ^ b;
    }
    k_ifd.zeroize();
    let (ksenc, ksmac) = derive_keys(&k_seed);
    k_seed.zeroize();

    let mut ssc_bytes = [0u8; 8];
    ssc_bytes[..4].copy_from_slice(&rnd_ic[4..]);
    ssc_bytes[4..].copy_from_slice(&rnd_ifd[4..]);
    let ssc = u64::from_be_bytes(ssc_bytes);

    debug!("Basic Access Control succeeded");
    reader.set_secure_messaging(Box::new(TdesSecureMessaging::new(ksenc, ksmac, ssc)));
    Ok(())
}

fn connection_error(err: Error) -> Error {
    match err {
        Error::UserCanceled | Error::Timeout => err,
        _ => Error::Connection,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    /// ICAO 9303-11 appendix D.3: the terminal-side cryptogram.
    #[test]
    fn test_cryptogram_construction() {
        let seed = seed_from_mrz("L898902C<369080619406236");
        let (kenc, kmac) = derive_keys(&seed);

        let rnd_ic = hex!("4608F91988702212");
        let rnd_ifd = hex!("781723860C06C226");
        let k_ifd = hex!("0B795240CB7049B01C19B33E32804F0B");

        let mut s = Vec::new();
        s.extend_from_slice(&rnd_ifd);
        s.extend_from_slice(&rnd_ic);
        s.extend_from_slice(&k_ifd);
        let e_ifd = enc_3des(&kenc, &s);
        assert_eq!(
            e_ifd,
            hex!(
                "72C29C2371CC9BDB65B779B8E8D37B29ECC154AA56A8799FAE2F498F76ED92F2"
            )
        );

        let mut padded = e_ifd.clone();
        pad(&mut padded, 8);
        let mac = retail_mac(&kmac, &padded);
        assert_eq!(mac, hex!("5F1448EEA8AD90A7"));
    }

    /// ICAO 9303-11 appendix D.3: session key derivation from K.IFD ^ K.IC.
    #[test]
    fn test_session_seed() {
        let k_ifd = hex!("0B795240CB7049B01C19B33E32804F0B");
        let k_ic = hex!("0B4F80323EB3191CB04970CB4052790B");
        let mut k_seed = [0u8; 16];
        for (out, (a, b)) in k_seed.iter_mut().zip(k_ifd.iter().zip(k_ic.iter())) {
            *out = a ^ b;
        }
        assert_eq!(k_seed, hex!("0036D272F5C350ACAC50C3F572D23600"));

        let (ksenc, ksmac) = derive_keys(&k_seed);
        assert_eq!(ksenc, hex!("979EC13B1CBFE9DCD01AB0FED307EAE5"));
        assert_eq!(ksmac, hex!("F1CB1F1FB5ADF208806B89DC579DC1F8"));
    }
}
