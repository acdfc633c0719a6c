//! Password Authenticated Connection Establishment.
//!
//! Generic and integrated mapping over the standardized EC curves and MODP
//! groups, plus the chip-authentication mapping (CAM) extension. See ICAO
//! 9303-11 section 4.4.

use {
    super::{find_do, parse_dos, public_key_do, wrap_do},
    crate::{
        asn1::security_info::{
            KeyAgreement, PaceInfo, PaceMapping, PaceProtocol, SecurityInfo, SecurityInfos,
        },
        crypto::{
            k_from_mrz, named::standardized_domain_parameters, CryptoCoreRng, DhUint,
            DomainParameters, EcPoint, EllipticCurve, FieldUint, ModPGroup,
        },
        ensure_err,
        reader::TagReader,
        secure_messaging::{
            aes::{self, cmac8},
            pad,
            tdes::{self, retail_mac},
            SmCipher, KDF_ENC, KDF_MAC, KDF_PACE,
        },
        transport::Transport,
        Error, Result,
    },
    ::aes::{Aes128, Aes192, Aes256},
    cipher::{BlockEncrypt, KeyInit},
    hex_literal::hex,
    tracing::{debug, warn},
};

/// Everything PACE leaves behind besides the installed session keys.
pub struct PaceOutcome {
    pub cipher: SmCipher,
    /// Chip Authentication Mapping data, to be checked against DG14.
    pub cam:    Option<CamData>,
}

/// PACE-CAM: the chip reveals `CA = SK.map / SK.IC`; the terminal later
/// verifies `PK.map == [CA] PK.IC` against the DG14 key.
pub struct CamData {
    pub curve:           EllipticCurve,
    pub chip_mapping_pk: EcPoint,
    pub ca_ic:           Vec<u8>,
}

/// Run PACE with the MRZ-derived password and install the session keys.
pub fn establish<T: Transport>(
    reader: &mut TagReader<T>,
    mrz_key: &str,
    card_access: &SecurityInfos,
    rng: &mut dyn CryptoCoreRng,
) -> Result<PaceOutcome> {
    let (info, protocol) = select_protocol(card_access)?;
    let params = domain_parameters(&info, card_access)?;
    debug!(
        protocol = %info.protocol,
        parameter_id = ?info.parameter_id,
        "starting PACE"
    );

    // Password key Kπ. See ICAO 9303-11 section 9.7.3.
    let k = k_from_mrz(mrz_key);
    let k_pi = aes::kdf(protocol.cipher, &k, KDF_PACE);

    // MSE:SET AT selects protocol and password. ICAO 9303-11 4.4.4.1.
    let mut at = Vec::new();
    let oid = info.protocol.as_bytes();
    at.push(0x80);
    at.push(oid.len() as u8);
    at.extend_from_slice(oid);
    at.extend_from_slice(&[0x83, 0x01, 0x01]); // MRZ password
    if let Some(id) = info.parameter_id {
        at.push(0x84);
        at.push(0x01);
        at.push(id as u8);
    }
    reader.mse_set_at(0xC1, 0xA4, at).map_err(pace_err)?;

    // Step 1: encrypted nonce. ICAO 9303-11 4.4.4.2.
    let step1 = reader.general_authenticate(Vec::new(), false).map_err(pace_err)?;
    let dos = parse_dos(&step1)?;
    let z = find_do(&dos, 0x80)?;
    let s = decrypt_nonce(protocol.cipher, &k_pi, z)?;

    match params {
        DomainParameters::Ec(curve) => establish_ec(reader, &info, protocol, curve, &s, rng),
        DomainParameters::Dh(group) => establish_dh(reader, &info, protocol, group, &s, rng),
    }
}

fn pace_err(err: Error) -> Error {
    match err {
        Error::UserCanceled | Error::Timeout => err,
        Error::Pace(_) => err,
        other => Error::Pace(other.to_string()),
    }
}

/// Pick the first PACEInfo this implementation can drive.
fn select_protocol(card_access: &SecurityInfos) -> Result<(PaceInfo, PaceProtocol)> {
    card_access
        .pace_infos()
        .into_iter()
        .find(|(_, protocol)| {
            // Integrated mapping is defined for the AES suites only.
            !(protocol.mapping == PaceMapping::Integrated && protocol.cipher == SmCipher::Tdes)
        })
        .ok_or(Error::Pace("no supported PACEInfo in EF.CardAccess".into()))
}

/// Resolve domain parameters: standardized by id, or explicit from a
/// PACEDomainParameterInfo.
fn domain_parameters(info: &PaceInfo, card_access: &SecurityInfos) -> Result<DomainParameters> {
    if let Some(id) = info.parameter_id {
        if let Some(params) = standardized_domain_parameters(id) {
            return Ok(params);
        }
    }
    for si in card_access.iter() {
        if let SecurityInfo::PaceDomainParameter(dp) = si {
            if let Some(any) = &dp.domain_parameter.parameters {
                if let Ok(ec) = any.decode_as::<crate::asn1::public_key_info::EcParameters>() {
                    return Ok(DomainParameters::Ec(ec.to_curve()?));
                }
            }
            warn!("PACEDomainParameterInfo present but not decodable");
        }
    }
    Err(Error::Pace("no usable PACE domain parameters".into()))
}

/// Decrypt the chip nonce `z` with Kπ (CBC, zero IV).
fn decrypt_nonce(cipher: SmCipher, k_pi: &[u8], z: &[u8]) -> Result<Vec<u8>> {
    ensure_err!(
        !z.is_empty() && z.len() % cipher.block_size() == 0,
        Error::Pace("encrypted nonce not block aligned".into())
    );
    Ok(match cipher {
        SmCipher::Tdes => {
            let key: [u8; 16] = k_pi
                .try_into()
                .map_err(|_| Error::Pace("bad Kπ length".into()))?;
            tdes::dec_3des(&key, z)
        }
        _ => aes::cbc_decrypt(k_pi, &[0u8; 16], z),
    })
}

/// Authentication token over the peer's public key data object.
/// ICAO 9303-11 section 4.4.3.4.
fn auth_token(
    cipher: SmCipher,
    ks_mac: &[u8],
    protocol: &der::asn1::ObjectIdentifier,
    key_tag: u8,
    key: &[u8],
) -> [u8; 8] {
    let mut input = public_key_do(protocol, key_tag, key);
    match cipher {
        SmCipher::Tdes => {
            pad(&mut input, 8);
            retail_mac(ks_mac.try_into().expect("16-byte MAC key"), &input)
        }
        _ => cmac8(ks_mac, &input),
    }
}

fn establish_ec<T: Transport>(
    reader: &mut TagReader<T>,
    info: &PaceInfo,
    protocol: PaceProtocol,
    curve: EllipticCurve,
    nonce: &[u8],
    rng: &mut dyn CryptoCoreRng,
) -> Result<PaceOutcome> {
    ensure_err!(
        protocol.key_agreement == KeyAgreement::Ecdh,
        Error::Pace("EC parameters with a DH protocol".into())
    );

    // Map to the ephemeral generator.
    let (mapped, chip_mapping_pk) = match protocol.mapping {
        PaceMapping::Generic | PaceMapping::ChipAuthentication => {
            // Step 2: exchange mapping keys, G' = [s]G + H.
            let (sk_map, pk_map) = curve.generate_keypair(rng)?;
            let step2 = reader
                .general_authenticate(wrap_do(0x81, &curve.point_to_bytes(pk_map)?), false)
                .map_err(pace_err)?;
            let dos = parse_dos(&step2)?;
            let chip_pk = curve.point_from_bytes(find_do(&dos, 0x82)?)?;
            ensure_err!(chip_pk != pk_map, Error::Pace("chip mirrored mapping key".into()));

            let h = curve.mul(chip_pk, sk_map)?;
            let s_scalar = FieldUint::try_from_be_slice(nonce)
                .ok_or(Error::Pace("nonce too large".into()))?
                % curve.order();
            let mapped_generator =
                curve.add(curve.mul(curve.generator(), s_scalar)?, h)?;
            (curve.with_generator(mapped_generator)?, Some(chip_pk))
        }
        PaceMapping::Integrated => {
            // Step 2: send the terminal nonce t in the clear.
            let mut t = vec![0u8; protocol.cipher.block_size()];
            rng.fill_bytes(&mut t);
            let step2 = reader
                .general_authenticate(wrap_do(0x81, &t), false)
                .map_err(pace_err)?;
            let _ = parse_dos(&step2)?;
            let x = pseudo_random(protocol.cipher, nonce, &t, curve.field_bytes() + 8)?;
            let x = FieldUint::try_from_be_slice(&x[..curve.field_bytes() + 8])
                .unwrap_or(FieldUint::ZERO)
                % curve.modulus();
            let point = curve.map_to_point(x)?;
            (curve.with_generator(point)?, None)
        }
    };

    // Step 3: ephemeral key agreement on the mapped generator.
    let (sk, pk) = mapped.generate_keypair(rng)?;
    let step3 = reader
        .general_authenticate(wrap_do(0x83, &mapped.point_to_bytes(pk)?), false)
        .map_err(pace_err)?;
    let dos = parse_dos(&step3)?;
    let chip_pk_bytes = find_do(&dos, 0x84)?.to_vec();
    let chip_pk = mapped.point_from_bytes(&chip_pk_bytes)?;
    ensure_err!(chip_pk != pk, Error::Pace("chip mirrored ephemeral key".into()));
    let shared = mapped.shared_secret(sk, chip_pk)?;

    // Step 4: exchange and verify authentication tokens.
    let ks_enc = aes::kdf(protocol.cipher, &shared, KDF_ENC);
    let ks_mac = aes::kdf(protocol.cipher, &shared, KDF_MAC);
    let t_ifd = auth_token(protocol.cipher, &ks_mac, &info.protocol, 0x86, &chip_pk_bytes);
    let step4 = reader
        .general_authenticate(wrap_do(0x85, &t_ifd), true)
        .map_err(pace_err)?;
    let dos = parse_dos(&step4)?;
    let t_ic = find_do(&dos, 0x86)?;
    let expected = auth_token(
        protocol.cipher,
        &ks_mac,
        &info.protocol,
        0x86,
        &mapped.point_to_bytes(pk)?,
    );
    ensure_err!(t_ic == expected, Error::Pace("authentication token mismatch".into()));

    // CAM: decrypt the encrypted chip authentication data.
    let cam = if protocol.mapping == PaceMapping::ChipAuthentication {
        let a_ic = find_do(&dos, 0x8A)?;
        let plain = decrypt_nonce(protocol.cipher, &ks_enc, a_ic)?;
        let ca_ic = crate::secure_messaging::unpad(&plain)
            .map(<[u8]>::to_vec)
            .unwrap_or(plain);
        Some(CamData {
            curve:           curve.clone(),
            chip_mapping_pk: chip_mapping_pk
                .ok_or(Error::Pace("CAM without mapping key".into()))?,
            ca_ic,
        })
    } else {
        None
    };

    install_session(reader, protocol.cipher, &ks_enc, &ks_mac);
    Ok(PaceOutcome {
        cipher: protocol.cipher,
        cam,
    })
}

fn establish_dh<T: Transport>(
    reader: &mut TagReader<T>,
    info: &PaceInfo,
    protocol: PaceProtocol,
    group: ModPGroup,
    nonce: &[u8],
    rng: &mut dyn CryptoCoreRng,
) -> Result<PaceOutcome> {
    ensure_err!(
        protocol.key_agreement == KeyAgreement::Dh,
        Error::Pace("DH parameters with an EC protocol".into())
    );

    let mapped = match protocol.mapping {
        PaceMapping::Generic => {
            let (sk_map, pk_map) = group.generate_keypair(rng);
            let step2 = reader
                .general_authenticate(wrap_do(0x81, &group.element_bytes(pk_map)), false)
                .map_err(pace_err)?;
            let dos = parse_dos(&step2)?;
            let chip_pk = group.element_from_bytes(find_do(&dos, 0x82)?)?;
            ensure_err!(chip_pk != pk_map, Error::Pace("chip mirrored mapping key".into()));

            let h_bytes = group.shared_secret(sk_map, chip_pk)?;
            let h = group.element_from_bytes(&h_bytes)?;
            let s_scalar = DhUint::try_from_be_slice(nonce)
                .ok_or(Error::Pace("nonce too large".into()))?;
            group.with_generator(group.map_generator(s_scalar, h)?)?
        }
        PaceMapping::Integrated => {
            let mut t = vec![0u8; protocol.cipher.block_size()];
            rng.fill_bytes(&mut t);
            let step2 = reader
                .general_authenticate(wrap_do(0x81, &t), false)
                .map_err(pace_err)?;
            let _ = parse_dos(&step2)?;
            let bytes =
                pseudo_random(protocol.cipher, nonce, &t, group.element_bytes_len() + 8)?;
            let x = DhUint::try_from_be_slice(&bytes[..group.element_bytes_len()])
                .unwrap_or(DhUint::from(2u64))
                % group.modulus();
            // Project into the prime-order subgroup.
            let exp = (group.modulus() - DhUint::from(1u64)) / group.order();
            let generator = x.pow_mod(exp, group.modulus());
            group.with_generator(generator)?
        }
        PaceMapping::ChipAuthentication => {
            return Err(Error::Pace("CAM is not defined for DH groups".into()))
        }
    };

    let (sk, pk) = mapped.generate_keypair(rng);
    let step3 = reader
        .general_authenticate(wrap_do(0x83, &mapped.element_bytes(pk)), false)
        .map_err(pace_err)?;
    let dos = parse_dos(&step3)?;
    let chip_pk_bytes = find_do(&dos, 0x84)?.to_vec();
    let chip_pk = mapped.element_from_bytes(&chip_pk_bytes)?;
    ensure_err!(chip_pk != pk, Error::Pace("chip mirrored ephemeral key".into()));
    let shared = mapped.shared_secret(sk, chip_pk)?;

    let ks_enc = aes::kdf(protocol.cipher, &shared, KDF_ENC);
    let ks_mac = aes::kdf(protocol.cipher, &shared, KDF_MAC);
    let t_ifd = auth_token(protocol.cipher, &ks_mac, &info.protocol, 0x84, &chip_pk_bytes);
    let step4 = reader
        .general_authenticate(wrap_do(0x85, &t_ifd), true)
        .map_err(pace_err)?;
    let dos = parse_dos(&step4)?;
    let t_ic = find_do(&dos, 0x86)?;
    let expected = auth_token(
        protocol.cipher,
        &ks_mac,
        &info.protocol,
        0x84,
        &mapped.element_bytes(pk),
    );
    ensure_err!(t_ic == expected, Error::Pace("authentication token mismatch".into()));

    install_session(reader, protocol.cipher, &ks_enc, &ks_mac);
    Ok(PaceOutcome {
        cipher: protocol.cipher,
        cam:    None,
    })
}

fn install_session<T: Transport>(
    reader: &mut TagReader<T>,
    cipher: SmCipher,
    ks_enc: &[u8],
    ks_mac: &[u8],
) {
    use crate::secure_messaging::{aes::AesSecureMessaging, tdes::TdesSecureMessaging};
    debug!(?cipher, "PACE succeeded, installing session keys");
    match cipher {
        SmCipher::Tdes => reader.set_secure_messaging(Box::new(TdesSecureMessaging::new(
            ks_enc.try_into().expect("16-byte key"),
            ks_mac.try_into().expect("16-byte key"),
            0,
        ))),
        _ => reader.set_secure_messaging(Box::new(AesSecureMessaging::new(
            cipher,
            ks_enc.to_vec(),
            ks_mac.to_vec(),
            0,
        ))),
    }
}

/// The nonce-expansion function of the integrated mapping: an iterated block
/// cipher keyed with the terminal nonce, using the domain-separation
/// constants from ICAO 9303-11 section 4.4.3.3.2.
fn pseudo_random(cipher: SmCipher, s: &[u8], t: &[u8], out_len: usize) -> Result<Vec<u8>> {
    let (c0, c1): (&[u8], &[u8]) = match cipher {
        SmCipher::Aes128 => (
            &hex!("A668892A7C41E3CA739F40B057D85904"),
            &hex!("A4E136AC725F738B01C1F60217C188AD"),
        ),
        SmCipher::Aes192 | SmCipher::Aes256 => (
            &hex!("D463D65234124EF7897054986DCA0A174E28DF758CBAA03F240616414D5A1676"),
            &hex!("54BD7255F0AAF831BEC3423FCF39D69B6CBF066677D0FAAE5AADD99DF8E53517"),
        ),
        SmCipher::Tdes => {
            return Err(Error::Pace("integrated mapping requires AES".into()))
        }
    };

    let encrypt = |key: &[u8], block: &mut [u8; 16]| match key.len() {
        16 => Aes128::new_from_slice(key).unwrap().encrypt_block(block.into()),
        24 => Aes192::new_from_slice(key).unwrap().encrypt_block(block.into()),
        _ => Aes256::new_from_slice(key).unwrap().encrypt_block(block.into()),
    };

    // State starts from the chip nonce, keyed by the terminal nonce.
    let mut state = [0u8; 16];
    for (i, byte) in s.iter().enumerate().take(16) {
        state[i] = *byte;
    }
    encrypt(t, &mut state);

    let mut out = Vec::with_capacity(out_len + 16);
    while out.len() < out_len {
        let mut block = state;
        xor_into(&mut block, &c0[..16]);
        encrypt(t, &mut block);
        out.extend_from_slice(&block);

        xor_into(&mut state, &c1[..16]);
        encrypt(t, &mut state);
    }
    out.truncate(out_len);
    Ok(out)
}

fn xor_into(dst: &mut [u8; 16], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::crypto::named};

    #[test]
    fn test_pseudo_random_deterministic() {
        let s = [0x11u8; 16];
        let t = [0x22u8; 16];
        let a = pseudo_random(SmCipher::Aes128, &s, &t, 40).unwrap();
        let b = pseudo_random(SmCipher::Aes128, &s, &t, 40).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        let c = pseudo_random(SmCipher::Aes128, &s, &[0x23u8; 16], 40).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_pseudo_random_rejects_tdes() {
        assert!(pseudo_random(SmCipher::Tdes, &[0; 16], &[0; 16], 40).is_err());
    }

    #[test]
    fn test_generic_mapping_matches_chip_side() {
        // Both sides of the GM computation agree on G'.
        let curve = named::brainpool_p256r1();
        let rng = &mut rand::thread_rng();
        let nonce = [0x5A; 16];

        let (sk_t, pk_t) = curve.generate_keypair(rng).unwrap();
        let (sk_c, pk_c) = curve.generate_keypair(rng).unwrap();

        let s_scalar = FieldUint::try_from_be_slice(&nonce).unwrap() % curve.order();
        let h_terminal = curve.mul(pk_c, sk_t).unwrap();
        let h_chip = curve.mul(pk_t, sk_c).unwrap();
        assert_eq!(h_terminal, h_chip);

        let g1 = curve
            .add(curve.mul(curve.generator(), s_scalar).unwrap(), h_terminal)
            .unwrap();
        let g2 = curve
            .add(curve.mul(curve.generator(), s_scalar).unwrap(), h_chip)
            .unwrap();
        assert_eq!(g1, g2);
        assert!(curve.with_generator(g1).is_ok());
    }
}
