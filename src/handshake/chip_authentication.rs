//! Chip Authentication: ephemeral-static key agreement that authenticates
//! the chip and upgrades the secure-messaging keys.
//! See ICAO 9303-11 section 6.2.

use {
    super::{find_do, parse_dos, wrap_do},
    crate::{
        asn1::security_info::{
            ChipAuthenticationProtocol, KeyAgreement, SecurityInfos,
        },
        crypto::CryptoCoreRng,
        ensure_err,
        reader::TagReader,
        secure_messaging::SmCipher,
        transport::Transport,
        Error, Result,
    },
    tracing::debug,
};

/// Run Chip Authentication against the DG14 key and replace the session.
///
/// On failure the previous secure-messaging session must be treated as
/// compromised; the caller re-establishes access before further reads.
pub fn execute<T: Transport>(
    reader: &mut TagReader<T>,
    dg14: &SecurityInfos,
    rng: &mut dyn CryptoCoreRng,
) -> Result<SmCipher> {
    let (ca, pk_info) = dg14
        .chip_authentication()
        .ok_or(Error::ChipAuthentication)?;
    let protocol =
        ChipAuthenticationProtocol::from_oid(&ca.protocol).ok_or(Error::ChipAuthentication)?;
    debug!(protocol = %ca.protocol, "starting Chip Authentication");

    // MSE:SET AT selects the protocol and, if present, the key reference.
    let oid = ca.protocol.as_bytes();
    let mut at = Vec::with_capacity(oid.len() + 6);
    at.push(0x80);
    at.push(oid.len() as u8);
    at.extend_from_slice(oid);
    if let Some(id) = ca.key_id {
        at.push(0x84);
        at.push(0x01);
        at.push(id.try_into().map_err(|_| Error::ChipAuthentication)?);
    }
    reader.mse_set_at(0x41, 0xA4, at).map_err(ca_err)?;

    // Ephemeral key pair against the chip's static key; the shared secret
    // feeds the key derivation for the replacement session.
    let shared = match protocol.key_agreement {
        KeyAgreement::Ecdh => {
            let (curve, chip_pk) = pk_info.chip_authentication_public_key.ec_key()?;
            let (sk, pk) = curve.generate_keypair(rng)?;
            let payload = wrap_do(0x80, &curve.point_to_bytes(pk)?);
            let resp = reader.general_authenticate(payload, true).map_err(ca_err)?;
            // Any returned data objects are informational for plain CA.
            let _ = parse_dos(&resp).map(|dos| find_do(&dos, 0x81).map(<[u8]>::to_vec));
            curve.shared_secret(sk, chip_pk)?
        }
        KeyAgreement::Dh => {
            let (group, chip_pk) = pk_info.chip_authentication_public_key.dh_key()?;
            let (sk, pk) = group.generate_keypair(rng);
            let payload = wrap_do(0x80, &group.element_bytes(pk));
            let resp = reader.general_authenticate(payload, true).map_err(ca_err)?;
            let _ = parse_dos(&resp);
            group.shared_secret(sk, chip_pk)?
        }
    };

    ensure_err!(!shared.is_empty(), Error::ChipAuthentication);
    debug!(cipher = ?protocol.cipher, "Chip Authentication succeeded, replacing session");
    reader.set_secure_messaging(protocol.cipher.construct(&shared));
    Ok(protocol.cipher)
}

fn ca_err(err: Error) -> Error {
    match err {
        Error::UserCanceled | Error::Timeout => err,
        _ => Error::ChipAuthentication,
    }
}
