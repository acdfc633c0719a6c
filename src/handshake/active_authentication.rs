//! Active Authentication: chip-signed challenge proving possession of the
//! DG15 private key. See ICAO 9303-11 section 6.1.

use {
    crate::{
        asn1::{
            public_key_info::{EfDg15, PubkeyAlgorithmIdentifier},
            security_info::ActiveAuthenticationInfo,
        },
        crypto::{CryptoCoreRng, EcdsaPublicKey, EcdsaSignature, HashAlgo},
        reader::TagReader,
        transport::Transport,
        Error, Result,
    },
    der::asn1::ObjectIdentifier as Oid,
    rand::Rng,
    tracing::debug,
};

const ECDSA_WITH_SHA1: Oid = Oid::new_unwrap("1.2.840.10045.4.1");
const ECDSA_WITH_SHA224: Oid = Oid::new_unwrap("1.2.840.10045.4.3.1");
const ECDSA_WITH_SHA256: Oid = Oid::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: Oid = Oid::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_WITH_SHA512: Oid = Oid::new_unwrap("1.2.840.10045.4.3.4");

fn ecdsa_hash(oid: &Oid) -> Option<HashAlgo> {
    Some(match *oid {
        ECDSA_WITH_SHA1 => HashAlgo::Sha1,
        ECDSA_WITH_SHA224 => HashAlgo::Sha224,
        ECDSA_WITH_SHA256 => HashAlgo::Sha256,
        ECDSA_WITH_SHA384 => HashAlgo::Sha384,
        ECDSA_WITH_SHA512 => HashAlgo::Sha512,
        _ => return None,
    })
}

/// Challenge the chip and verify the signature with the DG15 key.
///
/// RSA keys use the ISO 9796-2 scheme-1 signature with message recovery;
/// EC keys use ECDSA with the digest declared by DG14's
/// ActiveAuthenticationInfo.
pub fn execute<T: Transport>(
    reader: &mut TagReader<T>,
    dg15: &EfDg15,
    aa_info: Option<&ActiveAuthenticationInfo>,
    rng: &mut dyn CryptoCoreRng,
) -> Result<()> {
    let challenge: [u8; 8] = rng.gen();
    let signature = reader.internal_authenticate(&challenge)?;
    debug!(len = signature.len(), "Active Authentication response");

    let key_info = &dg15.0;
    match &key_info.algorithm {
        PubkeyAlgorithmIdentifier::Rsa => {
            let key = key_info.rsa_key()?;
            key.verify_iso9796_2_ds1(&signature, &challenge)
                .map_err(|_| Error::Unexpected("Active Authentication failed".into()))?;
        }
        PubkeyAlgorithmIdentifier::Ec(_) => {
            let (curve, point) = key_info.ec_key()?;
            let algo = aa_info
                .and_then(|info| ecdsa_hash(&info.signature_algorithm))
                .unwrap_or(HashAlgo::Sha256);
            let digest = algo.digest(&challenge);
            let sig = EcdsaSignature::from_plain(&signature)
                .or_else(|_| EcdsaSignature::from_der(&signature))?;
            EcdsaPublicKey::new(&curve, point)
                .verify(&digest, &sig)
                .map_err(|_| Error::Unexpected("Active Authentication failed".into()))?;
        }
        _ => return Err(Error::Parse("DG15 key type unsupported".into())),
    }
    debug!("Active Authentication succeeded");
    Ok(())
}
