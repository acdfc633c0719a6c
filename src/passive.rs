//! Passive Authentication: offline verification of the Document Security
//! Object against the data groups and the CSCA PKI.
//! See ICAO 9303-11 section 5.1.

use {
    crate::{
        asn1::{
            digest_algorithm_identifier::{
                ID_SHA1, ID_SHA224, ID_SHA256, ID_SHA384, ID_SHA512,
            },
            pki::{first_certificate, MasterList},
            public_key_info::SubjectPublicKeyInfo,
            EfSod,
        },
        crypto::{EcdsaPublicKey, EcdsaSignature, HashAlgo},
        lds::{DataGroup, DataGroupId},
        Error, Result,
    },
    cms::cert::x509::Certificate,
    der::{
        asn1::{ObjectIdentifier as Oid, OctetString},
        Decode, Encode,
    },
    std::collections::BTreeMap,
    tracing::{debug, warn},
};

const ID_MESSAGE_DIGEST: Oid = Oid::new_unwrap("1.2.840.113549.1.9.4");

const ID_RSA_ENCRYPTION: Oid = Oid::new_unwrap("1.2.840.113549.1.1.1");
const SHA1_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.5");
const SHA256_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.13");
const SHA224_WITH_RSA: Oid = Oid::new_unwrap("1.2.840.113549.1.1.14");
const ECDSA_WITH_SHA1: Oid = Oid::new_unwrap("1.2.840.10045.4.1");
const ECDSA_WITH_SHA224: Oid = Oid::new_unwrap("1.2.840.10045.4.3.1");
const ECDSA_WITH_SHA256: Oid = Oid::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: Oid = Oid::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_WITH_SHA512: Oid = Oid::new_unwrap("1.2.840.10045.4.3.4");

/// The verdict, kept granular so the host can explain partial failures.
#[derive(Clone, Debug, Default)]
pub struct PassiveReport {
    pub data_group_hashes_ok: bool,
    pub sod_signature_ok:     bool,
    pub chain_ok:             bool,
    /// DER of the Document Signer Certificate, when present.
    pub document_signer:      Option<Vec<u8>>,
    pub errors:               Vec<String>,
}

impl PassiveReport {
    pub fn all_ok(&self) -> bool {
        self.data_group_hashes_ok && self.sod_signature_ok && self.chain_ok
    }
}

fn hash_from_oid(oid: &Oid) -> Option<HashAlgo> {
    Some(match *oid {
        ID_SHA1 => HashAlgo::Sha1,
        ID_SHA224 => HashAlgo::Sha224,
        ID_SHA256 => HashAlgo::Sha256,
        ID_SHA384 => HashAlgo::Sha384,
        ID_SHA512 => HashAlgo::Sha512,
        _ => return None,
    })
}

/// Signature algorithm → (digest, is_ecdsa); rsaEncryption defers the digest
/// to the SignerInfo's digest algorithm.
fn signature_scheme(oid: &Oid) -> Option<(Option<HashAlgo>, bool)> {
    Some(match *oid {
        ID_RSA_ENCRYPTION => (None, false),
        SHA1_WITH_RSA => (Some(HashAlgo::Sha1), false),
        SHA224_WITH_RSA => (Some(HashAlgo::Sha224), false),
        SHA256_WITH_RSA => (Some(HashAlgo::Sha256), false),
        SHA384_WITH_RSA => (Some(HashAlgo::Sha384), false),
        SHA512_WITH_RSA => (Some(HashAlgo::Sha512), false),
        ECDSA_WITH_SHA1 => (Some(HashAlgo::Sha1), true),
        ECDSA_WITH_SHA224 => (Some(HashAlgo::Sha224), true),
        ECDSA_WITH_SHA256 => (Some(HashAlgo::Sha256), true),
        ECDSA_WITH_SHA384 => (Some(HashAlgo::Sha384), true),
        ECDSA_WITH_SHA512 => (Some(HashAlgo::Sha512), true),
        _ => return None,
    })
}

/// Verify `signature` over `message` with the given scheme and key.
fn verify_with_key(
    spki: &SubjectPublicKeyInfo,
    scheme_oid: &Oid,
    fallback_digest: Option<HashAlgo>,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let (digest, is_ecdsa) = signature_scheme(scheme_oid)
        .ok_or_else(|| Error::Parse(format!("unsupported signature algorithm {scheme_oid}")))?;
    let digest = digest
        .or(fallback_digest)
        .ok_or(Error::Parse("no digest algorithm for rsaEncryption".into()))?;
    if is_ecdsa {
        let (curve, point) = spki.ec_key()?;
        let sig = EcdsaSignature::from_der(signature)
            .or_else(|_| EcdsaSignature::from_plain(signature))?;
        EcdsaPublicKey::new(&curve, point).verify(&digest.digest(message), &sig)
    } else {
        spki.rsa_key()?.verify_pkcs1_v15(digest, message, signature)
    }
}

fn spki_from_x509(cert: &Certificate) -> Result<SubjectPublicKeyInfo> {
    let der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(Error::from)?;
    SubjectPublicKeyInfo::from_der(&der).map_err(Error::from)
}

/// Verify the whole document: SOD hash table, CMS signature, and the chain
/// from the Document Signer to a CSCA in the provided master list.
pub fn verify_document(
    sod: &EfSod,
    data_groups: &BTreeMap<DataGroupId, DataGroup>,
    master_list: Option<&[u8]>,
) -> PassiveReport {
    let mut report = PassiveReport::default();

    let lso = match sod.lds_security_object() {
        Ok(lso) => lso,
        Err(err) => {
            report.errors.push(format!("EF.SOD security object: {err}"));
            return report;
        }
    };
    let Some(algo) = lso.hash_algorithm.hash_algo() else {
        report.errors.push("unsupported SOD hash algorithm".into());
        return report;
    };

    // Per-DG hash comparison against the SOD table.
    report.data_group_hashes_ok = true;
    for (id, dg) in data_groups {
        let Some(number) = id.number() else { continue };
        match lso.hash_for_dg(number) {
            Some(expected) if expected == dg.hash(algo).as_slice() => {
                debug!(%id, "data group hash matches SOD");
            }
            Some(_) => {
                report.data_group_hashes_ok = false;
                report.errors.push(format!("{id}: hash mismatch against SOD"));
            }
            None => {
                report.data_group_hashes_ok = false;
                report.errors.push(format!("{id}: missing from SOD hash table"));
            }
        }
    }

    // CMS signature by the Document Signer.
    match verify_sod_signature(sod) {
        Ok(dsc) => {
            report.sod_signature_ok = true;
            report.document_signer = dsc.to_der().ok();
            // Chain to a trusted CSCA.
            match verify_chain(&dsc, master_list) {
                Ok(()) => report.chain_ok = true,
                Err(err) => report.errors.push(format!("certificate chain: {err}")),
            }
        }
        Err(err) => {
            report.errors.push(format!("SOD signature: {err}"));
        }
    }

    report
}

/// Verify the SignedData signature and return the Document Signer cert.
fn verify_sod_signature(sod: &EfSod) -> Result<Certificate> {
    let signed_data = sod.signed_data();
    let signer = sod.signer_info().map_err(Error::from)?;

    let certificates = signed_data
        .certificates
        .as_ref()
        .ok_or(Error::Parse("SOD carries no certificates".into()))?;
    let dsc = first_certificate(certificates.0.as_slice())
        .ok_or(Error::Parse("no Document Signer Certificate in SOD".into()))?
        .clone();
    let spki = spki_from_x509(&dsc)?;

    let econtent = signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or(Error::Parse("SOD has no encapsulated content".into()))?
        .decode_as::<OctetString>()
        .map_err(Error::from)?;

    let digest_algo = hash_from_oid(&signer.digest_alg.oid)
        .ok_or(Error::Parse("unsupported signer digest algorithm".into()))?;

    // With signed attributes, the signature covers their DER and the
    // messageDigest attribute must match the content hash. RFC 5652 5.4.
    let message = match &signer.signed_attrs {
        Some(attrs) => {
            let content_hash = digest_algo.digest(econtent.as_bytes());
            let digest_attr = attrs
                .iter()
                .find(|attr| attr.oid == ID_MESSAGE_DIGEST)
                .ok_or(Error::Parse("missing messageDigest attribute".into()))?;
            let value = digest_attr
                .values
                .as_slice()
                .first()
                .ok_or(Error::Parse("empty messageDigest attribute".into()))?
                .decode_as::<OctetString>()
                .map_err(Error::from)?;
            if value.as_bytes() != content_hash.as_slice() {
                return Err(Error::PassiveAuthentication(
                    "messageDigest does not match content".into(),
                ));
            }
            attrs.to_der().map_err(Error::from)?
        }
        None => econtent.as_bytes().to_vec(),
    };

    verify_with_key(
        &spki,
        &signer.signature_algorithm.oid,
        Some(digest_algo),
        &message,
        signer.signature.as_bytes(),
    )
    .map_err(|err| Error::PassiveAuthentication(format!("signature invalid: {err}")))?;
    Ok(dsc)
}

/// Chain the DSC to a CSCA: the embedded certificates first, then the host
/// provided master list, matching on issuer name.
fn verify_chain(dsc: &Certificate, master_list: Option<&[u8]>) -> Result<()> {
    let Some(blob) = master_list else {
        return Err(Error::PassiveAuthentication(
            "no master list provided".into(),
        ));
    };
    let list = MasterList::from_der(blob).map_err(Error::from)?;
    let cscas = list.csca_certificates().map_err(Error::from)?;

    let issuer = &dsc.tbs_certificate.issuer;
    let tbs = dsc.tbs_certificate.to_der().map_err(Error::from)?;
    for csca in cscas.cert_list.iter() {
        if &csca.tbs_certificate.subject != issuer {
            continue;
        }
        let spki = match spki_from_x509(csca) {
            Ok(spki) => spki,
            Err(err) => {
                warn!(%err, "skipping CSCA with unsupported key");
                continue;
            }
        };
        let signature = dsc
            .signature
            .as_bytes()
            .ok_or(Error::Parse("certificate signature not octet aligned".into()))?;
        return verify_with_key(
            &spki,
            &dsc.signature_algorithm.oid,
            None,
            &tbs,
            signature,
        )
        .map_err(|err| Error::PassiveAuthentication(format!("CSCA verification: {err}")));
    }
    Err(Error::PassiveAuthentication(
        "no CSCA matches the Document Signer issuer".into(),
    ))
}
