//! Data model for the plaintext/signed revocation digest pair exchanged
//! between the CA and its Loggers, and the builder that assembles one
//! from a CRV, a delta, a timestamp and a signing capability.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crv::Crv;
use crate::errors::CaError;
use crate::signer::Signer;

pub const LETS_REVOKE: &str = "Let's-Revoke";

/// The "plaintext" half of an SRD message: what was revoked, for whom,
/// at what time, as a compressed CRV delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationData {
    pub entity_id: String,
    pub rev_type: String,
    pub timestamp: u64,
    /// xz-compressed canonical CRV delta bytes, base64-encoded on the
    /// wire by serde's default `Vec<u8>` handling would produce a JSON
    /// array of numbers; we encode explicitly as base64 for a compact,
    /// JSON-friendly representation.
    #[serde(with = "base64_bytes")]
    pub compressed_delta: Vec<u8>,
}

/// `(timestamp, H(compressed(CRV)), H(compressed(Delta)))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationDigest {
    pub timestamp: u64,
    #[serde(with = "hex_bytes")]
    pub crv_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub crv_delta_hash: Vec<u8>,
}

impl RevocationDigest {
    /// Canonical byte serialization that gets signed. Fixed field
    /// order and fixed-width lengths so the same digest always signs
    /// to the same bytes regardless of serde/JSON formatting choices.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 32 + 32);
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.crv_hash);
        out.extend_from_slice(&self.crv_delta_hash);
        out
    }
}

/// `(entityID, RevocationDigest, Signature)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRevocationDigest {
    pub entity_id: String,
    pub rev_digest: RevocationDigest,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

/// The unit exchanged between CA and Loggers: `(RevocationData, SRD)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrdWithRevData {
    pub rev_data: RevocationData,
    pub srd: SignedRevocationDigest,
}

/// The CA's SRD for the current timestamp plus every Logger SRD
/// collected for that same slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationStatus {
    pub ca_srd: SrdWithRevData,
    pub log_srds: Vec<SrdWithRevData>,
}

fn sha256(bytes: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().to_vec()
}

/// `BuildSRD(crv, delta, timestamp, entityID, signer) -> SRDWithRevData`.
/// `hashAlgo` is fixed to SHA-256 throughout this system, so it isn't
/// threaded through as a parameter.
pub fn build_srd(
    crv: &Crv,
    delta: &Crv,
    timestamp: u64,
    entity_id: &str,
    signer: &dyn Signer,
) -> Result<SrdWithRevData, CaError> {
    let compressed_crv = crv.compress().map_err(|e| wrap_compression(e))?;
    let compressed_delta = delta.compress().map_err(|e| wrap_compression(e))?;

    let rev_data = RevocationData {
        entity_id: entity_id.to_string(),
        rev_type: LETS_REVOKE.to_string(),
        timestamp,
        compressed_delta: compressed_delta.clone(),
    };

    let rev_digest = RevocationDigest {
        timestamp,
        crv_hash: sha256(&compressed_crv),
        crv_delta_hash: sha256(&compressed_delta),
    };

    let signature = signer.sign(&rev_digest.canonical_bytes())?;

    let srd = SignedRevocationDigest {
        entity_id: entity_id.to_string(),
        rev_digest,
        signature,
    };

    Ok(SrdWithRevData { rev_data, srd })
}

fn wrap_compression(e: CaError) -> CaError {
    match e {
        CaError::Crypto { source, .. } => CaError::crypto("compression", source),
        other => other,
    }
}

/// Verify an SRD's signature against a Logger's (or the CA's own)
/// known public key. Mutating any field of `srd.rev_digest` changes
/// `canonical_bytes()` and so must cause this to fail.
pub fn verify_srd_signature(srd: &SignedRevocationDigest, public_key: &[u8]) -> Result<(), CaError> {
    crate::signer::verify(
        public_key,
        &srd.rev_digest.canonical_bytes(),
        &srd.signature,
    )
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::Ed25519Signer;

    fn test_signer() -> Ed25519Signer {
        let pkcs8 = Ed25519Signer::generate_pkcs8().unwrap();
        Ed25519Signer::from_pkcs8(&pkcs8).unwrap()
    }

    #[test]
    fn signature_validates_against_public_key() {
        let signer = test_signer();
        let crv = Crv::create(&[1, 2, 3], 0);
        let delta = Crv::create(&[4], 0);
        let srd = build_srd(&crv, &delta, 1000, "ca-1", &signer).unwrap();

        verify_srd_signature(&srd.srd, &signer.public_key_bytes()).unwrap();
    }

    #[test]
    fn mutated_digest_fails_verification() {
        let signer = test_signer();
        let crv = Crv::create(&[1, 2, 3], 0);
        let delta = Crv::create(&[4], 0);
        let mut srd = build_srd(&crv, &delta, 1000, "ca-1", &signer).unwrap();

        srd.srd.rev_digest.timestamp = 1;
        let err = verify_srd_signature(&srd.srd, &signer.public_key_bytes()).unwrap_err();
        assert!(matches!(err, CaError::BadSignature));
    }
}
