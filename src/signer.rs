//! Signing capability. The CA treats signing as an opaque capability
//! — callers never reach into key material directly, only
//! through `Signer::sign`/`Verifier::verify`, so a HSM- or YubiKey-backed
//! implementation can be swapped in without touching the pipeline.

use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use zeroize::Zeroizing;

use crate::errors::CaError;

pub trait Signer: Send + Sync {
    /// Sign the canonical bytes of a `RevocationDigest`. The signer is
    /// responsible for treating `bytes` as already being in canonical
    /// form — it does not re-serialize anything.
    fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>, CaError>;

    fn public_key_bytes(&self) -> Vec<u8>;
}

/// Ed25519 signer backed by `ring`. Safe for concurrent `sign` calls:
/// `Ed25519KeyPair::sign` takes `&self` and holds no interior mutable
/// state.
pub struct Ed25519Signer {
    key_pair: Ed25519KeyPair,
}

impl Ed25519Signer {
    /// Parses a PKCS#8 v2 encoded Ed25519 private key, as produced by
    /// `Ed25519Signer::generate_pkcs8` or any compatible tooling. The
    /// raw bytes are wrapped in `Zeroizing` so the buffer is scrubbed
    /// as soon as parsing is done with it.
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self, CaError> {
        let pkcs8 = Zeroizing::new(pkcs8.to_vec());
        let key_pair = Ed25519KeyPair::from_pkcs8(&pkcs8)
            .map_err(|e| CaError::crypto("key-parse", anyhow::anyhow!("{e}")))?;
        Ok(Self { key_pair })
    }

    pub fn generate_pkcs8() -> Result<Vec<u8>, CaError> {
        let rng = SystemRandom::new();
        let doc = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|e| CaError::crypto("key-generate", anyhow::anyhow!("{e}")))?;
        Ok(doc.as_ref().to_vec())
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>, CaError> {
        Ok(self.key_pair.sign(bytes).as_ref().to_vec())
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.key_pair.public_key().as_ref().to_vec()
    }
}

/// Verify a signature produced by an `Ed25519Signer`'s counterpart,
/// given the signer's raw public key bytes.
pub fn verify(public_key: &[u8], bytes: &[u8], signature: &[u8]) -> Result<(), CaError> {
    let key = UnparsedPublicKey::new(&ED25519, public_key);
    key.verify(bytes, signature)
        .map_err(|_| CaError::BadSignature)
}
