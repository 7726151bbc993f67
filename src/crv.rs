//! Certificate Revocation Vector: a bit-vector indexed by certificate
//! serial number, with a canonical, cross-host-deterministic compressed
//! encoding used both on the wire and as the input to the revocation
//! digest hash (see `srd.rs`).

use std::io::{Read, Write};

use bitvec::order::Lsb0;
use bitvec::vec::BitVec;

use crate::errors::CaError;

/// xz preset 6, no extreme flag, default filter chain. Fixed so that
/// the same CRV value compresses to the same bytes on every host —
/// the hash in the SRD is computed over these bytes, so the encoding
/// must be canonical, not just "whatever this host's writer emits".
const XZ_PRESET: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crv {
    bits: BitVec<u64, Lsb0>,
}

impl Crv {
    /// `CreateCRV(nums, minLength)`: a CRV of length
    /// `max(minLength, max(nums)) + 1` with exactly the bits in `nums` set.
    pub fn create(nums: &[u64], min_length: u64) -> Self {
        let max_num = nums.iter().copied().max().unwrap_or(0);
        let len = min_length.max(max_num) + 1;
        let mut bits = BitVec::<u64, Lsb0>::repeat(false, len as usize);
        for &n in nums {
            bits.set(n as usize, true);
        }
        Crv { bits }
    }

    /// `GetCRVDelta(nums)`: `CreateCRV(nums, 0)`, named separately for
    /// readability at call sites building the current interval's delta.
    pub fn delta(nums: &[u64]) -> Self {
        Self::create(nums, 0)
    }

    pub fn empty() -> Self {
        Crv {
            bits: BitVec::new(),
        }
    }

    /// `ApplyCRVDeltaToCRV(base, delta) -> base OR delta`. Returns a new
    /// value; never mutates either input (callers may hold a shared
    /// reference to `base` for concurrent reads).
    pub fn apply_delta(base: &Crv, delta: &Crv) -> Crv {
        let len = base.bits.len().max(delta.bits.len());
        let mut out = BitVec::<u64, Lsb0>::repeat(false, len);
        for i in base.bits.iter_ones() {
            out.set(i, true);
        }
        for i in delta.bits.iter_ones() {
            out.set(i, true);
        }
        Crv { bits: out }
    }

    pub fn to_nums(&self) -> Vec<u64> {
        self.bits.iter_ones().map(|i| i as u64).collect()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Canonical serialization: little-endian u64 bit-length, then the
    /// backing u64 words in order, little-endian. This, not the BitVec
    /// in-memory layout, is what gets xz-compressed and hashed.
    fn serialize(&self) -> Vec<u8> {
        let bit_len = self.bits.len() as u64;
        let words = self.bits.as_raw_slice();
        let mut out = Vec::with_capacity(8 + words.len() * 8);
        out.extend_from_slice(&bit_len.to_le_bytes());
        for word in words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out
    }

    fn deserialize(bytes: &[u8]) -> Result<Crv, CaError> {
        if bytes.len() < 8 {
            return Err(CaError::CorruptSerialization(
                "buffer shorter than bit-length prefix".into(),
            ));
        }
        let (len_bytes, rest) = bytes.split_at(8);
        let bit_len = u64::from_le_bytes(len_bytes.try_into().unwrap());
        if rest.len() % 8 != 0 {
            return Err(CaError::CorruptSerialization(
                "word payload is not a multiple of 8 bytes".into(),
            ));
        }
        let expected_words = bit_len.div_ceil(64) as usize;
        if rest.len() / 8 != expected_words {
            return Err(CaError::CorruptSerialization(format!(
                "word count {} does not match declared bit length {}",
                rest.len() / 8,
                bit_len
            )));
        }
        let mut words = Vec::with_capacity(expected_words);
        for chunk in rest.chunks_exact(8) {
            words.push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }
        let mut bits: BitVec<u64, Lsb0> = BitVec::from_vec(words);
        bits.truncate(bit_len as usize);
        Ok(Crv { bits })
    }

    /// `CompressCRV(CRV) -> bytes`: canonical serialization, then xz.
    pub fn compress(&self) -> Result<Vec<u8>, CaError> {
        let plain = self.serialize();
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), XZ_PRESET);
        encoder
            .write_all(&plain)
            .map_err(|e| CaError::crypto("crv-compress", e))?;
        encoder
            .finish()
            .map_err(|e| CaError::crypto("crv-compress", e))
    }

    /// `DecompressCRV(bytes) -> CRV`: inverse of `compress`.
    pub fn decompress(bytes: &[u8]) -> Result<Crv, CaError> {
        let mut decoder = xz2::read::XzDecoder::new(bytes);
        let mut plain = Vec::new();
        decoder
            .read_to_end(&mut plain)
            .map_err(|e| CaError::CorruptCompression(e.to_string()))?;
        Crv::deserialize(&plain)
    }

    pub fn equals(a: &Crv, b: &Crv) -> bool {
        a.to_nums() == b.to_nums()
    }
}
