// Path: crates/crypto/src/sign/mask.rs
//! Participation bitmask for threshold signatures.
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8` (least significant
//! first) and marks that `public_keys[i]` contributed to the aggregate.

use crate::error::CryptoError;

/// Number of bytes a mask over `n` signers occupies.
pub const fn mask_len(n: usize) -> usize {
    n.div_ceil(8)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipationMask {
    bits: Vec<u8>,
    len: usize,
}

impl ParticipationMask {
    /// An empty mask over `len` signers.
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0u8; mask_len(len)],
            len,
        }
    }

    /// Parses a mask over `len` signers. Bits beyond `len` must be clear.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self, CryptoError> {
        if bytes.len() != mask_len(len) {
            return Err(CryptoError::InvalidLength {
                expected: mask_len(len),
                got: bytes.len(),
            });
        }
        let mask = Self {
            bits: bytes.to_vec(),
            len,
        };
        let padding = (len..mask_len(len) * 8).any(|i| mask.bit(i));
        if padding {
            return Err(CryptoError::OperationFailed(
                "mask has bits set beyond the key set".into(),
            ));
        }
        Ok(mask)
    }

    fn bit(&self, i: usize) -> bool {
        self.bits
            .get(i / 8)
            .map(|b| b & (1 << (i % 8)) != 0)
            .unwrap_or(false)
    }

    /// Marks signer `i` as participating.
    pub fn set(&mut self, i: usize) -> Result<(), CryptoError> {
        if i >= self.len {
            return Err(CryptoError::OperationFailed(format!(
                "signer index {i} outside mask of {}",
                self.len
            )));
        }
        if let Some(byte) = self.bits.get_mut(i / 8) {
            *byte |= 1 << (i % 8);
        }
        Ok(())
    }

    /// Whether signer `i` participated.
    pub fn is_set(&self, i: usize) -> bool {
        i < self.len && self.bit(i)
    }

    /// Number of participating signers.
    pub fn count(&self) -> usize {
        self.indices().count()
    }

    /// Indices of participating signers, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|i| self.bit(*i))
    }

    /// Size of the key set the mask covers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mask covers no signers.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_lsb_first() {
        let mut mask = ParticipationMask::new(10);
        mask.set(0).unwrap();
        mask.set(9).unwrap();
        assert_eq!(mask.as_bytes(), &[0b0000_0001, 0b0000_0010]);
        assert_eq!(mask.indices().collect::<Vec<_>>(), vec![0, 9]);
        assert_eq!(mask.count(), 2);
        assert!(mask.set(10).is_err());
    }

    #[test]
    fn test_padding_bits_rejected() {
        assert!(ParticipationMask::from_bytes(&[0b0001_0000], 4).is_err());
        assert!(ParticipationMask::from_bytes(&[0b0000_1000], 4).is_ok());
        assert!(ParticipationMask::from_bytes(&[0, 0], 4).is_err());
    }
}
