// Path: crates/crypto/src/dkg/group.rs
//! secp256k1 group helpers: canonical encodings, hashing to scalars and
//! embedding short byte strings into curve points.
//!
//! Points are compressed SEC1 (33 bytes); scalars are 32 big-endian bytes.

use crate::error::CryptoError;
use cohort_types::digest::sha256;
use k256::elliptic_curve::ff::{Field, PrimeField};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar, U256};
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of a compressed point.
pub const POINT_LEN: usize = 33;
/// Length of an encoded scalar.
pub const SCALAR_LEN: usize = 32;
/// Longest byte string `embed` accepts. One x-coordinate byte holds the
/// length and at least two stay random so a valid point is found quickly.
pub const EMBED_MAX: usize = 29;

const EMBED_ATTEMPTS: usize = 1024;

pub fn random_scalar() -> Scalar {
    Scalar::random(&mut OsRng)
}

pub fn encode_point(p: &ProjectivePoint) -> Vec<u8> {
    p.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

pub fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    if bytes.len() != POINT_LEN {
        return Err(CryptoError::InvalidLength {
            expected: POINT_LEN,
            got: bytes.len(),
        });
    }
    let encoded =
        EncodedPoint::from_bytes(bytes).map_err(|e| CryptoError::InvalidPoint(e.to_string()))?;
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .map(ProjectivePoint::from)
        .ok_or_else(|| CryptoError::InvalidPoint("not on secp256k1".into()))
}

pub fn encode_scalar(s: &Scalar) -> Vec<u8> {
    s.to_bytes().to_vec()
}

pub fn decode_scalar(bytes: &[u8]) -> Result<Scalar, CryptoError> {
    if bytes.len() != SCALAR_LEN {
        return Err(CryptoError::InvalidLength {
            expected: SCALAR_LEN,
            got: bytes.len(),
        });
    }
    Option::<Scalar>::from(Scalar::from_repr(*FieldBytes::from_slice(bytes)))
        .ok_or_else(|| CryptoError::InvalidScalar("not reduced modulo n".into()))
}

/// SHA-256 over the concatenated compressed points, reduced modulo the group order.
pub fn hash_points_to_scalar(points: &[&ProjectivePoint]) -> Result<Scalar, CryptoError> {
    let mut buf = Vec::with_capacity(points.len() * POINT_LEN);
    for p in points {
        buf.extend_from_slice(&encode_point(p));
    }
    let digest = sha256(&buf)?;
    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(
        digest,
    )))
}

/// Tries `x` as an x-coordinate with the given parity prefix.
fn point_from_x(prefix: u8, x: &[u8; 32]) -> Option<ProjectivePoint> {
    let mut bytes = Vec::with_capacity(POINT_LEN);
    bytes.push(prefix);
    bytes.extend_from_slice(x);
    let encoded = EncodedPoint::from_bytes(&bytes).ok()?;
    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded)).map(ProjectivePoint::from)
}

/// Embeds `data` into a point: x = `len || data || random`, retried until
/// `x` is on the curve.
pub fn embed(data: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    if data.len() > EMBED_MAX {
        return Err(CryptoError::MessageTooLong {
            max: EMBED_MAX,
            got: data.len(),
        });
    }
    let mut x = [0u8; 32];
    let body = x
        .get_mut(1..=data.len())
        .ok_or_else(|| CryptoError::OperationFailed("embed buffer".into()))?;
    body.copy_from_slice(data);
    x[0] = data.len() as u8;

    for _ in 0..EMBED_ATTEMPTS {
        if let Some(pad) = x.get_mut(1 + data.len()..) {
            OsRng.fill_bytes(pad);
        }
        let prefix = 0x02 | (OsRng.next_u32() as u8 & 1);
        if let Some(p) = point_from_x(prefix, &x) {
            return Ok(p);
        }
    }
    Err(CryptoError::OperationFailed(
        "no curve point found for embedded data".into(),
    ))
}

/// Recovers the bytes `embed` placed in a point.
pub fn unembed(p: &ProjectivePoint) -> Result<Vec<u8>, CryptoError> {
    let encoded = encode_point(p);
    let x = encoded
        .get(1..)
        .ok_or_else(|| CryptoError::InvalidPoint("identity carries no data".into()))?;
    let len = *x
        .first()
        .ok_or_else(|| CryptoError::InvalidPoint("identity carries no data".into()))?
        as usize;
    if len > EMBED_MAX {
        return Err(CryptoError::InvalidPoint(format!(
            "embedded length {len} out of range"
        )));
    }
    x.get(1..=len)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| CryptoError::InvalidPoint("truncated embedding".into()))
}

/// A generator derived deterministically from `seed`: the first
/// `H(seed || counter)` that is a valid even-parity x-coordinate.
pub fn generator_from_seed(seed: &[u8]) -> Result<ProjectivePoint, CryptoError> {
    for counter in 0u32..EMBED_ATTEMPTS as u32 {
        let mut input = seed.to_vec();
        input.extend_from_slice(&counter.to_le_bytes());
        let x = sha256(&input)?;
        if let Some(p) = point_from_x(0x02, &x) {
            return Ok(p);
        }
    }
    Err(CryptoError::OperationFailed(
        "no generator found for seed".into(),
    ))
}
