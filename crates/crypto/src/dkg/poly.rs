// Path: crates/crypto/src/dkg/poly.rs
//! Secret and public polynomials over secp256k1, and Lagrange recovery at zero.
//!
//! Share `i` (a zero-based roster index) is the evaluation at `x = i + 1`.

use super::group::random_scalar;
use crate::error::CryptoError;
use k256::{ProjectivePoint, Scalar};
use std::ops::Add;

/// The evaluation point of share `index`.
pub fn share_x(index: u32) -> Scalar {
    Scalar::from(u64::from(index) + 1)
}

/// A secret polynomial; `coeffs[0]` is the secret.
#[derive(Clone)]
pub struct PriPoly {
    /// Coefficients in ascending order of degree.
    coeffs: Vec<Scalar>,
}

impl PriPoly {
    /// A random polynomial of degree `threshold - 1`.
    pub fn random(threshold: usize) -> Result<Self, CryptoError> {
        if threshold == 0 {
            return Err(CryptoError::OperationFailed("threshold must be > 0".into()));
        }
        Ok(Self {
            coeffs: (0..threshold).map(|_| random_scalar()).collect(),
        })
    }

    /// Horner evaluation at `x`.
    pub fn eval_at(&self, x: &Scalar) -> Scalar {
        self.coeffs
            .iter()
            .rev()
            .fold(Scalar::ZERO, |acc, c| acc * x + c)
    }

    /// The share for roster index `index`.
    pub fn share(&self, index: u32) -> Scalar {
        self.eval_at(&share_x(index))
    }

    /// Commitments `c_k·G` to every coefficient.
    pub fn commit(&self) -> PubPoly {
        PubPoly {
            commits: self
                .coeffs
                .iter()
                .map(|c| ProjectivePoint::GENERATOR * c)
                .collect(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.coeffs.len()
    }
}

/// A public polynomial: commitments to a secret polynomial's coefficients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PubPoly {
    commits: Vec<ProjectivePoint>,
}

impl PubPoly {
    pub fn new(commits: Vec<ProjectivePoint>) -> Self {
        Self { commits }
    }

    /// The committed secret `c_0·G`, i.e. the group public key.
    pub fn public_key(&self) -> ProjectivePoint {
        self.commits
            .first()
            .copied()
            .unwrap_or(ProjectivePoint::IDENTITY)
    }

    /// The public share `P(x)·G` of roster index `index`.
    pub fn eval(&self, index: u32) -> ProjectivePoint {
        let x = share_x(index);
        self.commits
            .iter()
            .rev()
            .fold(ProjectivePoint::IDENTITY, |acc, c| acc * x + c)
    }

    pub fn commits(&self) -> &[ProjectivePoint] {
        &self.commits
    }

    pub fn threshold(&self) -> usize {
        self.commits.len()
    }
}

impl Add<&PubPoly> for &PubPoly {
    type Output = PubPoly;
    fn add(self, rhs: &PubPoly) -> PubPoly {
        let len = self.commits.len().max(rhs.commits.len());
        let commits = (0..len)
            .map(|i| {
                let a = self.commits.get(i).copied().unwrap_or(ProjectivePoint::IDENTITY);
                let b = rhs.commits.get(i).copied().unwrap_or(ProjectivePoint::IDENTITY);
                a + b
            })
            .collect();
        PubPoly { commits }
    }
}

/// Lagrange coefficient of share `index` for interpolation at zero over `indices`.
fn lagrange_at_zero(index: u32, indices: &[u32]) -> Result<Scalar, CryptoError> {
    let xi = share_x(index);
    let mut num = Scalar::ONE;
    let mut den = Scalar::ONE;
    for &j in indices.iter().filter(|j| **j != index) {
        let xj = share_x(j);
        num *= xj;
        den *= xj - xi;
    }
    let den_inv = Option::<Scalar>::from(den.invert())
        .ok_or_else(|| CryptoError::OperationFailed("duplicate share index".into()))?;
    Ok(num * den_inv)
}

/// Recovers `P(0)·B` from at least `threshold` public shares `(index, P(x_index)·B)`.
/// Only the first `threshold` shares are used; duplicate indices are rejected.
pub fn recover_commit(
    shares: &[(u32, ProjectivePoint)],
    threshold: usize,
) -> Result<ProjectivePoint, CryptoError> {
    if threshold == 0 || shares.len() < threshold {
        return Err(CryptoError::ThresholdNotMet {
            needed: threshold,
            got: shares.len(),
        });
    }
    let used = shares
        .get(..threshold)
        .ok_or(CryptoError::ThresholdNotMet {
            needed: threshold,
            got: shares.len(),
        })?;
    let indices: Vec<u32> = used.iter().map(|(i, _)| *i).collect();
    let mut acc = ProjectivePoint::IDENTITY;
    for (index, point) in used {
        acc += *point * lagrange_at_zero(*index, &indices)?;
    }
    Ok(acc)
}

/// Recovers the secret `P(0)` from at least `threshold` scalar shares.
pub fn recover_secret(shares: &[(u32, Scalar)], threshold: usize) -> Result<Scalar, CryptoError> {
    if threshold == 0 || shares.len() < threshold {
        return Err(CryptoError::ThresholdNotMet {
            needed: threshold,
            got: shares.len(),
        });
    }
    let used = shares.get(..threshold).unwrap_or(shares);
    let indices: Vec<u32> = used.iter().map(|(i, _)| *i).collect();
    used.iter().try_fold(Scalar::ZERO, |acc, (index, s)| {
        Ok(acc + *s * lagrange_at_zero(*index, &indices)?)
    })
}
