// Path: crates/crypto/src/dkg/vss.rs
//! Joint-Feldman verifiable secret sharing.
//!
//! Every node deals a random polynomial. Node `j` receives share `P_d(x_j)`
//! from each dealer `d` together with the dealer's commitments, checks
//! `P_d(x_j)·G == Σ C_{d,k}·x_j^k`, and sums the qualified deals into its
//! share of the joint secret. The joint public polynomial is the sum of the
//! dealers' commitments and its constant term is the group key `X`.

use super::group::{decode_point, decode_scalar, encode_point, encode_scalar};
use super::poly::{PriPoly, PubPoly};
use crate::error::CryptoError;
use cohort_types::tdh::DkgShareRecord;
use k256::{ProjectivePoint, Scalar};
use parity_scale_codec::{Decode, Encode};
use zeroize::Zeroize;

/// One dealer's contribution, addressed to every node.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    /// Roster index of the dealer.
    pub dealer: u32,
    /// Commitments to the dealer's coefficients.
    pub commitments: Vec<Vec<u8>>,
    /// `shares[j]` is the encoded share for roster index `j`.
    pub shares: Vec<Vec<u8>>,
}

/// What one node receives from one dealer.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct DealShare {
    pub dealer: u32,
    pub commitments: Vec<Vec<u8>>,
    pub share: Vec<u8>,
}

impl Deal {
    /// Deals a fresh random polynomial of degree `threshold - 1` to `n` nodes.
    pub fn generate(dealer: u32, n: usize, threshold: usize) -> Result<Self, CryptoError> {
        if threshold > n {
            return Err(CryptoError::ThresholdNotMet {
                needed: threshold,
                got: n,
            });
        }
        let poly = PriPoly::random(threshold)?;
        let commitments = poly.commit().commits().iter().map(encode_point).collect();
        let shares = (0..n as u32)
            .map(|j| encode_scalar(&poly.share(j)))
            .collect();
        Ok(Self {
            dealer,
            commitments,
            shares,
        })
    }

    /// The part of this deal addressed to `index`.
    pub fn share_for(&self, index: u32) -> Option<DealShare> {
        self.shares.get(index as usize).map(|share| DealShare {
            dealer: self.dealer,
            commitments: self.commitments.clone(),
            share: share.clone(),
        })
    }
}

fn decode_pub_poly(commitments: &[Vec<u8>]) -> Result<PubPoly, CryptoError> {
    let commits = commitments
        .iter()
        .map(|c| decode_point(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PubPoly::new(commits))
}

/// Checks one received share against its dealer's commitments.
pub fn verify_deal_share(
    share: &DealShare,
    index: u32,
    threshold: usize,
) -> Result<(Scalar, PubPoly), CryptoError> {
    let public = decode_pub_poly(&share.commitments)?;
    if public.threshold() != threshold {
        return Err(CryptoError::OperationFailed(format!(
            "dealer {} committed to {} coefficients, expected {threshold}",
            share.dealer,
            public.threshold()
        )));
    }
    let secret = decode_scalar(&share.share)?;
    if ProjectivePoint::GENERATOR * secret != public.eval(index) {
        return Err(CryptoError::VerificationFailed);
    }
    Ok((secret, public))
}

/// This node's view of a finished DKG: its secret share and the joint public polynomial.
#[derive(Clone)]
pub struct DistKeyShare {
    pub index: u32,
    pub n: u32,
    secret: Scalar,
    public: PubPoly,
}

impl DistKeyShare {
    /// Combines the qualified deals addressed to `index`. Every share must verify.
    pub fn combine(
        index: u32,
        n: usize,
        threshold: usize,
        shares: &[DealShare],
    ) -> Result<Self, CryptoError> {
        if shares.len() < threshold {
            return Err(CryptoError::ThresholdNotMet {
                needed: threshold,
                got: shares.len(),
            });
        }
        let mut secret = Scalar::ZERO;
        let mut public: Option<PubPoly> = None;
        for share in shares {
            let (s, p) = verify_deal_share(share, index, threshold)?;
            secret += s;
            public = Some(match public {
                Some(acc) => &acc + &p,
                None => p,
            });
        }
        let public =
            public.ok_or(CryptoError::ThresholdNotMet { needed: threshold, got: 0 })?;
        Ok(Self {
            index,
            n: n as u32,
            secret,
            public,
        })
    }

    pub fn secret(&self) -> &Scalar {
        &self.secret
    }

    pub fn public_poly(&self) -> &PubPoly {
        &self.public
    }

    /// The group public key `X`.
    pub fn public_key(&self) -> ProjectivePoint {
        self.public.public_key()
    }

    pub fn threshold(&self) -> usize {
        self.public.threshold()
    }

    /// The persisted form.
    pub fn to_record(&self) -> DkgShareRecord {
        DkgShareRecord {
            index: self.index,
            n: self.n,
            threshold: self.public.threshold() as u32,
            secret_share: encode_scalar(&self.secret),
            commitments: self.public.commits().iter().map(encode_point).collect(),
            public_key: encode_point(&self.public_key()),
        }
    }

    /// Restores a share from its persisted form.
    pub fn from_record(record: &DkgShareRecord) -> Result<Self, CryptoError> {
        let public = decode_pub_poly(&record.commitments)?;
        if public.threshold() != record.threshold as usize {
            return Err(CryptoError::OperationFailed(
                "record threshold disagrees with commitments".into(),
            ));
        }
        let secret = decode_scalar(&record.secret_share)?;
        if ProjectivePoint::GENERATOR * secret != public.eval(record.index) {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(Self {
            index: record.index,
            n: record.n,
            secret,
            public,
        })
    }
}

impl Drop for DistKeyShare {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}
