// Path: crates/crypto/src/tdh/mod.rs
//! Threshold ElGamal decryption (TDH).
//!
//! A client encrypts to the group key `X`: `U = r·G`, `C = r·X + M`. To
//! decrypt, each node publishes `V_i = x_i·U'` where `U' = U` or
//! `U' = U + Xc` for a recipient key `Xc = xc·G`, with a Schnorr-style proof
//! that `V_i` uses the same `x_i` its public share `x_i·G` commits to. Any
//! `t` valid shares interpolate to `x·U'`; only the holder of `xc` can strip
//! the blinding in recipient mode.

use crate::dkg::group::{
    decode_point, decode_scalar, embed, encode_point, encode_scalar, generator_from_seed,
    hash_points_to_scalar, random_scalar, unembed,
};
use crate::dkg::poly::{recover_commit, PubPoly};
use crate::dkg::DistKeyShare;
use crate::error::CryptoError;
use cohort_types::tdh::{Ciphertext, DecryptReply};
use k256::{ProjectivePoint, Scalar};
use parity_scale_codec::{Decode, Encode};

/// Encrypts `message` (at most `EMBED_MAX` bytes) to the group key.
///
/// `seed` derives the second generator `Ḡ` that the well-formedness proof
/// `(E, F)` is built over: `E = H(C, U, Ū, s·G, s·Ḡ)`, `F = s + E·r`.
pub fn encrypt(
    public_key: &ProjectivePoint,
    seed: &[u8],
    message: &[u8],
) -> Result<Ciphertext, CryptoError> {
    let m = embed(message)?;
    let r = random_scalar();
    let u = ProjectivePoint::GENERATOR * r;
    let c = *public_key * r + m;

    let g_bar = generator_from_seed(seed)?;
    let u_bar = g_bar * r;
    let s = random_scalar();
    let w = ProjectivePoint::GENERATOR * s;
    let w_bar = g_bar * s;
    let e = hash_points_to_scalar(&[&c, &u, &u_bar, &w, &w_bar])?;
    let f = s + e * r;

    Ok(Ciphertext {
        u: encode_point(&u),
        ubar: encode_point(&u_bar),
        e: encode_scalar(&e),
        f: encode_scalar(&f),
        c: encode_point(&c),
    })
}

/// Checks a ciphertext's well-formedness proof for the generator seeded by `seed`.
///
/// Decrypting nodes do not call this; it is offered to clients and auditors.
pub fn verify_ciphertext(ct: &Ciphertext, seed: &[u8]) -> Result<(), CryptoError> {
    let u = decode_point(&ct.u)?;
    let u_bar = decode_point(&ct.ubar)?;
    let c = decode_point(&ct.c)?;
    let e = decode_scalar(&ct.e)?;
    let f = decode_scalar(&ct.f)?;
    let g_bar = generator_from_seed(seed)?;

    let w = ProjectivePoint::GENERATOR * f - u * e;
    let w_bar = g_bar * f - u_bar * e;
    if hash_points_to_scalar(&[&c, &u, &u_bar, &w, &w_bar])? == e {
        Ok(())
    } else {
        Err(CryptoError::VerificationFailed)
    }
}

/// `U + Xc` in recipient mode, `U` otherwise.
pub fn blinded_base(u: &ProjectivePoint, xc: Option<&ProjectivePoint>) -> ProjectivePoint {
    match xc {
        Some(xc) => *u + xc,
        None => *u,
    }
}

/// One node's decryption share with its proof.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ProvedShare {
    /// Roster index of the node.
    pub index: u32,
    /// `V_i = x_i·U'`.
    pub v: Vec<u8>,
    /// Challenge `E_i = H(V_i, s_i·U', s_i·G)`.
    pub e: Vec<u8>,
    /// Response `F_i = s_i + E_i·x_i`.
    pub f: Vec<u8>,
}

/// Computes this node's share of `x·U'` and proves it.
pub fn create_share(
    key: &DistKeyShare,
    u: &ProjectivePoint,
    xc: Option<&ProjectivePoint>,
) -> Result<ProvedShare, CryptoError> {
    let base = blinded_base(u, xc);
    let v = base * key.secret();
    let s = random_scalar();
    let u_hat = base * s;
    let h_hat = ProjectivePoint::GENERATOR * s;
    let e = hash_points_to_scalar(&[&v, &u_hat, &h_hat])?;
    let f = s + e * key.secret();
    Ok(ProvedShare {
        index: key.index,
        v: encode_point(&v),
        e: encode_scalar(&e),
        f: encode_scalar(&f),
    })
}

/// Verifies a share against the joint public polynomial and returns `V_i`.
///
/// Recomputes `Û = F·U' − E·V_i` and `Ĥ = F·G − E·(x_i·G)` and checks
/// `E == H(V_i, Û, Ĥ)`.
pub fn verify_share(
    share: &ProvedShare,
    public: &PubPoly,
    u: &ProjectivePoint,
    xc: Option<&ProjectivePoint>,
) -> Result<ProjectivePoint, CryptoError> {
    let v = decode_point(&share.v)?;
    let e = decode_scalar(&share.e)?;
    let f = decode_scalar(&share.f)?;
    let base = blinded_base(u, xc);
    let public_share = public.eval(share.index);

    let u_hat = base * f - v * e;
    let h_hat = ProjectivePoint::GENERATOR * f - public_share * e;
    if hash_points_to_scalar(&[&v, &u_hat, &h_hat])? == e {
        Ok(v)
    } else {
        Err(CryptoError::VerificationFailed)
    }
}

/// Interpolates `x·U'` from at least `threshold` verified shares.
pub fn combine_shares(
    shares: &[(u32, ProjectivePoint)],
    threshold: usize,
) -> Result<ProjectivePoint, CryptoError> {
    recover_commit(shares, threshold)
}

/// Removes the blinding from a decryption result and un-embeds the message.
///
/// Without a recipient key the plaintext point is `C − XhatEnc`. With one,
/// `XhatEnc = x·U + xc·X`, so the point is `C − (XhatEnc − xc·X)`.
pub fn recover_plaintext(reply: &DecryptReply, xc: Option<&Scalar>) -> Result<Vec<u8>, CryptoError> {
    let c = decode_point(&reply.c)?;
    let xhat_enc = decode_point(&reply.xhat_enc)?;
    let blinding = match xc {
        Some(xc) => {
            let x = decode_point(&reply.x)?;
            xhat_enc - x * xc
        }
        None => xhat_enc,
    };
    unembed(&(c - blinding))
}

#[cfg(test)]
mod tests;
