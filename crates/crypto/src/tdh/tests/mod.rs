// Path: crates/crypto/src/tdh/tests/mod.rs
use super::*;
use crate::dkg::group::decode_point;
use crate::dkg::{Deal, DealShare};

fn run_dkg(n: usize, threshold: usize) -> Vec<DistKeyShare> {
    let deals: Vec<Deal> = (0..n as u32)
        .map(|d| Deal::generate(d, n, threshold).unwrap())
        .collect();
    (0..n as u32)
        .map(|j| {
            let shares: Vec<DealShare> = deals.iter().map(|d| d.share_for(j).unwrap()).collect();
            DistKeyShare::combine(j, n, threshold, &shares).unwrap()
        })
        .collect()
}

fn decrypt_with(
    keys: &[DistKeyShare],
    who: &[usize],
    ct: &Ciphertext,
    xc: Option<&ProjectivePoint>,
) -> Result<DecryptReply, CryptoError> {
    let u = decode_point(&ct.u)?;
    let public = keys[0].public_poly();
    let mut points = Vec::new();
    for i in who {
        let share = create_share(&keys[*i], &u, xc)?;
        points.push((share.index, verify_share(&share, public, &u, xc)?));
    }
    let xhat_enc = combine_shares(&points, keys[0].threshold())?;
    Ok(DecryptReply {
        c: ct.c.clone(),
        x: encode_point(&keys[0].public_key()),
        xhat_enc: encode_point(&xhat_enc),
    })
}

#[test]
fn test_go_badgers_any_seven_of_ten() {
    let keys = run_dkg(10, 7);
    let x = keys[0].public_key();
    let ct = encrypt(&x, b"generator seed", b"Go Badgers!").unwrap();

    for who in [[0usize, 1, 2, 3, 4, 5, 6], [9, 8, 7, 6, 5, 4, 3], [0, 2, 4, 6, 8, 9, 1]] {
        let reply = decrypt_with(&keys, &who, &ct, None).unwrap();
        assert_eq!(recover_plaintext(&reply, None).unwrap(), b"Go Badgers!".to_vec());
    }
}

#[test]
fn test_six_of_ten_is_not_enough() {
    let keys = run_dkg(10, 7);
    let ct = encrypt(&keys[0].public_key(), b"seed", b"Go Badgers!").unwrap();
    let err = decrypt_with(&keys, &[0, 1, 2, 3, 4, 5], &ct, None).unwrap_err();
    assert!(matches!(err, CryptoError::ThresholdNotMet { needed: 7, got: 6 }));
}

#[test]
fn test_recipient_mode_needs_recipient_secret() {
    let keys = run_dkg(4, 3);
    let ct = encrypt(&keys[0].public_key(), b"seed", b"sealed bid").unwrap();
    let xc = random_scalar();
    let xc_point = ProjectivePoint::GENERATOR * xc;

    let reply = decrypt_with(&keys, &[1, 2, 3], &ct, Some(&xc_point)).unwrap();
    assert_eq!(
        recover_plaintext(&reply, Some(&xc)).unwrap(),
        b"sealed bid".to_vec()
    );
    // The coordinator alone cannot strip the blinding.
    assert_ne!(
        recover_plaintext(&reply, None).ok(),
        Some(b"sealed bid".to_vec())
    );
}

#[test]
fn test_forged_share_fails_proof() {
    let keys = run_dkg(4, 3);
    let ct = encrypt(&keys[0].public_key(), b"seed", b"x").unwrap();
    let u = decode_point(&ct.u).unwrap();

    let mut share = create_share(&keys[1], &u, None).unwrap();
    share.v = encode_point(&(decode_point(&share.v).unwrap() + ProjectivePoint::GENERATOR));
    assert!(verify_share(&share, keys[0].public_poly(), &u, None).is_err());

    // A valid share presented under another node's index also fails.
    let mut moved = create_share(&keys[1], &u, None).unwrap();
    moved.index = 2;
    assert!(verify_share(&moved, keys[0].public_poly(), &u, None).is_err());
}

#[test]
fn test_ciphertext_proof() {
    let keys = run_dkg(3, 2);
    let ct = encrypt(&keys[0].public_key(), b"seed", b"hello").unwrap();
    assert!(verify_ciphertext(&ct, b"seed").is_ok());
    assert!(verify_ciphertext(&ct, b"other seed").is_err());

    let mut tampered = ct.clone();
    tampered.c = encode_point(&(decode_point(&ct.c).unwrap() + ProjectivePoint::GENERATOR));
    assert!(verify_ciphertext(&tampered, b"seed").is_err());
}
