// Path: crates/crypto/src/dkg/tests/mod.rs
use super::group::encode_scalar;
use super::poly::recover_secret;
use super::*;
use k256::ProjectivePoint;

/// Runs every dealer locally and combines the deals for each node.
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

#[test]
fn test_all_nodes_agree_on_group_key() {
    let shares = run_dkg(5, 3);
    let x = shares[0].public_key();
    assert!(shares.iter().all(|s| s.public_key() == x));
    assert!(shares.iter().all(|s| s.threshold() == 3));
}

#[test]
fn test_shares_interpolate_to_group_secret() {
    let shares = run_dkg(5, 3);
    let subset: Vec<_> = [4usize, 1, 3]
        .iter()
        .map(|i| (shares[*i].index, *shares[*i].secret()))
        .collect();
    let secret = recover_secret(&subset, 3).unwrap();
    assert_eq!(ProjectivePoint::GENERATOR * secret, shares[0].public_key());
}

#[test]
fn test_tampered_share_rejected() {
    let deal = Deal::generate(0, 4, 3).unwrap();
    let mut share = deal.share_for(2).unwrap();
    share.share = encode_scalar(&super::group::random_scalar());
    assert!(super::vss::verify_deal_share(&share, 2, 3).is_err());
    // The untouched share for another node still verifies.
    assert!(super::vss::verify_deal_share(&deal.share_for(1).unwrap(), 1, 3).is_ok());
}

#[test]
fn test_record_roundtrip_rechecks_share() {
    let shares = run_dkg(4, 3);
    let record = shares[2].to_record();
    let restored = DistKeyShare::from_record(&record).unwrap();
    assert_eq!(restored.public_key(), shares[2].public_key());
    assert_eq!(restored.index, 2);

    let mut wrong = record.clone();
    wrong.index = 1;
    assert!(DistKeyShare::from_record(&wrong).is_err());
}
