// Path: crates/threshold/tests/tdh.rs
mod common;

use anyhow::Result;
use cohort_api::storage::DkgStore;
use cohort_api::transport::TreeTransport;
use cohort_crypto::dkg::group::{decode_point, encode_point, random_scalar};
use cohort_crypto::dkg::DistKeyShare;
use cohort_crypto::tdh::{create_share, encrypt, recover_plaintext, verify_ciphertext};
use cohort_storage::open_store;
use cohort_threshold::messages::{DecryptShares, Message};
use cohort_types::config::StorageConfig;
use cohort_types::error::ProtocolError;
use cohort_types::tdh::DkgSessionId;
use common::ClusterBuilder;
use k256::ProjectivePoint;
use std::sync::Arc;

const SEED: &[u8] = b"lottery-round-7";

fn session(tag: u8) -> DkgSessionId {
    DkgSessionId([tag; 32])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_nodes_decrypt_with_a_byzantine_minority_offline() -> Result<()> {
    let cluster = ClusterBuilder::new(10, 7).tag(20).build();
    let sid = session(1);
    let x = cluster.node(0).setup_dkg(sid).await?;

    // every node finished setup with the same group key
    for node in &cluster.nodes {
        assert_eq!(node.dkg_public_key(&sid)?, x);
    }

    let ct = encrypt(&x, SEED, b"Go Badgers!")?;
    verify_ciphertext(&ct, SEED)?;
    assert_eq!(cluster.node(0).decrypt_plaintext(sid, &ct).await?, b"Go Badgers!");

    for i in [7, 8, 9] {
        cluster.net.set_offline(i, true);
    }
    assert_eq!(cluster.node(0).decrypt_plaintext(sid, &ct).await?, b"Go Badgers!");
    assert_eq!(cluster.node(4).decrypt_plaintext(sid, &ct).await?, b"Go Badgers!");

    cluster.net.set_offline(6, true);
    let err = cluster.node(0).decrypt_plaintext(sid, &ct).await.unwrap_err();
    assert!(
        matches!(
            err,
            ProtocolError::InsufficientQuorum {
                failures: 4,
                threshold: 7,
                ..
            }
        ),
        "unexpected error: {err}"
    );

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn recipient_mode_needs_the_recipient_key() -> Result<()> {
    let cluster = ClusterBuilder::new(4, 3).tag(21).build();
    let sid = session(2);
    let x = cluster.node(1).setup_dkg(sid).await?;

    let ct = encrypt(&x, SEED, b"for carol only")?;
    let xc = random_scalar();
    let xc_point = ProjectivePoint::GENERATOR * xc;
    let reply = cluster.node(0).decrypt(sid, &ct, Some(xc_point)).await?;

    assert_eq!(reply.x, encode_point(&x));
    assert_eq!(recover_plaintext(&reply, Some(&xc))?, b"for carol only");
    assert_ne!(
        recover_plaintext(&reply, None).ok(),
        Some(b"for carol only".to_vec())
    );

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_decryption_keeps_ciphertext_order() -> Result<()> {
    let cluster = ClusterBuilder::new(4, 3).tag(22).build();
    let sid = session(3);
    let x = cluster.node(0).setup_dkg(sid).await?;

    let plaintexts: Vec<&[u8]> = vec![b"alice", b"bob", b"carol"];
    let cts = plaintexts
        .iter()
        .map(|m| encrypt(&x, SEED, m))
        .collect::<Result<Vec<_>, _>>()?;
    let replies = cluster.node(2).decrypt_batch(sid, cts, None).await?;

    let recovered = replies
        .iter()
        .map(|r| recover_plaintext(r, None))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(recovered, plaintexts);

    assert!(matches!(
        cluster.node(2).decrypt_batch(sid, Vec::new(), None).await,
        Err(ProtocolError::InvalidRequest(_))
    ));

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sessions_are_set_up_once() -> Result<()> {
    let cluster = ClusterBuilder::new(4, 3).tag(23).build();
    let sid = session(4);
    cluster.node(0).setup_dkg(sid).await?;

    assert!(matches!(
        cluster.node(0).setup_dkg(sid).await,
        Err(ProtocolError::SessionExists(_))
    ));
    assert!(matches!(
        cluster.node(3).setup_dkg(sid).await,
        Err(ProtocolError::SessionExists(_))
    ));

    // a fresh id still works
    cluster.node(3).setup_dkg(session(5)).await?;

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_session_is_rejected_before_any_round() -> Result<()> {
    let cluster = ClusterBuilder::new(4, 3).tag(24).build();
    let x = ProjectivePoint::GENERATOR * random_scalar();
    let ct = encrypt(&x, SEED, b"nobody")?;

    assert!(matches!(
        cluster.node(0).decrypt_plaintext(session(6), &ct).await,
        Err(ProtocolError::UnknownSession(_))
    ));
    assert!(matches!(
        cluster.node(0).dkg_public_key(&session(6)),
        Err(ProtocolError::UnknownSession(_))
    ));

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn setup_tolerates_an_unreachable_node() -> Result<()> {
    let cluster = ClusterBuilder::new(4, 3).tag(25).build();
    cluster.net.set_offline(3, true);

    let sid = session(7);
    let x = cluster.node(0).setup_dkg(sid).await?;
    assert!(cluster.stores[3].get(&sid)?.is_none());

    let ct = encrypt(&x, SEED, b"three of four")?;
    assert_eq!(cluster.node(1).decrypt_plaintext(sid, &ct).await?, b"three of four");

    cluster.net.set_offline(2, true);
    assert!(cluster.node(0).setup_dkg(session(8)).await.is_err());

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn forged_decryption_shares_are_discarded() -> Result<()> {
    let mut cluster = ClusterBuilder::new(10, 7).tag(26).manual(&[3]).build();
    let sid = session(9);

    // node 3 takes part in setup honestly but forges every decryption share
    let mut inbox = cluster.take_inbox(3);
    let forger = Arc::clone(cluster.node(3));
    let store = Arc::clone(&cluster.stores[3]);
    let endpoint = cluster.net.endpoint(3);
    let task = tokio::spawn(async move {
        while let Some(envelope) = inbox.recv().await {
            let request = match Message::open(&envelope) {
                Ok(Message::DecryptRequest(request)) => request,
                _ => {
                    forger.handle(envelope).await;
                    continue;
                }
            };
            let record = store.get(&request.session).unwrap().unwrap();
            let key = DistKeyShare::from_record(&record).unwrap();
            let shares = request
                .points
                .iter()
                .map(|p| {
                    let mut share = create_share(&key, &decode_point(p).unwrap(), None).unwrap();
                    let v = decode_point(&share.v).unwrap() + ProjectivePoint::GENERATOR;
                    share.v = encode_point(&v);
                    share
                })
                .collect();
            let reply = Message::DecryptShares(DecryptShares {
                shares: Some(shares),
            })
            .seal(envelope.instance, envelope.root, 3);
            endpoint.send_to_parent(reply).await.unwrap();
        }
    });

    let x = cluster.node(0).setup_dkg(sid).await?;
    let ct = encrypt(&x, SEED, b"honest shares only")?;
    assert_eq!(
        cluster.node(0).decrypt_plaintext(sid, &ct).await?,
        b"honest shares only"
    );

    // with three nodes offline the forger is the fourth failure
    for i in [7, 8, 9] {
        cluster.net.set_offline(i, true);
    }
    let err = cluster.node(0).decrypt_plaintext(sid, &ct).await.unwrap_err();
    assert!(
        matches!(err, ProtocolError::InsufficientQuorum { failures: 4, .. }),
        "unexpected error: {err}"
    );

    task.abort();
    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shares_survive_a_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let open_all = || -> Result<Vec<Arc<dyn DkgStore>>> {
        (0..4)
            .map(|i| -> Result<Arc<dyn DkgStore>> {
                Ok(open_store(&StorageConfig {
                    path: Some(dir.path().join(format!("node-{i}.redb"))),
                })?)
            })
            .collect()
    };

    let sid = session(10);
    let cluster = ClusterBuilder::new(4, 3).tag(27).stores(open_all()?).build();
    let x = cluster.node(0).setup_dkg(sid).await?;
    cluster.shutdown().await;

    let cluster = ClusterBuilder::new(4, 3).tag(27).stores(open_all()?).build();
    assert_eq!(cluster.node(2).dkg_public_key(&sid)?, x);
    let ct = encrypt(&x, SEED, b"after restart")?;
    assert_eq!(cluster.node(2).decrypt_plaintext(sid, &ct).await?, b"after restart");
    assert!(matches!(
        cluster.node(2).setup_dkg(sid).await,
        Err(ProtocolError::SessionExists(_))
    ));

    cluster.shutdown().await;
    Ok(())
}
