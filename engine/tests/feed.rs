mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{shared_policy, Network};
use cosign_crypto::EventBuilder;
use cosign_engine::{DomainEntity, EngineError, EventKindHandler};
use cosign_types::{Clock, Kind, Metadata, Policy};
use tokio::sync::mpsc;

#[tokio::test]
async fn live_feed_delivers_shared_policies() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let feed_session = bob.session.clone();
    let feed = tokio::spawn(async move {
        feed_session
            .process_feed(move |entity| {
                let _ = tx.send(entity);
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let policy_id = shared_policy(&alice, &[&bob]).await;

    let policy = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(entity) = rx.recv().await {
            if let DomainEntity::Policy(policy) = entity {
                return Some(policy);
            }
        }
        None
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(policy.id, policy_id);
    feed.abort();
}

#[test]
fn feed_filters_cover_addressed_and_authored_events() {
    let net = Network::new();
    let alice = net.join();
    let filters = alice.session.feed_filters();
    assert_eq!(filters.len(), 2);

    let addressed = cosign_crypto::KeyAuthenticator::generate();
    let to_alice = EventBuilder::new(Kind::PROPOSAL, "x")
        .tag(cosign_types::Tag::pubkey(&alice.public_key()))
        .created_at(net.clock.now())
        .sign(&addressed);
    assert!(filters.iter().any(|f| f.matches(&to_alice)));

    let by_alice = EventBuilder::new(Kind::METADATA, "{}")
        .created_at(net.clock.now())
        .sign(alice.keys.as_ref());
    assert!(filters.iter().any(|f| f.matches(&by_alice)));

    let unrelated = EventBuilder::new(Kind::METADATA, "{}")
        .created_at(net.clock.now())
        .sign(&addressed);
    assert!(!filters.iter().any(|f| f.matches(&unrelated)));
}

#[tokio::test]
async fn unknown_kinds_fail_only_their_batch() {
    let net = Network::new();
    let alice = net.join();
    let stranger = cosign_crypto::KeyAuthenticator::generate();
    let odd = EventBuilder::new(Kind(1), "hello").sign(&stranger);
    let metadata = EventBuilder::new(
        Kind::METADATA,
        serde_json::to_string(&Metadata::default().name("stranger")).unwrap(),
    )
    .sign(&stranger);

    let report = alice.session.sync(vec![odd, metadata]).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, Kind(1));
    assert!(matches!(report.failures[0].error, EngineError::UnknownKind(_)));
    assert_eq!(report.entities.len(), 1);
    assert!(matches!(report.entities[0], DomainEntity::Profile(_)));
}

#[tokio::test]
async fn sync_orders_keys_before_policies() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    shared_policy(&alice, &[&bob]).await;

    let mut batch = net.published(Kind::POLICY);
    batch.extend(net.published(Kind::SHARED_KEY));
    let calls = net.relay.list_calls();
    let report = bob.session.sync(batch).await;

    assert!(report.is_clean());
    assert_eq!(report.of::<Policy>().len(), 1);
    assert_eq!(net.relay.list_calls(), calls);
}

#[test]
fn handlers_are_built_once_per_kind() {
    let net = Network::new();
    let alice = net.join();
    let first = alice.session.handler(Kind::PROPOSAL).unwrap();
    let again = alice.session.handler(Kind::PROPOSAL).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(first.kind(), Kind::PROPOSAL);

    for kind in Kind::DISPATCH_ORDER {
        assert_eq!(alice.session.handler(kind).unwrap().kind(), kind);
    }
    assert!(matches!(
        alice.session.handler(Kind(7)),
        Err(EngineError::UnknownKind(Kind(7)))
    ));
}
