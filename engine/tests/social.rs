mod common;

use common::{shared_policy, Network};
use cosign_types::{Contact, Kind, Label, Metadata, SharedSignerContent};

fn shared_signer(fingerprint: &str) -> SharedSignerContent {
    SharedSignerContent {
        descriptor: format!("tr([{fingerprint}/86h/0h/0h]xpub)"),
        fingerprint: fingerprint.into(),
    }
}

#[tokio::test]
async fn newest_profile_wins() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let carol = net.join();

    alice
        .session
        .set_profile(Metadata::default().name("alice"))
        .await
        .unwrap();
    net.clock.advance(5);
    alice
        .session
        .set_profile(Metadata::default().name("alice").about("multisig enjoyer"))
        .await
        .unwrap();

    let profile = bob.session.get_profile(alice.public_key()).await.unwrap();
    assert_eq!(profile.metadata.about.as_deref(), Some("multisig enjoyer"));

    let profiles = bob
        .session
        .get_profiles(&[carol.public_key(), alice.public_key()])
        .await
        .unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].public_key, carol.public_key());
    assert!(profiles[0].created_at.is_none());
    assert_eq!(profiles[1].metadata.name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn contacts_merge_by_public_key() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let carol = net.join();
    bob.session
        .set_profile(Metadata::default().display_name("Bob"))
        .await
        .unwrap();

    alice
        .session
        .upsert_contacts(vec![Contact::new(bob.public_key())])
        .await
        .unwrap();
    net.clock.advance(1);
    let merged = alice
        .session
        .upsert_contacts(vec![
            Contact::new(carol.public_key()),
            Contact::new(bob.public_key()).with_petname("bobby"),
        ])
        .await
        .unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].petname.as_deref(), Some("bobby"));

    let contacts = alice.session.get_contacts().await.unwrap();
    assert_eq!(contacts, merged);

    let with_profiles = alice.session.get_contact_profiles().await.unwrap();
    assert_eq!(with_profiles.len(), 2);
    assert_eq!(
        with_profiles[0].profile.metadata.display_name.as_deref(),
        Some("Bob")
    );
    assert_eq!(with_profiles[1].profile.created_at, None);
}

#[tokio::test]
async fn owned_signers_are_private_to_their_owner() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let content = cosign_types::OwnedSignerContent {
        description: "desk".into(),
        descriptor: "tr([fpA/86h]xpub)".into(),
        fingerprint: "fpA".into(),
        name: "jade".into(),
        t: "hardware".into(),
    };
    let saved = alice.session.save_owned_signer(content.clone()).await.unwrap();
    assert_eq!(saved.signer, content);
    assert_eq!(saved.owner, alice.public_key());

    assert_eq!(alice.session.get_owned_signers().await.unwrap().len(), 1);
    assert!(bob.session.get_owned_signers().await.unwrap().is_empty());
    let report = bob
        .session
        .sync(vec![net.only_published(Kind::SIGNERS)])
        .await;
    assert!(report.entities.is_empty());

    alice.session.delete_owned_signers(vec![saved.id]).await.unwrap();
    assert!(alice.session.get_owned_signers().await.unwrap().is_empty());
}

#[tokio::test]
async fn shared_signers_can_be_filtered_by_owner() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let carol = net.join();

    let from_alice = alice
        .session
        .save_shared_signer(shared_signer("fpA"), bob.public_key())
        .await
        .unwrap();
    assert_eq!(from_alice.owner, alice.public_key());
    assert_eq!(from_alice.shared_with, bob.public_key());
    carol
        .session
        .save_shared_signer(shared_signer("fpC"), bob.public_key())
        .await
        .unwrap();

    let all = bob.session.get_shared_signers(None).await.unwrap();
    assert_eq!(all.len(), 2);
    let only_alice = bob
        .session
        .get_shared_signers(Some(&[alice.public_key()]))
        .await
        .unwrap();
    assert_eq!(only_alice.len(), 1);
    assert_eq!(only_alice[0].signer.fingerprint, "fpA");
    assert!(carol.session.get_shared_signers(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn labels_are_replaced_per_labelled_item() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;

    let first = alice
        .session
        .save_label(policy_id, Label::address("bc1qaddr", "savings"))
        .await
        .unwrap();
    net.clock.advance(10);
    let second = alice
        .session
        .save_label(policy_id, Label::address("bc1qaddr", "rainy day"))
        .await
        .unwrap();
    alice
        .session
        .save_label(policy_id, Label::utxo("txid:0", "change"))
        .await
        .unwrap();
    assert_eq!(first.label_id, second.label_id);

    let labels = bob.session.get_labels(policy_id).await.unwrap();
    assert_eq!(labels.len(), 2);
    let address = labels
        .iter()
        .find(|l| l.label_id == second.label_id)
        .unwrap();
    assert_eq!(address.label.text, "rainy day");

    bob.session.delete_labels(vec![second.id]).await.unwrap();
    assert!(bob.session.stores().labels.get(&second.label_id).unwrap().is_none());
}
