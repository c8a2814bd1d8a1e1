mod common;

use common::{shared_policy, spending, Network};
use cosign_crypto::EventBuilder;
use cosign_engine::{Deleted, EngineError, EventKindHandler};
use cosign_types::{Kind, Label, Tag};

#[tokio::test]
async fn proposal_delete_keeps_approvals_whose_deletion_failed() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    let approval = alice
        .session
        .approve_proposal(proposal.proposal_id, "signed")
        .await
        .unwrap();

    let alice_pk = alice.public_key();
    net.relay
        .reject_when(move |e| e.kind == Kind::EVENT_DELETION && e.pubkey == alice_pk);
    let result = alice.session.delete_proposals(vec![proposal.proposal_id]).await;

    assert!(matches!(result, Err(EngineError::DeleteIncomplete { .. })));
    let stores = alice.session.stores();
    assert!(stores.proposals.get(&proposal.proposal_id).unwrap().is_none());
    assert!(stores.approvals.get(&approval.approval_id).unwrap().is_some());
    assert!(!net.relay.contains(&proposal.proposal_id));
    assert!(net.relay.contains(&approval.approval_id));
}

#[tokio::test]
async fn policy_delete_cascades_locally_and_remotely() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    let approval = bob
        .session
        .approve_proposal(proposal.proposal_id, "signed")
        .await
        .unwrap();
    alice
        .session
        .save_label(policy_id, Label::address("bc1qaddr", "savings"))
        .await
        .unwrap();
    bob.session.get_proposals().await.unwrap();
    bob.session.get_labels(policy_id).await.unwrap();

    alice.session.delete_policies(vec![policy_id]).await.unwrap();

    let stores = alice.session.stores();
    assert!(stores.policies.is_empty().unwrap());
    assert!(stores.proposals.is_empty().unwrap());
    assert!(stores.labels.is_empty().unwrap());
    assert!(stores.shared_keys.is_empty().unwrap());
    assert!(!net.relay.contains(&policy_id));
    assert!(!net.relay.contains(&proposal.proposal_id));

    let deletions = net.published(Kind::EVENT_DELETION);
    let report = bob.session.sync(deletions).await;
    assert!(report.is_clean());
    assert!(!report.of::<Deleted>().is_empty());

    let stores = bob.session.stores();
    assert!(stores.policies.get(&policy_id).unwrap().is_none());
    assert!(stores.proposals.get(&proposal.proposal_id).unwrap().is_none());
    assert!(stores.approvals.get(&approval.approval_id).unwrap().is_none());
    assert!(stores.labels.is_empty().unwrap());
    assert!(stores.shared_keys.get(&policy_id).unwrap().is_none());
}

#[tokio::test]
async fn policy_delete_keeps_own_records_whose_deletion_failed() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    let approval = alice
        .session
        .approve_proposal(proposal.proposal_id, "signed")
        .await
        .unwrap();

    let alice_pk = alice.public_key();
    net.relay
        .reject_when(move |e| e.kind == Kind::EVENT_DELETION && e.pubkey == alice_pk);
    let result = alice.session.delete_policies(vec![policy_id]).await;

    assert!(matches!(result, Err(EngineError::DeleteIncomplete { .. })));
    let stores = alice.session.stores();
    assert!(stores.policies.get(&policy_id).unwrap().is_none());
    assert!(stores.proposals.get(&proposal.proposal_id).unwrap().is_none());
    assert!(!net.relay.contains(&policy_id));
    assert!(!net.relay.contains(&proposal.proposal_id));

    assert!(stores.approvals.get(&approval.approval_id).unwrap().is_some());
    assert!(stores.raw.get(&approval.approval_id).unwrap().is_some());
    assert!(net.relay.contains(&approval.approval_id));
    assert!(stores.shared_keys.get(&policy_id).unwrap().is_some());
}

#[tokio::test]
async fn deletion_by_someone_else_is_ignored() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();

    let forged = EventBuilder::new(Kind::EVENT_DELETION, "")
        .tag(Tag::event(&proposal.proposal_id))
        .tag(Tag::pubkey(&alice.public_key()))
        .sign(bob.keys.as_ref());
    let report = alice.session.sync(vec![forged]).await;

    assert!(report.is_clean());
    assert!(report.entities.is_empty());
    assert!(alice
        .session
        .stores()
        .proposals
        .get(&proposal.proposal_id)
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn deletion_only_covers_the_kinds_it_names() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    let keys = alice.session.get_shared_keys_by_id(&[policy_id]).await.unwrap();
    let shared = keys[&policy_id].authenticator.clone();

    let labels_only = EventBuilder::new(Kind::EVENT_DELETION, "")
        .tag(Tag::event(&proposal.proposal_id))
        .tag(Tag::kind(Kind::LABELS))
        .sign(shared.as_ref());
    alice.session.sync(vec![labels_only]).await;
    assert!(alice
        .session
        .stores()
        .proposals
        .get(&proposal.proposal_id)
        .unwrap()
        .is_some());

    let proposals = EventBuilder::new(Kind::EVENT_DELETION, "")
        .tag(Tag::event(&proposal.proposal_id))
        .tag(Tag::kind(Kind::PROPOSAL))
        .sign(shared.as_ref());
    let report = alice.session.sync(vec![proposals]).await;
    let deleted = report.of::<Deleted>();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].ids, vec![proposal.proposal_id]);
    assert!(alice
        .session
        .stores()
        .proposals
        .get(&proposal.proposal_id)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn only_own_approvals_can_be_deleted() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    let bobs = bob
        .session
        .approve_proposal(proposal.proposal_id, "signed-bob")
        .await
        .unwrap();
    alice.session.get_approvals(None).await.unwrap();

    alice
        .session
        .delete_approvals(vec![bobs.approval_id])
        .await
        .unwrap();
    assert!(net.published(Kind::EVENT_DELETION).is_empty());
    assert!(alice.session.stores().approvals.get(&bobs.approval_id).unwrap().is_some());

    bob.session
        .delete_approvals(vec![bobs.approval_id])
        .await
        .unwrap();
    assert!(bob.session.stores().approvals.get(&bobs.approval_id).unwrap().is_none());
    assert!(!net.relay.contains(&bobs.approval_id));

    let report = alice
        .session
        .sync(net.published(Kind::EVENT_DELETION))
        .await;
    assert!(report.is_clean());
    assert!(alice.session.stores().approvals.get(&bobs.approval_id).unwrap().is_none());
}

#[tokio::test]
async fn accepted_proposal_delete_drops_its_approvals_too() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    let approval = alice
        .session
        .approve_proposal(proposal.proposal_id, "signed")
        .await
        .unwrap();

    alice
        .session
        .delete_proposals(vec![proposal.proposal_id])
        .await
        .unwrap();

    let stores = alice.session.stores();
    assert!(stores.proposals.get(&proposal.proposal_id).unwrap().is_none());
    assert!(stores.approvals.get(&approval.approval_id).unwrap().is_none());
    assert!(stores.raw.get(&proposal.proposal_id).unwrap().is_none());
    assert!(stores.raw.get(&approval.approval_id).unwrap().is_none());
    assert_eq!(net.published(Kind::EVENT_DELETION).len(), 2);
}

#[tokio::test]
async fn deletions_are_never_deleted() {
    let net = Network::new();
    let alice = net.join();
    let bob = net.join();
    let policy_id = shared_policy(&alice, &[&bob]).await;
    let proposal = alice
        .session
        .submit_proposal(policy_id, spending("wsh(multi)", "unsigned"))
        .await
        .unwrap();
    alice.session.delete_proposals(vec![proposal.proposal_id]).await.unwrap();
    let deletion = net.only_published(Kind::EVENT_DELETION);

    let handler = alice.session.handler(Kind::EVENT_DELETION).unwrap();
    handler.delete(vec![deletion.id]).await.unwrap();
    assert!(handler.purge(vec![deletion.id]).await.unwrap().is_empty());
    assert_eq!(net.published(Kind::EVENT_DELETION).len(), 1);
}
