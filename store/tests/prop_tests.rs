use proptest::prelude::*;

use cosign_store::entities::POLICY_ID;
use cosign_store::EntityStore;
use cosign_types::{
    EventId, Proposal, ProposalContent, ProposalStatus, ProofOfReserveProposal, Timestamp,
};

fn proposal(id: u8, policy: u8, status: ProposalStatus, at: u64) -> Proposal {
    Proposal {
        proposal_id: EventId([id; 32]),
        policy_id: EventId([policy; 32]),
        content: ProposalContent::ProofOfReserve(ProofOfReserveProposal {
            descriptor: "d".into(),
            psbt: "p".into(),
            message: "m".into(),
        }),
        status,
        signer: "Unknown".into(),
        fee: 0,
        created_at: Timestamp::new(at),
    }
}

proptest! {
    /// However often entities are re-stored, each primary key appears once.
    #[test]
    fn no_duplicate_primary_keys(
        ops in prop::collection::vec((0u8..8, 0u8..3, any::<bool>(), 0u64..100), 1..64)
    ) {
        let store = EntityStore::new();
        for (id, policy, signed, at) in &ops {
            let status = ProposalStatus::from_signed(*signed);
            store.store([proposal(*id, *policy, status, *at)]).unwrap();
        }

        let all = store.list().unwrap();
        let mut ids: Vec<EventId> = all.iter().map(|p| p.proposal_id).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), all.len());

        // Every entry is reachable through exactly one policy index bucket.
        let indexed: usize = (0u8..3)
            .map(|p| store.get_all_by(POLICY_ID, &EventId([p; 32]).to_hex()).unwrap().len())
            .sum();
        prop_assert_eq!(indexed, all.len());
    }

    /// list() is always newest first.
    #[test]
    fn list_is_sorted_descending(stamps in prop::collection::vec(0u64..1_000, 1..32)) {
        let store = EntityStore::new();
        let entries: Vec<Proposal> = stamps
            .iter()
            .enumerate()
            .map(|(i, at)| proposal(i as u8, 0, ProposalStatus::Unsigned, *at))
            .collect();
        store.store(entries).unwrap();
        let listed = store.list().unwrap();
        prop_assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}
