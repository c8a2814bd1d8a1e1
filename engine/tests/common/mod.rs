#![allow(dead_code)]

use std::sync::Arc;

use cosign_crypto::{Authenticator, KeyAuthenticator};
use cosign_engine::{EngineConfig, Session};
use cosign_network::{Relay, RelayPool};
use cosign_nullables::{NullBitcoin, NullClock, NullRelay};
use cosign_types::{
    Event, EventId, Kind, ProposalContent, PublicKey, SpendingProposal,
};

pub const START: u64 = 1_700_000_000;

/// One relay, one Bitcoin stand-in and one clock shared by every participant.
pub struct Network {
    pub relay: Arc<NullRelay>,
    pub bitcoin: Arc<NullBitcoin>,
    pub clock: Arc<NullClock>,
}

pub struct Participant {
    pub keys: Arc<KeyAuthenticator>,
    pub session: Session,
}

impl Participant {
    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            relay: Arc::new(NullRelay::default()),
            bitcoin: Arc::new(NullBitcoin::new()),
            clock: Arc::new(NullClock::new(START)),
        }
    }

    pub fn pool(&self) -> RelayPool {
        RelayPool::new(vec![self.relay.clone() as Arc<dyn Relay>])
    }

    pub fn join(&self) -> Participant {
        self.join_with(EngineConfig::default())
    }

    pub fn join_with(&self, config: EngineConfig) -> Participant {
        let keys = Arc::new(KeyAuthenticator::generate());
        let session = Session::builder(keys.clone(), self.pool(), self.bitcoin.clone())
            .clock(self.clock.clone())
            .config(config)
            .build();
        Participant { keys, session }
    }

    pub fn published(&self, kind: Kind) -> Vec<Event> {
        self.relay.published_of(kind)
    }

    pub fn only_published(&self, kind: Kind) -> Event {
        let mut events = self.published(kind);
        assert_eq!(events.len(), 1, "expected exactly one {kind} event");
        events.remove(0)
    }
}

pub fn spending(descriptor: &str, psbt: &str) -> ProposalContent {
    ProposalContent::Spending(SpendingProposal {
        descriptor: descriptor.into(),
        psbt: psbt.into(),
        to_address: "bc1qrecipient".into(),
        amount: 50_000,
        description: "rent".into(),
        utxos: Vec::new(),
    })
}

/// A policy owned by `owner` and shared with `others`.
pub async fn shared_policy(owner: &Participant, others: &[&Participant]) -> EventId {
    let participants = others.iter().map(|p| p.public_key()).collect();
    owner
        .session
        .save_policy(
            "vault",
            "family savings",
            "thresh(2,pk(A),pk(B))",
            serde_json::json!({ "color": "blue" }),
            participants,
        )
        .await
        .unwrap()
        .policy
        .id
}
