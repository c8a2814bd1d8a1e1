//! The caller-facing session: one identity, one relay pool, one set of caches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cosign_crypto::{blake2b_256_multi, Authenticator, AuthenticatorExt, EventBuilder, KeyAuthenticator};
use cosign_network::{Filter, Relay, RelayPool};
use cosign_types::{
    ApprovalContent, ApprovedProposal, BitcoinUtil, Clock, CompletedContent, CompletedProposal,
    Contact, ContactProfile, Event, EventId, Kind, Label, LabelData, Metadata, OwnedSigner,
    OwnedSignerContent, Pagination, Policy, PolicyContent, Profile, Proposal, ProposalContent,
    PublicKey, PublishedLabel, SharedSigner, SharedSignerContent, SystemClock, Tag, TypeError,
};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::entity::{collect, DomainEntity, FromEntity, SharedKey};
use crate::handler::EventKindHandler;
use crate::queries::{SessionHandle, SessionQueries};
use crate::registry::{HandlerDeps, HandlerRegistry};
use crate::resolver::SharedKeyResolver;
use crate::stores::StoreSet;
use crate::sync::SyncReport;
use crate::EngineError;

pub(crate) struct SessionCore {
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) relay: RelayPool,
    pub(crate) bitcoin: Arc<dyn BitcoinUtil>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    pub(crate) stores: Arc<StoreSet>,
    pub(crate) resolver: Arc<SharedKeyResolver>,
    pub(crate) registry: HandlerRegistry,
}

/// A policy as created, with the participants whose key grant no relay
/// accepted. Those participants cannot read the policy until it is shared
/// with them again.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedPolicy {
    pub policy: Policy,
    pub undelivered: Vec<PublicKey>,
}

pub struct SessionBuilder {
    authenticator: Arc<dyn Authenticator>,
    relay: RelayPool,
    bitcoin: Arc<dyn BitcoinUtil>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl SessionBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Session {
        let stores = Arc::new(StoreSet::new());
        let resolver = Arc::new(SharedKeyResolver::new(
            self.authenticator.clone(),
            self.relay.clone(),
            stores.clone(),
        ));
        let core = Arc::new_cyclic(|weak| {
            let queries: Arc<dyn SessionQueries> = Arc::new(SessionHandle::new(weak.clone()));
            let registry = HandlerRegistry::new(HandlerDeps {
                authenticator: self.authenticator.clone(),
                relay: self.relay.clone(),
                bitcoin: self.bitcoin.clone(),
                clock: self.clock.clone(),
                stores: stores.clone(),
                resolver: resolver.clone(),
                queries,
                approval_ttl_secs: self.config.approval_ttl_secs,
            });
            SessionCore {
                authenticator: self.authenticator,
                relay: self.relay,
                bitcoin: self.bitcoin,
                clock: self.clock,
                config: self.config,
                stores,
                resolver,
                registry,
            }
        });
        Session { core }
    }
}

/// Entry point for everything a participant does.
///
/// Reads go to the relays and come back through the per-kind handlers, so
/// every result is decrypted, cached and consistent with what [`sync`]
/// produces for the same events.
///
/// [`sync`]: Session::sync
#[derive(Clone)]
pub struct Session {
    core: Arc<SessionCore>,
}

impl Session {
    pub fn builder(
        authenticator: Arc<dyn Authenticator>,
        relay: RelayPool,
        bitcoin: Arc<dyn BitcoinUtil>,
    ) -> SessionBuilder {
        SessionBuilder {
            authenticator,
            relay,
            bitcoin,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.core.authenticator.public_key()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// The session's caches, for inspection.
    pub fn stores(&self) -> &StoreSet {
        &self.core.stores
    }

    pub fn handler(&self, kind: Kind) -> Result<Arc<dyn EventKindHandler>, EngineError> {
        self.core.registry.get_handler(kind)
    }

    // ── Plumbing ───────────────────────────────────────────────────────

    fn event(&self, kind: Kind, content: impl Into<String>) -> EventBuilder {
        EventBuilder::new(kind, content).created_at(self.core.clock.now())
    }

    async fn publish(&self, event: &Event) -> Result<(), EngineError> {
        self.core.relay.publish(event).await?;
        debug!(event = %event.id, kind = %event.kind, "published");
        Ok(())
    }

    async fn ingest(&self, kind: Kind, events: Vec<Event>) -> Result<Vec<DomainEntity>, EngineError> {
        let mut rejected = Vec::new();
        let events = self.core.verified(events, &mut rejected);
        self.core.dispatch(kind, events).await
    }

    async fn fetch<T: FromEntity>(&self, kind: Kind, filter: Filter) -> Result<Vec<T>, EngineError> {
        let events = self.core.relay.list(&[filter]).await?;
        Ok(collect(self.ingest(kind, events).await?))
    }

    /// Ingest a locally built event and return the entity it produced.
    async fn ingest_one<T: FromEntity>(&self, event: Event) -> Result<T, EngineError> {
        let id = event.id;
        collect(self.ingest(event.kind, vec![event]).await?)
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::not_found("entity for event", id))
    }

    async fn shared_key(&self, policy_id: EventId) -> Result<SharedKey, EngineError> {
        self.core
            .resolver
            .resolve(&[policy_id])
            .await?
            .remove(&policy_id)
            .ok_or(EngineError::NotParticipant(policy_id))
    }

    async fn policy(&self, policy_id: EventId) -> Result<Policy, EngineError> {
        self.get_policies_by_id(&[policy_id])
            .await?
            .remove(&policy_id)
            .ok_or_else(|| EngineError::not_found("policy", policy_id))
    }

    async fn proposal(&self, proposal_id: EventId) -> Result<Proposal, EngineError> {
        if let Some(proposal) = self.core.stores.proposals.get(&proposal_id)? {
            return Ok(proposal);
        }
        let filter = Filter::new().kind(Kind::PROPOSAL).id(proposal_id);
        self.fetch::<Proposal>(Kind::PROPOSAL, filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::not_found("proposal", proposal_id))
    }

    /// Re-evaluate the status of cached proposals.
    async fn refresh_proposals(&self, ids: &[EventId]) -> Result<(), EngineError> {
        let mut raws = Vec::new();
        for id in ids {
            if self.core.stores.proposals.contains(id)? {
                raws.extend(self.core.stores.raw.get(id)?);
            }
        }
        if !raws.is_empty() {
            self.core.dispatch(Kind::PROPOSAL, raws).await?;
        }
        Ok(())
    }

    // ── Policies ───────────────────────────────────────────────────────

    /// Create a policy shared among `participants` (the caller is always
    /// one of them).
    ///
    /// A fresh shared key encrypts and signs the policy; each participant is
    /// sent the key in a grant of their own. Grants are published
    /// independently and the policy goes out even if some grants fail.
    pub async fn save_policy(
        &self,
        name: &str,
        description: &str,
        miniscript: &str,
        ui_metadata: serde_json::Value,
        participants: Vec<PublicKey>,
    ) -> Result<SavedPolicy, EngineError> {
        let me = self.public_key();
        let descriptor = self.core.bitcoin.to_descriptor(miniscript)?;
        let mut members = Vec::with_capacity(participants.len() + 1);
        for participant in participants.into_iter().chain([me]) {
            if !members.contains(&participant) {
                members.push(participant);
            }
        }

        let shared = KeyAuthenticator::generate();
        let content = shared.encrypt_obj(&PolicyContent {
            name: name.to_string(),
            description: description.to_string(),
            descriptor,
            ui_metadata,
        })?;
        let policy_event = self
            .event(Kind::POLICY, content)
            .tags(members.iter().map(Tag::pubkey))
            .sign(&shared);

        let secret = shared.secret_hex();
        let mut grants = Vec::with_capacity(members.len());
        for member in &members {
            let content = self.core.authenticator.encrypt(&secret, member)?;
            grants.push(
                self.event(Kind::SHARED_KEY, content)
                    .tag(Tag::event(&policy_event.id))
                    .tag(Tag::pubkey(member))
                    .sign(self.core.authenticator.as_ref()),
            );
        }
        let delivery = self.core.relay.broadcast(&grants).await;
        let undelivered: Vec<PublicKey> = grants
            .iter()
            .zip(&members)
            .filter(|(grant, _)| delivery.failed.iter().any(|(id, _)| *id == grant.id))
            .map(|(_, member)| *member)
            .collect();
        if !undelivered.is_empty() {
            warn!(policy = %policy_event.id, count = undelivered.len(), "some key grants were not delivered");
        }
        let own_grant = grants.into_iter().filter(|g| g.pubkey_refs().is_ok_and(|p| p.contains(&me)));
        self.core.resolver.ingest_grants(own_grant.collect())?;

        self.publish(&policy_event).await?;
        let policy: Policy = self.ingest_one(policy_event).await?;
        info!(policy = %policy.id, participants = members.len(), "policy saved");
        Ok(SavedPolicy {
            policy,
            undelivered,
        })
    }

    /// Policies the caller participates in, newest first.
    pub async fn get_policies(&self, page: Pagination) -> Result<Vec<Policy>, EngineError> {
        let filter = Filter::new()
            .kind(Kind::POLICY)
            .pubkey(self.public_key())
            .pagination(&page);
        let mut policies: Vec<Policy> = self.fetch(Kind::POLICY, filter).await?;
        policies.retain(|p| page.contains(p.created_at));
        policies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = page.limit {
            policies.truncate(limit);
        }
        Ok(policies)
    }

    pub async fn get_policies_by_id(
        &self,
        ids: &[EventId],
    ) -> Result<HashMap<EventId, Policy>, EngineError> {
        let mut found = HashMap::new();
        let mut missing = Vec::new();
        for id in ids {
            match self.core.stores.policies.get(id)? {
                Some(policy) => {
                    found.insert(*id, policy);
                }
                None => missing.push(*id),
            }
        }
        if !missing.is_empty() {
            let filter = Filter::new().kind(Kind::POLICY).ids(missing);
            for policy in self.fetch::<Policy>(Kind::POLICY, filter).await? {
                found.insert(policy.id, policy);
            }
        }
        Ok(found)
    }

    pub async fn delete_policies(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::POLICY)?.delete(ids).await
    }

    /// Shared keys the caller holds for `policy_ids`.
    pub async fn get_shared_keys_by_id(
        &self,
        policy_ids: &[EventId],
    ) -> Result<HashMap<EventId, SharedKey>, EngineError> {
        self.core.resolver.resolve(policy_ids).await
    }

    // ── Proposals ──────────────────────────────────────────────────────

    pub async fn submit_proposal(
        &self,
        policy_id: EventId,
        content: ProposalContent,
    ) -> Result<Proposal, EngineError> {
        let policy = self.policy(policy_id).await?;
        let key = self.shared_key(policy_id).await?;
        let event = self
            .event(Kind::PROPOSAL, key.authenticator.encrypt_obj(&content)?)
            .tag(Tag::event(&policy_id))
            .tags(policy.participants.iter().map(Tag::pubkey))
            .sign(key.authenticator.as_ref());
        self.publish(&event).await?;
        let proposal: Proposal = self.ingest_one(event).await?;
        info!(proposal = %proposal.proposal_id, policy = %policy_id, "proposal submitted");
        Ok(proposal)
    }

    /// Proposals of every policy the caller participates in, newest first.
    pub async fn get_proposals(&self) -> Result<Vec<Proposal>, EngineError> {
        self.load_proposals(Filter::new()).await
    }

    pub async fn get_proposals_by_policy(&self, policy_id: EventId) -> Result<Vec<Proposal>, EngineError> {
        self.load_proposals(Filter::new().events([policy_id])).await
    }

    /// Proposals are loaded together with their approvals so their status is
    /// right on first sight.
    async fn load_proposals(&self, filter: Filter) -> Result<Vec<Proposal>, EngineError> {
        let me = self.public_key();
        let proposals = self
            .core
            .relay
            .list(&[filter.kind(Kind::PROPOSAL).pubkey(me)])
            .await?;
        if proposals.is_empty() {
            return Ok(Vec::new());
        }
        let approvals_filter = Filter::new()
            .kind(Kind::APPROVED_PROPOSAL)
            .pubkey(me)
            .events(proposals.iter().map(|e| e.id));
        let approvals = self.core.relay.list(&[approvals_filter]).await?;
        self.ingest(Kind::APPROVED_PROPOSAL, approvals).await?;

        let mut out: Vec<Proposal> = collect(self.ingest(Kind::PROPOSAL, proposals).await?);
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn delete_proposals(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::PROPOSAL)?.delete(ids).await
    }

    /// Approve a proposal with the caller's signed PSBT.
    pub async fn approve_proposal(
        &self,
        proposal_id: EventId,
        signed_psbt: impl Into<String>,
    ) -> Result<ApprovedProposal, EngineError> {
        let proposal = self.proposal(proposal_id).await?;
        let policy = self.policy(proposal.policy_id).await?;
        let key = self.shared_key(proposal.policy_id).await?;
        let now = self.core.clock.now();
        let content = ApprovalContent::new(proposal.proposal_type(), signed_psbt.into());
        let event = self
            .event(Kind::APPROVED_PROPOSAL, key.authenticator.encrypt_obj(&content)?)
            .tag(Tag::event(&proposal_id))
            .tag(Tag::event(&proposal.policy_id))
            .tags(policy.participants.iter().map(Tag::pubkey))
            .tag(Tag::expiration(now.plus_secs(self.core.config.approval_ttl_secs)))
            .sign(self.core.authenticator.as_ref());
        self.publish(&event).await?;
        let approval: ApprovedProposal = self.ingest_one(event).await?;
        self.refresh_proposals(&[proposal_id]).await?;
        info!(approval = %approval.approval_id, proposal = %proposal_id, "proposal approved");
        Ok(approval)
    }

    /// Approvals grouped by proposal, optionally restricted to `proposal_ids`.
    pub async fn get_approvals(
        &self,
        proposal_ids: Option<&[EventId]>,
    ) -> Result<HashMap<EventId, Vec<ApprovedProposal>>, EngineError> {
        let mut filter = Filter::new()
            .kind(Kind::APPROVED_PROPOSAL)
            .pubkey(self.public_key());
        if let Some(ids) = proposal_ids {
            filter = filter.events(ids.iter().copied());
        }
        let approvals: Vec<ApprovedProposal> = self.fetch(Kind::APPROVED_PROPOSAL, filter).await?;

        let mut grouped: HashMap<EventId, Vec<ApprovedProposal>> = HashMap::new();
        for approval in approvals {
            if proposal_ids.is_some_and(|ids| !ids.contains(&approval.proposal_id)) {
                continue;
            }
            grouped.entry(approval.proposal_id).or_default().push(approval);
        }
        for list in grouped.values_mut() {
            list.sort_by(|a, b| b.approval_date.cmp(&a.approval_date));
        }
        let touched: Vec<EventId> = grouped.keys().copied().collect();
        self.refresh_proposals(&touched).await?;
        Ok(grouped)
    }

    pub async fn delete_approvals(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::APPROVED_PROPOSAL)?.delete(ids).await
    }

    /// Record a proposal as finalized. Its approvals and the proposal itself
    /// leave the active caches.
    pub async fn complete_proposal(
        &self,
        proposal_id: EventId,
        content: CompletedContent,
    ) -> Result<CompletedProposal, EngineError> {
        let proposal = self.proposal(proposal_id).await?;
        let policy = self.policy(proposal.policy_id).await?;
        let key = self.shared_key(proposal.policy_id).await?;
        let event = self
            .event(Kind::COMPLETED_PROPOSAL, key.authenticator.encrypt_obj(&content)?)
            .tag(Tag::event(&proposal_id))
            .tag(Tag::event(&proposal.policy_id))
            .tags(policy.participants.iter().map(Tag::pubkey))
            .sign(self.core.authenticator.as_ref());
        self.publish(&event).await?;
        self.ingest_one(event).await
    }

    pub async fn get_completed_proposals(&self) -> Result<Vec<CompletedProposal>, EngineError> {
        let filter = Filter::new()
            .kind(Kind::COMPLETED_PROPOSAL)
            .pubkey(self.public_key());
        let mut completed: Vec<CompletedProposal> =
            self.fetch(Kind::COMPLETED_PROPOSAL, filter).await?;
        completed.sort_by(|a, b| b.completion_date.cmp(&a.completion_date));
        Ok(completed)
    }

    pub async fn delete_completed_proposals(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::COMPLETED_PROPOSAL)?.delete(ids).await
    }

    // ── Signers ────────────────────────────────────────────────────────

    pub async fn save_owned_signer(
        &self,
        signer: OwnedSignerContent,
    ) -> Result<OwnedSigner, EngineError> {
        let event = self
            .event(Kind::SIGNERS, self.core.authenticator.encrypt_obj(&signer)?)
            .sign(self.core.authenticator.as_ref());
        self.publish(&event).await?;
        self.ingest_one(event).await
    }

    pub async fn get_owned_signers(&self) -> Result<Vec<OwnedSigner>, EngineError> {
        let filter = Filter::new()
            .kind(Kind::SIGNERS)
            .author(self.public_key());
        let signers = self.fetch(Kind::SIGNERS, filter).await?;
        self.core.stores.mark_owned_signers_loaded();
        Ok(signers)
    }

    pub async fn delete_owned_signers(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::SIGNERS)?.delete(ids).await
    }

    /// Share a signer with `recipient`, readable only by the two of you.
    pub async fn save_shared_signer(
        &self,
        signer: SharedSignerContent,
        recipient: PublicKey,
    ) -> Result<SharedSigner, EngineError> {
        let content = self.core.authenticator.encrypt_obj_to(&signer, &recipient)?;
        let event = self
            .event(Kind::SHARED_SIGNERS, content)
            .tag(Tag::pubkey(&recipient))
            .sign(self.core.authenticator.as_ref());
        self.publish(&event).await?;
        self.ingest_one(event).await
    }

    /// Signers shared with the caller, optionally only those from `owners`.
    pub async fn get_shared_signers(
        &self,
        owners: Option<&[PublicKey]>,
    ) -> Result<Vec<SharedSigner>, EngineError> {
        let mut filter = Filter::new()
            .kind(Kind::SHARED_SIGNERS)
            .pubkey(self.public_key());
        if let Some(owners) = owners {
            filter = filter.authors(owners.iter().copied());
        }
        self.fetch(Kind::SHARED_SIGNERS, filter).await
    }

    pub async fn delete_shared_signers(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::SHARED_SIGNERS)?.delete(ids).await
    }

    // ── Profiles and contacts ──────────────────────────────────────────

    pub async fn set_profile(&self, metadata: Metadata) -> Result<Profile, EngineError> {
        let content = serde_json::to_string(&metadata).map_err(TypeError::from)?;
        let event = self
            .event(Kind::METADATA, content)
            .sign(self.core.authenticator.as_ref());
        self.publish(&event).await?;
        self.ingest_one(event).await
    }

    pub async fn get_profile(&self, public_key: PublicKey) -> Result<Profile, EngineError> {
        Ok(self
            .get_profiles(&[public_key])
            .await?
            .pop()
            .unwrap_or_else(|| Profile::empty(public_key)))
    }

    /// Latest profile of each key, in the order given. Keys without a
    /// published profile get an empty one.
    pub async fn get_profiles(&self, public_keys: &[PublicKey]) -> Result<Vec<Profile>, EngineError> {
        if public_keys.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::new()
            .kind(Kind::METADATA)
            .authors(public_keys.iter().copied());
        self.fetch::<Profile>(Kind::METADATA, filter).await?;
        public_keys
            .iter()
            .map(|pk| -> Result<Profile, EngineError> {
                Ok(self
                    .core
                    .stores
                    .profiles
                    .get(pk)?
                    .unwrap_or_else(|| Profile::empty(*pk)))
            })
            .collect()
    }

    pub async fn get_contacts(&self) -> Result<Vec<Contact>, EngineError> {
        let filter = Filter::new()
            .kind(Kind::CONTACTS)
            .author(self.public_key())
            .limit(1);
        Ok(self
            .fetch::<Vec<Contact>>(Kind::CONTACTS, filter)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Merge `contacts` into the caller's contact list and publish the result.
    pub async fn upsert_contacts(&self, contacts: Vec<Contact>) -> Result<Vec<Contact>, EngineError> {
        let merged = Contact::merge(self.get_contacts().await?, contacts);
        let event = self
            .event(Kind::CONTACTS, "")
            .tags(merged.iter().map(Contact::to_tag))
            .sign(self.core.authenticator.as_ref());
        self.publish(&event).await?;
        self.ingest(Kind::CONTACTS, vec![event]).await?;
        Ok(merged)
    }

    pub async fn get_contact_profiles(&self) -> Result<Vec<ContactProfile>, EngineError> {
        let contacts = self.get_contacts().await?;
        let keys: Vec<PublicKey> = contacts.iter().map(|c| c.public_key).collect();
        let profiles = self.get_profiles(&keys).await?;
        Ok(contacts
            .into_iter()
            .zip(profiles)
            .map(|(contact, profile)| ContactProfile { contact, profile })
            .collect())
    }

    // ── Labels ─────────────────────────────────────────────────────────

    /// Label an address or UTXO of a policy. Saving a label for the same
    /// data again replaces it.
    pub async fn save_label(
        &self,
        policy_id: EventId,
        label: Label,
    ) -> Result<PublishedLabel, EngineError> {
        let policy = self.policy(policy_id).await?;
        let key = self.shared_key(policy_id).await?;
        let event = self
            .event(Kind::LABELS, key.authenticator.encrypt_obj(&label)?)
            .tag(Tag::identifier(label_identifier(&key, &label.data)?))
            .tag(Tag::event(&policy_id))
            .tags(policy.participants.iter().map(Tag::pubkey))
            .sign(key.authenticator.as_ref());
        self.publish(&event).await?;
        self.ingest_one(event).await
    }

    pub async fn get_labels(&self, policy_id: EventId) -> Result<Vec<PublishedLabel>, EngineError> {
        let filter = Filter::new()
            .kind(Kind::LABELS)
            .pubkey(self.public_key())
            .events([policy_id]);
        let mut labels: Vec<PublishedLabel> = self.fetch(Kind::LABELS, filter).await?;
        labels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen = HashSet::new();
        labels.retain(|l| seen.insert(l.label_id.clone()));
        Ok(labels)
    }

    pub async fn delete_labels(&self, ids: Vec<EventId>) -> Result<(), EngineError> {
        self.handler(Kind::LABELS)?.delete(ids).await
    }

    // ── Sync ───────────────────────────────────────────────────────────

    /// Process a mixed batch of events, kind by kind in dependency order.
    pub async fn sync(&self, events: Vec<Event>) -> SyncReport {
        self.core.sync(events).await
    }

    /// Filters for everything addressed to or written by the caller.
    pub fn feed_filters(&self) -> Vec<Filter> {
        let me = self.public_key();
        let since = self
            .core
            .clock
            .now()
            .minus_secs(self.core.config.feed_lookback_secs);
        vec![
            Filter::new()
                .kinds([
                    Kind::SHARED_KEY,
                    Kind::POLICY,
                    Kind::PROPOSAL,
                    Kind::APPROVED_PROPOSAL,
                    Kind::COMPLETED_PROPOSAL,
                    Kind::SHARED_SIGNERS,
                    Kind::LABELS,
                    Kind::EVENT_DELETION,
                ])
                .pubkey(me)
                .since(since),
            Filter::new()
                .kinds([
                    Kind::SIGNERS,
                    Kind::METADATA,
                    Kind::CONTACTS,
                    Kind::EVENT_DELETION,
                ])
                .author(me)
                .since(since),
        ]
    }

    /// Subscribe to the live feed and hand every resulting entity to
    /// `on_entity`. Returns when the feed closes.
    pub async fn process_feed<F>(&self, mut on_entity: F) -> Result<(), EngineError>
    where
        F: FnMut(DomainEntity) + Send,
    {
        let mut feed = self.core.relay.subscribe(&self.feed_filters()).await?;
        info!("live feed started");
        while let Some(event) = feed.recv().await {
            let report = self.sync(vec![event]).await;
            for failure in &report.failures {
                warn!(kind = %failure.kind, error = %failure.error, "feed event not processed");
            }
            for entity in report.entities {
                on_entity(entity);
            }
        }
        info!("live feed closed");
        Ok(())
    }
}

/// Identifier of a label: stable for the same data under the same policy,
/// opaque to anyone without the shared key.
fn label_identifier(key: &SharedKey, data: &LabelData) -> Result<String, EngineError> {
    let data = serde_json::to_vec(data).map_err(TypeError::from)?;
    let secret = key.authenticator.secret_hex();
    Ok(hex::encode(blake2b_256_multi(&[secret.as_bytes(), &data])))
}
