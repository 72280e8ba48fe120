use super::{ResolvedProposal, SourceKind};
use crate::{
    chain::{error::ChainError, gateway::ChainClient},
    contracts::AssetDao,
    store,
};
use alloy::{
    primitives::{Address, U256},
    sol_types::{SolCall, SolEvent, SolValue},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Current highest proposal id, straight from the contract.
pub async fn num_proposal(
    chain: &dyn ChainClient,
    dao_address: Address,
) -> Result<u64, ChainError> {
    let calldata = AssetDao::numProposalCall {}.abi_encode();
    let data = chain.call_raw(dao_address, calldata.into()).await?;
    let count = U256::abi_decode(&data).map_err(|e| ChainError::Decode(e.to_string()))?;
    Ok(count.to::<u64>())
}

/// One rung of the resolution ladder. `Ok(None)` means the source has no
/// record; errors are treated as misses by the reader, never surfaced.
#[async_trait]
pub trait ProposalSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, proposal_id: u64) -> Result<Option<ResolvedProposal>, ChainError>;

    /// Bulk read, for sources that can serve one. The default has none.
    async fn resolve_all(&self) -> Result<Option<Vec<ResolvedProposal>>, ChainError> {
        Ok(None)
    }
}

/// Cheapest source: the relational mirror.
pub struct MirrorSource {
    db: DatabaseConnection,
}

impl MirrorSource {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProposalSource for MirrorSource {
    fn name(&self) -> &'static str {
        "mirror"
    }

    async fn resolve(&self, proposal_id: u64) -> Result<Option<ResolvedProposal>, ChainError> {
        let found = store::proposals::get_by_id(&self.db, proposal_id as i64)
            .await
            .map_err(|e| ChainError::Rpc(format!("mirror read failed: {e:#}")))?;
        Ok(found.map(|p| p.model.into()))
    }

    async fn resolve_all(&self) -> Result<Option<Vec<ResolvedProposal>>, ChainError> {
        let rows = store::proposals::get_all(&self.db)
            .await
            .map_err(|e| ChainError::Rpc(format!("mirror read failed: {e:#}")))?;
        Ok(Some(rows.into_iter().map(|p| p.model.into()).collect()))
    }
}

/// Direct struct read. Expected to fail for this contract shape: the
/// on-chain struct holds a nested per-address mapping the ABI cannot expose,
/// so the decode failure is part of normal operation.
pub struct ContractStructSource {
    chain: Arc<dyn ChainClient>,
    dao_address: Address,
}

impl ContractStructSource {
    pub fn new(chain: Arc<dyn ChainClient>, dao_address: Address) -> Self {
        Self { chain, dao_address }
    }
}

#[async_trait]
impl ProposalSource for ContractStructSource {
    fn name(&self) -> &'static str {
        "contract-struct"
    }

    async fn resolve(&self, proposal_id: u64) -> Result<Option<ResolvedProposal>, ChainError> {
        let calldata = AssetDao::proposalsCall {
            proposalId: U256::from(proposal_id),
        }
        .abi_encode();
        let data = self.chain.call_raw(self.dao_address, calldata.into()).await?;
        let ret = AssetDao::proposalsCall::abi_decode_returns(&data)
            .map_err(|e| ChainError::Decode(e.to_string()))?;

        let deadline = DateTime::from_timestamp(ret.deadline.to::<u64>() as i64, 0)
            .ok_or_else(|| ChainError::Decode("bad proposal deadline".to_string()))?
            .naive_utc();

        Ok(Some(ResolvedProposal {
            proposal_id,
            lot_size: ret.lotSize.to::<u64>() as i64,
            share_price: ret.sharePrice.to::<u64>() as f64,
            max_per_investor: ret.maxPerInvestor.to::<u64>() as i64,
            proposal_summary: ret.proposalSummary,
            creator_address: ret.creator.to_string().to_lowercase(),
            deadline,
            yay_votes: ret.yayVotes.to::<u64>() as i64,
            nay_votes: ret.nayVotes.to::<u64>() as i64,
            executed: ret.executed,
            transaction_hash: None,
            created_at: None,
            source: SourceKind::ContractStruct,
        }))
    }
}

/// Last rung: replay the `proposalCreated` event log and reconstruct a
/// minimal proposal. The event carries only id and creator, so counters and
/// financial terms default to zero and the deadline is synthesized from the
/// containing block's timestamp plus the voting window.
pub struct EventReplaySource {
    chain: Arc<dyn ChainClient>,
    dao_address: Address,
    voting_period: Duration,
}

impl EventReplaySource {
    pub fn new(chain: Arc<dyn ChainClient>, dao_address: Address, voting_period: Duration) -> Self {
        Self {
            chain,
            dao_address,
            voting_period,
        }
    }
}

#[async_trait]
impl ProposalSource for EventReplaySource {
    fn name(&self) -> &'static str {
        "event-replay"
    }

    async fn resolve(&self, proposal_id: u64) -> Result<Option<ResolvedProposal>, ChainError> {
        let logs = self
            .chain
            .logs_for_event(self.dao_address, AssetDao::proposalCreated::SIGNATURE_HASH)
            .await?;

        for log in logs {
            let decoded = match log.log_decode::<AssetDao::proposalCreated>() {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(error = %err, "Skipping undecodable proposalCreated log");
                    continue;
                }
            };
            if decoded.inner.data.id != U256::from(proposal_id) {
                continue;
            }

            let block_number = log.block_number.ok_or_else(|| {
                ChainError::Decode("proposalCreated log without block number".to_string())
            })?;
            let created_at = self.chain.block_timestamp(block_number).await?;
            let deadline = created_at + self.voting_period;

            return Ok(Some(ResolvedProposal {
                proposal_id,
                lot_size: 0,
                share_price: 0.0,
                max_per_investor: 0,
                proposal_summary: String::new(),
                creator_address: decoded.inner.data.creator.to_string().to_lowercase(),
                deadline,
                yay_votes: 0,
                nay_votes: 0,
                executed: false,
                transaction_hash: log.transaction_hash.map(|h| h.to_string()),
                created_at: Some(created_at),
                source: SourceKind::EventReplay,
            }));
        }

        Ok(None)
    }
}

/// Resolves proposals through an ordered ladder of sources, stopping at the
/// first hit. A miss everywhere is "not found", never an error.
pub struct ProposalReader {
    sources: Vec<Box<dyn ProposalSource>>,
    chain: Arc<dyn ChainClient>,
    dao_address: Address,
}

impl ProposalReader {
    pub fn new(
        sources: Vec<Box<dyn ProposalSource>>,
        chain: Arc<dyn ChainClient>,
        dao_address: Address,
    ) -> Self {
        Self {
            sources,
            chain,
            dao_address,
        }
    }

    /// Mirror first, then the struct read, then event replay.
    pub fn with_default_sources(
        chain: Arc<dyn ChainClient>,
        db: DatabaseConnection,
        dao_address: Address,
        voting_period: Duration,
    ) -> Self {
        let sources: Vec<Box<dyn ProposalSource>> = vec![
            Box::new(MirrorSource::new(db)),
            Box::new(ContractStructSource::new(chain.clone(), dao_address)),
            Box::new(EventReplaySource::new(
                chain.clone(),
                dao_address,
                voting_period,
            )),
        ];
        Self::new(sources, chain, dao_address)
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, proposal_id: u64) -> Option<ResolvedProposal> {
        for source in &self.sources {
            match source.resolve(proposal_id).await {
                Ok(Some(proposal)) => {
                    debug!(source = source.name(), "Proposal resolved");
                    return Some(proposal);
                }
                Ok(None) => {
                    debug!(source = source.name(), "Source has no record");
                }
                Err(ChainError::Decode(reason)) => {
                    debug!(
                        source = source.name(),
                        reason, "Source undecodable, falling back"
                    );
                }
                Err(err) => {
                    warn!(source = source.name(), error = %err, "Source failed, falling back");
                }
            }
        }
        None
    }

    pub async fn latest_proposal_id(&self) -> Result<u64, ChainError> {
        num_proposal(self.chain.as_ref(), self.dao_address).await
    }

    /// Bulk resolution: prefer the mirror's bulk read; only when the mirror
    /// is completely empty, walk `1..=numProposal()` tolerating individual
    /// failures. Sorted by proposal id descending.
    #[instrument(skip(self))]
    pub async fn resolve_all(&self) -> Result<Vec<ResolvedProposal>, ChainError> {
        for source in &self.sources {
            match source.resolve_all().await {
                Ok(Some(list)) if !list.is_empty() => {
                    let mut list = list;
                    list.sort_by(|a, b| b.proposal_id.cmp(&a.proposal_id));
                    return Ok(list);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(source = source.name(), error = %err, "Bulk read failed, falling back");
                }
            }
        }

        let latest = self.latest_proposal_id().await?;
        let resolved =
            futures::future::join_all((1..=latest).map(|id| self.resolve(id))).await;
        let mut list: Vec<ResolvedProposal> = resolved.into_iter().flatten().collect();
        list.sort_by(|a, b| b.proposal_id.cmp(&a.proposal_id));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::gateway::{SendRequest, TxOutcome};
    use alloy::primitives::{B256, Bytes};
    use alloy::rpc::types::Log;
    use chrono::NaiveDateTime;

    struct EmptySource;

    #[async_trait]
    impl ProposalSource for EmptySource {
        fn name(&self) -> &'static str {
            "empty"
        }

        async fn resolve(&self, _id: u64) -> Result<Option<ResolvedProposal>, ChainError> {
            Ok(None)
        }
    }

    struct UndecodableSource;

    #[async_trait]
    impl ProposalSource for UndecodableSource {
        fn name(&self) -> &'static str {
            "undecodable"
        }

        async fn resolve(&self, _id: u64) -> Result<Option<ResolvedProposal>, ChainError> {
            Err(ChainError::Decode(
                "nested mapping is not ABI-readable".to_string(),
            ))
        }
    }

    /// Fake chain serving a single proposalCreated log and a fixed block
    /// timestamp.
    struct EventChain {
        dao_address: Address,
        creator: Address,
        proposal_id: u64,
        block_number: u64,
        block_time: NaiveDateTime,
        num_proposals: u64,
    }

    #[async_trait]
    impl ChainClient for EventChain {
        async fn ensure_session(&self) -> Result<Address, ChainError> {
            unimplemented!("read-only fake")
        }

        async fn current_address(&self) -> Option<Address> {
            None
        }

        async fn call_raw(&self, _to: Address, _calldata: Bytes) -> Result<Bytes, ChainError> {
            // Only numProposal is read in these tests.
            Ok(U256::from(self.num_proposals).abi_encode().into())
        }

        async fn send(&self, _request: SendRequest) -> Result<TxOutcome, ChainError> {
            unimplemented!("read-only fake")
        }

        async fn logs_for_event(
            &self,
            _address: Address,
            _topic0: B256,
        ) -> Result<Vec<Log>, ChainError> {
            let event = AssetDao::proposalCreated {
                id: U256::from(self.proposal_id),
                creator: self.creator,
            };
            Ok(vec![Log {
                inner: alloy::primitives::Log {
                    address: self.dao_address,
                    data: event.encode_log_data(),
                },
                block_hash: None,
                block_number: Some(self.block_number),
                block_timestamp: None,
                transaction_hash: Some(B256::repeat_byte(0x42)),
                transaction_index: None,
                log_index: None,
                removed: false,
            }])
        }

        async fn block_timestamp(&self, block_number: u64) -> Result<NaiveDateTime, ChainError> {
            assert_eq!(block_number, self.block_number);
            Ok(self.block_time)
        }
    }

    fn event_chain(proposal_id: u64) -> Arc<EventChain> {
        Arc::new(EventChain {
            dao_address: Address::repeat_byte(0x01),
            creator: Address::repeat_byte(0x02),
            proposal_id,
            block_number: 1234,
            block_time: utils::test_utils::parse_datetime("2026-08-01 12:00:00"),
            num_proposals: proposal_id,
        })
    }

    #[tokio::test]
    async fn ladder_falls_through_to_event_replay() {
        let chain = event_chain(7);
        let sources: Vec<Box<dyn ProposalSource>> = vec![
            Box::new(EmptySource),
            Box::new(UndecodableSource),
            Box::new(EventReplaySource::new(
                chain.clone(),
                chain.dao_address,
                Duration::days(7),
            )),
        ];
        let reader = ProposalReader::new(sources, chain.clone(), chain.dao_address);

        let proposal = reader.resolve(7).await.expect("event replay should hit");
        assert_eq!(proposal.source, SourceKind::EventReplay);
        assert_eq!(proposal.yay_votes, 0);
        assert_eq!(proposal.nay_votes, 0);
        assert_eq!(proposal.lot_size, 0);
        assert_eq!(
            proposal.creator_address,
            chain.creator.to_string().to_lowercase()
        );
        // deadline = containing block timestamp + 7 days
        assert_eq!(
            proposal.deadline,
            chain.block_time + Duration::seconds(7 * 24 * 3600)
        );
        assert_eq!(proposal.created_at, Some(chain.block_time));
    }

    #[tokio::test]
    async fn all_sources_missing_is_not_found() {
        let chain = event_chain(1);
        let sources: Vec<Box<dyn ProposalSource>> =
            vec![Box::new(EmptySource), Box::new(UndecodableSource)];
        let reader = ProposalReader::new(sources, chain.clone(), chain.dao_address);

        assert!(reader.resolve(99).await.is_none());
    }

    #[tokio::test]
    async fn event_replay_skips_other_ids() {
        let chain = event_chain(3);
        let source = EventReplaySource::new(chain.clone(), chain.dao_address, Duration::days(7));
        assert!(source.resolve(4).await.unwrap().is_none());
        assert!(source.resolve(3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn resolve_all_falls_back_to_id_walk_and_sorts_descending() {
        let chain = event_chain(3);
        // No bulk-capable source: the reader walks 1..=numProposal(). Only
        // id 3 exists in the logs; the other ids are tolerated misses.
        let sources: Vec<Box<dyn ProposalSource>> = vec![Box::new(EventReplaySource::new(
            chain.clone(),
            chain.dao_address,
            Duration::days(7),
        ))];
        let reader = ProposalReader::new(sources, chain.clone(), chain.dao_address);

        let all = reader.resolve_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].proposal_id, 3);
    }

    #[tokio::test]
    async fn num_proposal_reads_the_contract_counter() {
        let chain = event_chain(5);
        assert_eq!(
            num_proposal(chain.as_ref(), chain.dao_address).await.unwrap(),
            5
        );
    }
}
