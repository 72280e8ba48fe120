pub mod error;

use crate::{
    chain::{
        error::ChainError,
        gateway::{ChainClient, SendRequest, TxOutcome},
    },
    contracts::{AssetDao, AssetToken},
    membership::{JoinOutcome, MembershipReconciler, normalize_address},
    proposals::reader::num_proposal,
    retry::RetryPolicy,
    store,
};
use alloy::{
    primitives::{Address, B256, U256},
    sol_types::{SolCall, SolValue},
};
use chrono::{Duration, NaiveDateTime, Utc};
use error::{ActionError, translate_revert, validate_proposal_in_range};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utils::errors::MIRROR_WRITE_FAILED;

/// Vote encoding the contract expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChoice {
    Nay = 0,
    Yay = 1,
}

impl VoteChoice {
    fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub dao_address: Address,
    pub token_address: Address,
    pub membership_fee_wei: u128,
    pub voting_period: Duration,
    pub token_decimals: u32,
    /// Mirrors the deployed contract's `executeProposal` defect: the call
    /// acts on the latest proposal regardless of the id argument. `false`
    /// assumes a corrected contract that honors the argument.
    pub execute_targets_latest: bool,
    pub join_verify: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedProposal {
    pub proposal_id: u64,
    pub transaction_hash: B256,
    pub deadline: NaiveDateTime,
}

/// Whole-token amount converted to fixed-point token units.
pub fn token_units(amount: f64, decimals: u32) -> U256 {
    U256::from((amount * 10f64.powi(decimals as i32)) as u128)
}

/// Which proposal the contract actually executes for a given request.
pub fn execution_target(requested: u64, latest: u64, targets_latest: bool) -> u64 {
    if targets_latest { latest } else { requested }
}

/// Drives the write actions through a common shape:
/// connect, validate, estimate, submit, confirm, reconcile. Estimation and
/// confirmation live in the chain client; validation and mirror
/// reconciliation differ per action. Mirror failures after a confirmed
/// transaction are logged and swallowed: the chain effect is real and the
/// mirror is repaired by the periodic reconciliation pass.
pub struct Orchestrator {
    chain: Arc<dyn ChainClient>,
    membership: Arc<MembershipReconciler>,
    db: DatabaseConnection,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        membership: Arc<MembershipReconciler>,
        db: DatabaseConnection,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            chain,
            membership,
            db,
            config,
        }
    }

    async fn send_translated(&self, request: SendRequest) -> Result<TxOutcome, ActionError> {
        self.chain.send(request).await.map_err(|err| match err {
            ChainError::Revert(reason) => translate_revert(&reason),
            other => ActionError::Chain(other),
        })
    }

    /// Pay the membership fee and join the DAO. Fails fast when the caller
    /// is already a verified member; the bounded verification loop after
    /// confirmation distinguishes a verified join from an optimistic one.
    #[instrument(skip(self))]
    pub async fn join(&self) -> Result<JoinOutcome, ActionError> {
        let address = self.chain.ensure_session().await?;
        if self.membership.is_member(address).await {
            return Err(ActionError::AlreadyMember);
        }

        let calldata = AssetDao::joinCall {}.abi_encode();
        let outcome = self
            .send_translated(SendRequest::payable(
                self.config.dao_address,
                calldata,
                U256::from(self.config.membership_fee_wei),
            ))
            .await?;
        info!(tx = %outcome.transaction_hash, "Join transaction confirmed");

        Ok(self
            .membership
            .confirm_membership(address, self.config.join_verify)
            .await)
    }

    /// Create a proposal and mirror it with a reconstructed deadline: the
    /// contract enforces the voting window internally but never returns it.
    #[instrument(skip(self, summary))]
    pub async fn create_proposal(
        &self,
        lot_size: u64,
        share_price: u64,
        max_per_investor: u64,
        summary: String,
    ) -> Result<CreatedProposal, ActionError> {
        let address = self.chain.ensure_session().await?;
        if !self.membership.is_member(address).await {
            return Err(ActionError::NotMember);
        }

        let calldata = AssetDao::createProposalCall {
            lotSize: U256::from(lot_size),
            sharePrice: U256::from(share_price),
            maxPerInvestor: U256::from(max_per_investor),
            proposalSummary: summary.clone(),
        }
        .abi_encode();
        let outcome = self
            .send_translated(SendRequest::call(self.config.dao_address, calldata))
            .await?;

        let proposal_id = self.extract_proposal_id(&outcome).await;
        let deadline = Utc::now().naive_utc() + self.config.voting_period;

        let new = store::proposals::NewProposal {
            proposal_id: proposal_id as i64,
            lot_size: lot_size as i64,
            share_price: share_price as f64,
            max_per_investor: max_per_investor as i64,
            proposal_summary: summary,
            creator_address: normalize_address(address),
            deadline,
            transaction_hash: Some(outcome.transaction_hash.to_string()),
        };
        if let Err(err) = store::proposals::upsert_proposal(&self.db, &new).await {
            error!(error = %err, proposal_id, "{}", MIRROR_WRITE_FAILED);
        }

        info!(proposal_id, tx = %outcome.transaction_hash, "Proposal created");
        Ok(CreatedProposal {
            proposal_id,
            transaction_hash: outcome.transaction_hash,
            deadline,
        })
    }

    /// Cast a vote. The id must be in `1..=numProposal()` and the caller a
    /// verified member before any gas is estimated; contract-side rejections
    /// (deadline, double vote, membership) are translated from the
    /// estimation revert.
    #[instrument(skip(self))]
    pub async fn vote(
        &self,
        proposal_id: u64,
        choice: VoteChoice,
    ) -> Result<TxOutcome, ActionError> {
        let address = self.chain.ensure_session().await?;

        let latest = num_proposal(self.chain.as_ref(), self.config.dao_address).await?;
        validate_proposal_in_range(proposal_id, latest)?;
        if !self.membership.is_member(address).await {
            return Err(ActionError::NotMember);
        }

        let calldata = AssetDao::voteProposalCall {
            proposalId: U256::from(proposal_id),
            vote: choice.as_u8(),
        }
        .abi_encode();
        let outcome = self
            .send_translated(SendRequest::call(self.config.dao_address, calldata))
            .await?;

        // Full-replace counter refresh; see the store docs for the
        // last-writer-wins caveat under concurrent voters.
        match store::proposals::get_by_id(&self.db, proposal_id as i64).await {
            Ok(Some(current)) => {
                let (yay, nay) = match choice {
                    VoteChoice::Yay => (current.model.yay_votes + 1, current.model.nay_votes),
                    VoteChoice::Nay => (current.model.yay_votes, current.model.nay_votes + 1),
                };
                if let Err(err) =
                    store::proposals::update_votes(&self.db, proposal_id as i64, yay, nay).await
                {
                    error!(error = %err, proposal_id, "{}", MIRROR_WRITE_FAILED);
                }
            }
            Ok(None) => {
                warn!(proposal_id, "Vote confirmed for a proposal missing from the mirror");
            }
            Err(err) => {
                error!(error = %err, proposal_id, "{}", MIRROR_WRITE_FAILED);
            }
        }

        info!(proposal_id, ?choice, tx = %outcome.transaction_hash, "Vote confirmed");
        Ok(outcome)
    }

    /// Execute a proposal. The mirror update follows the proposal the
    /// contract actually changed, which under the deployed contract is the
    /// latest one regardless of the requested id.
    #[instrument(skip(self))]
    pub async fn execute(&self, proposal_id: u64) -> Result<TxOutcome, ActionError> {
        self.chain.ensure_session().await?;

        let latest = num_proposal(self.chain.as_ref(), self.config.dao_address).await?;
        validate_proposal_in_range(proposal_id, latest)?;

        if let Ok(Some(current)) = store::proposals::get_by_id(&self.db, proposal_id as i64).await
        {
            if current.model.executed {
                return Err(ActionError::AlreadyExecuted);
            }
        }

        let calldata = AssetDao::executeProposalCall {
            proposalId: U256::from(proposal_id),
        }
        .abi_encode();
        let outcome = self
            .send_translated(SendRequest::call(self.config.dao_address, calldata))
            .await?;

        let target = execution_target(proposal_id, latest, self.config.execute_targets_latest);
        if target != proposal_id {
            warn!(
                requested = proposal_id,
                target, "Contract executed the latest proposal, not the requested one"
            );
        }
        if let Err(err) = store::proposals::update_execution(&self.db, target as i64, true).await {
            error!(error = %err, proposal_id = target, "{}", MIRROR_WRITE_FAILED);
        }

        info!(proposal_id = target, tx = %outcome.transaction_hash, "Proposal executed");
        Ok(outcome)
    }

    /// Buy lots in an executed proposal. Balance is pre-checked off-chain
    /// and the approval step is skipped when the standing allowance already
    /// covers the amount.
    #[instrument(skip(self))]
    pub async fn buy_lot(
        &self,
        proposal_id: u64,
        lots: u64,
        lot_price: f64,
    ) -> Result<TxOutcome, ActionError> {
        let address = self.chain.ensure_session().await?;

        let total_amount = lots as f64 * lot_price;
        let required = token_units(total_amount, self.config.token_decimals);

        let balance = self
            .token_read(AssetToken::balanceOfCall { account: address }.abi_encode())
            .await?;
        if balance < required {
            return Err(ActionError::InsufficientBalance {
                required,
                available: balance,
            });
        }

        let allowance = self
            .token_read(
                AssetToken::allowanceCall {
                    owner: address,
                    spender: self.config.dao_address,
                }
                .abi_encode(),
            )
            .await?;
        if allowance < required {
            let approval = self
                .send_translated(SendRequest::call(
                    self.config.token_address,
                    AssetToken::approveCall {
                        spender: self.config.dao_address,
                        amount: required,
                    }
                    .abi_encode(),
                ))
                .await?;
            info!(tx = %approval.transaction_hash, "Token approval confirmed");
        } else {
            debug!("Existing allowance covers the purchase, skipping approval");
        }

        let outcome = self
            .send_translated(SendRequest::call(
                self.config.dao_address,
                AssetDao::buyLotCall {}.abi_encode(),
            ))
            .await?;

        let new = store::investments::NewInvestment {
            investor_address: normalize_address(address),
            proposal_id: proposal_id as i64,
            lots: lots as i64,
            lot_price,
            total_amount,
            transaction_hash: outcome.transaction_hash.to_string(),
            purchase_date: Utc::now().naive_utc(),
        };
        if let Err(err) = store::investments::record(&self.db, &new).await {
            error!(error = %err, proposal_id, "{}", MIRROR_WRITE_FAILED);
        }

        info!(proposal_id, lots, tx = %outcome.transaction_hash, "Lot purchase confirmed");
        Ok(outcome)
    }

    async fn token_read(&self, calldata: Vec<u8>) -> Result<U256, ActionError> {
        let data = self
            .chain
            .call_raw(self.config.token_address, calldata.into())
            .await?;
        U256::abi_decode(&data)
            .map_err(|e| ActionError::Chain(ChainError::Decode(e.to_string())))
    }

    /// Event logs are the preferred id source; fall back to the contract's
    /// counter, then to the block number as a last-resort identifier.
    async fn extract_proposal_id(&self, outcome: &TxOutcome) -> u64 {
        for log in &outcome.logs {
            if let Ok(decoded) = log.log_decode::<AssetDao::proposalCreated>() {
                return decoded.inner.data.id.to::<u64>();
            }
        }
        warn!("proposalCreated log missing from receipt, falling back to contract counter");
        match num_proposal(self.chain.as_ref(), self.config.dao_address).await {
            Ok(latest) => latest,
            Err(err) => {
                warn!(error = %err, "Contract counter unavailable, using block number");
                outcome.block_number.unwrap_or_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{MemberCache, MembershipSource};
    use alloy::{rpc::types::Log, sol_types::SolEvent};
    use anyhow::Result as AnyResult;
    use assetdao_db::models::dao_proposal;
    use async_trait::async_trait;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    struct StaticSource {
        flag: bool,
    }

    #[async_trait]
    impl MembershipSource for StaticSource {
        async fn membership_flag(&self, _address: Address) -> Result<bool, ChainError> {
            Ok(self.flag)
        }
    }

    #[derive(Default)]
    struct NullCache;

    #[async_trait]
    impl MemberCache for NullCache {
        async fn get(&self, _address: &str) -> AnyResult<Option<bool>> {
            Ok(None)
        }

        async fn put(&self, _address: &str, _is_member: bool) -> AnyResult<()> {
            Ok(())
        }
    }

    struct FakeChain {
        address: Address,
        num_proposals: u64,
        balance: U256,
        allowance: U256,
        send_logs: Vec<Log>,
        sends: Mutex<Vec<SendRequest>>,
        reads: AtomicUsize,
    }

    impl FakeChain {
        fn new(num_proposals: u64) -> Self {
            Self {
                address: Address::repeat_byte(0x55),
                num_proposals,
                balance: U256::ZERO,
                allowance: U256::ZERO,
                send_logs: vec![],
                sends: Mutex::new(vec![]),
                reads: AtomicUsize::new(0),
            }
        }

        fn send_count(&self) -> usize {
            self.sends.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn ensure_session(&self) -> Result<Address, ChainError> {
            Ok(self.address)
        }

        async fn current_address(&self) -> Option<Address> {
            Some(self.address)
        }

        async fn call_raw(
            &self,
            _to: Address,
            calldata: alloy::primitives::Bytes,
        ) -> Result<alloy::primitives::Bytes, ChainError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let selector: [u8; 4] = calldata[..4].try_into().unwrap();
            let result = if selector == AssetDao::numProposalCall::SELECTOR {
                U256::from(self.num_proposals).abi_encode()
            } else if selector == AssetToken::balanceOfCall::SELECTOR {
                self.balance.abi_encode()
            } else if selector == AssetToken::allowanceCall::SELECTOR {
                self.allowance.abi_encode()
            } else {
                return Err(ChainError::Rpc(format!(
                    "unexpected read selector {selector:?}"
                )));
            };
            Ok(result.into())
        }

        async fn send(&self, request: SendRequest) -> Result<TxOutcome, ChainError> {
            self.sends.lock().unwrap().push(request);
            Ok(TxOutcome {
                transaction_hash: B256::repeat_byte(0x99),
                block_number: Some(10),
                logs: self.send_logs.clone(),
            })
        }

        async fn logs_for_event(
            &self,
            _address: Address,
            _topic0: B256,
        ) -> Result<Vec<Log>, ChainError> {
            Ok(vec![])
        }

        async fn block_timestamp(&self, _block_number: u64) -> Result<NaiveDateTime, ChainError> {
            Err(ChainError::Rpc("not available".to_string()))
        }
    }

    fn membership(flag: bool) -> Arc<MembershipReconciler> {
        Arc::new(MembershipReconciler::new(
            Arc::new(StaticSource { flag }),
            Arc::new(NullCache),
            RetryPolicy::new(3, std::time::Duration::ZERO),
        ))
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            dao_address: Address::repeat_byte(0x01),
            token_address: Address::repeat_byte(0x02),
            membership_fee_wei: 10_000_000_000_000_000,
            voting_period: Duration::days(7),
            token_decimals: 6,
            execute_targets_latest: true,
            join_verify: RetryPolicy::new(10, std::time::Duration::ZERO),
        }
    }

    fn mirror_row(proposal_id: i64, yay: i64, nay: i64, executed: bool) -> dao_proposal::Model {
        let now = Utc::now().naive_utc();
        dao_proposal::Model {
            id: proposal_id as i32,
            proposal_id,
            lot_size: 1000,
            share_price: 10.0,
            max_per_investor: 5,
            proposal_summary: "Test".to_string(),
            creator_address: "0x5555555555555555555555555555555555555555".to_string(),
            deadline: now + Duration::days(7),
            yay_votes: yay,
            nay_votes: nay,
            executed,
            transaction_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    #[tokio::test]
    async fn join_fails_fast_for_verified_member() {
        let chain = Arc::new(FakeChain::new(0));
        let orchestrator =
            Orchestrator::new(chain.clone(), membership(true), empty_db(), config());

        let err = orchestrator.join().await.unwrap_err();
        assert!(matches!(err, ActionError::AlreadyMember));
        // No transaction was issued.
        assert_eq!(chain.send_count(), 0);
    }

    #[tokio::test]
    async fn vote_out_of_range_fails_before_any_estimation() {
        let chain = Arc::new(FakeChain::new(5));
        let orchestrator =
            Orchestrator::new(chain.clone(), membership(true), empty_db(), config());

        let err = orchestrator.vote(0, VoteChoice::Yay).await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::ProposalOutOfRange { id: 0, max: 5 }
        ));

        let err = orchestrator.vote(6, VoteChoice::Yay).await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::ProposalOutOfRange { id: 6, max: 5 }
        ));

        // Estimation happens inside send; nothing ever reached it.
        assert_eq!(chain.send_count(), 0);
    }

    #[tokio::test]
    async fn vote_by_non_member_is_rejected_off_chain() {
        let chain = Arc::new(FakeChain::new(5));
        let orchestrator =
            Orchestrator::new(chain.clone(), membership(false), empty_db(), config());

        let err = orchestrator.vote(3, VoteChoice::Yay).await.unwrap_err();
        assert!(matches!(err, ActionError::NotMember));
        assert_eq!(chain.send_count(), 0);
    }

    #[tokio::test]
    async fn vote_refreshes_mirror_counters_with_full_replace() {
        let chain = Arc::new(FakeChain::new(5));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                // get_by_id before the counter refresh
                vec![mirror_row(3, 1, 0, false)],
                // update_votes: lookup, then the RETURNING row
                vec![mirror_row(3, 1, 0, false)],
                vec![mirror_row(3, 2, 0, false)],
            ])
            .into_connection();
        let orchestrator = Orchestrator::new(chain.clone(), membership(true), db, config());

        orchestrator.vote(3, VoteChoice::Yay).await.unwrap();
        assert_eq!(chain.send_count(), 1);
    }

    #[tokio::test]
    async fn create_proposal_takes_id_from_event_log() {
        let mut chain = FakeChain::new(4);
        let event = AssetDao::proposalCreated {
            id: U256::from(5),
            creator: chain.address,
        };
        chain.send_logs = vec![Log {
            inner: alloy::primitives::Log {
                address: config().dao_address,
                data: event.encode_log_data(),
            },
            block_hash: None,
            block_number: Some(10),
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(0x99)),
            transaction_index: None,
            log_index: None,
            removed: false,
        }];
        let chain = Arc::new(chain);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![mirror_row(5, 0, 0, false)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 5,
                rows_affected: 1,
            }])
            .into_connection();
        let orchestrator = Orchestrator::new(chain.clone(), membership(true), db, config());

        let before = Utc::now().naive_utc();
        let created = orchestrator
            .create_proposal(1000, 10, 5, "Test".to_string())
            .await
            .unwrap();

        assert_eq!(created.proposal_id, 5);
        // deadline reconstructed as now + voting window
        let expected = before + Duration::days(7);
        let drift = (created.deadline - expected).num_seconds().abs();
        assert!(drift <= 5, "deadline drifted {drift}s from now+7d");
    }

    #[tokio::test]
    async fn create_proposal_without_log_falls_back_to_counter() {
        let chain = Arc::new(FakeChain::new(4));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![mirror_row(4, 0, 0, false)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 4,
                rows_affected: 1,
            }])
            .into_connection();
        let orchestrator = Orchestrator::new(chain.clone(), membership(true), db, config());

        let created = orchestrator
            .create_proposal(1000, 10, 5, "Test".to_string())
            .await
            .unwrap();
        assert_eq!(created.proposal_id, 4);
    }

    #[tokio::test]
    async fn execute_fails_fast_when_mirror_knows_it_is_executed() {
        let chain = Arc::new(FakeChain::new(5));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![mirror_row(3, 2, 0, true)]])
            .into_connection();
        let orchestrator = Orchestrator::new(chain.clone(), membership(true), db, config());

        let err = orchestrator.execute(3).await.unwrap_err();
        assert!(matches!(err, ActionError::AlreadyExecuted));
        assert_eq!(chain.send_count(), 0);
    }

    #[test]
    fn execution_target_is_bug_compatible_when_flagged() {
        // Deployed contract: the requested id is ignored.
        assert_eq!(execution_target(3, 7, true), 7);
        // Corrected contract: the requested id is honored.
        assert_eq!(execution_target(3, 7, false), 3);
    }

    #[tokio::test]
    async fn buy_lot_rejects_insufficient_balance_before_sending() {
        let mut chain = FakeChain::new(5);
        chain.balance = token_units(10.0, 6);
        let chain = Arc::new(chain);
        let orchestrator =
            Orchestrator::new(chain.clone(), membership(true), empty_db(), config());

        let err = orchestrator.buy_lot(3, 5, 10.0).await.unwrap_err();
        match err {
            ActionError::InsufficientBalance {
                required,
                available,
            } => {
                assert_eq!(required, token_units(50.0, 6));
                assert_eq!(available, token_units(10.0, 6));
            }
            other => panic!("expected insufficient balance, got {other:?}"),
        }
        assert_eq!(chain.send_count(), 0);
    }

    #[tokio::test]
    async fn buy_lot_skips_approval_when_allowance_covers_amount() {
        let mut chain = FakeChain::new(5);
        chain.balance = token_units(100.0, 6);
        chain.allowance = token_units(100.0, 6);
        let chain = Arc::new(chain);

        let now = Utc::now().naive_utc();
        let investment = assetdao_db::models::investment::Model {
            id: 1,
            investor_address: normalize_address(chain.address),
            proposal_id: 3,
            lots: 5,
            lot_price: 10.0,
            total_amount: 50.0,
            transaction_hash: B256::repeat_byte(0x99).to_string(),
            status: assetdao_db::models::sea_orm_active_enums::InvestmentStatus::Active,
            purchase_date: now,
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![investment]])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();
        let orchestrator = Orchestrator::new(chain.clone(), membership(true), db, config());

        orchestrator.buy_lot(3, 5, 10.0).await.unwrap();
        // Only the purchase itself was sent, no approval transaction.
        assert_eq!(chain.send_count(), 1);
    }

    #[tokio::test]
    async fn buy_lot_approves_when_allowance_is_short() {
        let mut chain = FakeChain::new(5);
        chain.balance = token_units(100.0, 6);
        chain.allowance = token_units(1.0, 6);
        let chain = Arc::new(chain);

        let now = Utc::now().naive_utc();
        let investment = assetdao_db::models::investment::Model {
            id: 1,
            investor_address: normalize_address(chain.address),
            proposal_id: 3,
            lots: 5,
            lot_price: 10.0,
            total_amount: 50.0,
            transaction_hash: B256::repeat_byte(0x99).to_string(),
            status: assetdao_db::models::sea_orm_active_enums::InvestmentStatus::Active,
            purchase_date: now,
            created_at: now,
            updated_at: now,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![investment]])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();
        let orchestrator = Orchestrator::new(chain.clone(), membership(true), db, config());

        orchestrator.buy_lot(3, 5, 10.0).await.unwrap();
        assert_eq!(chain.send_count(), 2);
        // Approval goes to the token contract, the purchase to the DAO.
        let sends = chain.sends.lock().unwrap();
        assert_eq!(sends[0].to, config().token_address);
        assert_eq!(sends[1].to, config().dao_address);
    }

    #[test]
    fn token_units_use_six_decimal_fixed_point() {
        assert_eq!(token_units(50.0, 6), U256::from(50_000_000u64));
        assert_eq!(token_units(0.5, 6), U256::from(500_000u64));
        assert_eq!(token_units(0.0, 6), U256::ZERO);
    }
}
