use crate::{
    chain::{
        error::ChainError,
        gateway::{ChainClient, decode_membership_flag},
    },
    contracts::AssetDao,
    retry::RetryPolicy,
    store,
};
use alloy::{primitives::Address, sol_types::SolCall};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Terminal outcome of the post-join verification loop. `Unverified` means
/// the join transaction confirmed but the node never served the updated
/// membership state within the bounded wait; callers must display the two
/// outcomes differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Verified,
    Unverified,
}

/// Authoritative membership read. The contract is the source of truth; the
/// trait exists so tests can inject failing or stale sources.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn membership_flag(&self, address: Address) -> Result<bool, ChainError>;
}

/// Chain-backed source: encodes `addressToUser(address)` and decodes the
/// result through the shape-tolerant adapter.
pub struct ContractMembershipSource {
    chain: Arc<dyn ChainClient>,
    dao_address: Address,
}

impl ContractMembershipSource {
    pub fn new(chain: Arc<dyn ChainClient>, dao_address: Address) -> Self {
        Self { chain, dao_address }
    }
}

#[async_trait]
impl MembershipSource for ContractMembershipSource {
    async fn membership_flag(&self, address: Address) -> Result<bool, ChainError> {
        let calldata = AssetDao::addressToUserCall { account: address }.abi_encode();
        let data = self
            .chain
            .call_raw(self.dao_address, calldata.into())
            .await?;
        decode_membership_flag(&data)
    }
}

/// Cached mirror of the membership mapping.
#[async_trait]
pub trait MemberCache: Send + Sync {
    async fn get(&self, address: &str) -> Result<Option<bool>>;
    async fn put(&self, address: &str, is_member: bool) -> Result<()>;
}

/// Production cache over the `dao_members` table.
pub struct DbMemberCache {
    db: DatabaseConnection,
}

impl DbMemberCache {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MemberCache for DbMemberCache {
    async fn get(&self, address: &str) -> Result<Option<bool>> {
        Ok(store::members::get(&self.db, address)
            .await?
            .map(|record| record.is_member))
    }

    async fn put(&self, address: &str, is_member: bool) -> Result<()> {
        store::members::upsert(&self.db, address, is_member).await
    }
}

pub fn normalize_address(address: Address) -> String {
    address.to_string().to_lowercase()
}

pub struct MembershipReconciler {
    source: Arc<dyn MembershipSource>,
    cache: Arc<dyn MemberCache>,
    verify_policy: RetryPolicy,
}

impl MembershipReconciler {
    pub fn new(
        source: Arc<dyn MembershipSource>,
        cache: Arc<dyn MemberCache>,
        verify_policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            cache,
            verify_policy,
        }
    }

    /// Answer "is this address a DAO member". The contract is authoritative
    /// and repairs the cache on every successful read. When every retry
    /// fails the cached value is used if one exists; otherwise the answer is
    /// `false`: unverifiable membership never grants governance rights.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn is_member(&self, address: Address) -> bool {
        let key = normalize_address(address);
        let cached = match self.cache.get(&key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "Member cache read failed");
                None
            }
        };

        for attempt in 1..=self.verify_policy.max_attempts {
            match self.source.membership_flag(address).await {
                Ok(flag) => {
                    if cached.is_some_and(|c| c != flag) {
                        debug!(cached = cached, verified = flag, "Repairing stale member cache");
                    }
                    if let Err(err) = self.cache.put(&key, flag).await {
                        warn!(error = %err, "Member cache write failed");
                    }
                    return flag;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Membership verification failed");
                    if attempt < self.verify_policy.max_attempts {
                        self.verify_policy.pause().await;
                    }
                }
            }
        }

        match cached {
            Some(flag) => {
                warn!(cached = flag, "Falling back to cached membership value");
                flag
            }
            None => {
                warn!("Membership unverifiable and uncached, treating as non-member");
                false
            }
        }
    }

    /// Bounded post-join verification. The node may serve stale state right
    /// after the join block, so poll until the membership flag flips. If the
    /// loop exhausts, the cache is still marked optimistically (the join
    /// transaction itself confirmed) but the result is reported as
    /// unverified.
    #[instrument(skip(self, policy), fields(address = %address))]
    pub async fn confirm_membership(&self, address: Address, policy: RetryPolicy) -> JoinOutcome {
        let key = normalize_address(address);
        for attempt in 1..=policy.max_attempts {
            match self.source.membership_flag(address).await {
                Ok(true) => {
                    info!(attempt, "Membership verified after join");
                    if let Err(err) = self.cache.put(&key, true).await {
                        warn!(error = %err, "Member cache write failed");
                    }
                    return JoinOutcome::Verified;
                }
                Ok(false) => {
                    debug!(attempt, "Membership not yet visible on node");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Membership verification attempt failed");
                }
            }
            if attempt < policy.max_attempts {
                policy.pause().await;
            }
        }

        warn!("Join confirmed on-chain but membership is still unverified");
        if let Err(err) = self.cache.put(&key, true).await {
            warn!(error = %err, "Member cache write failed");
        }
        JoinOutcome::Unverified
    }
}
