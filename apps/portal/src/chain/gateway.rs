use super::{
    error::ChainError,
    wallet::{AddChainParams, WalletConnector},
};
use crate::{config::NetworkConfig, retry::RetryPolicy};
use alloy::{
    consensus::TxReceipt as _,
    eips::BlockNumberOrTag,
    network::TransactionBuilder,
    primitives::{Address, B256, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log, TransactionRequest},
    sol_types::SolValue,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};

/// The active wallet session: which account signs and which chain the wallet
/// reported. Mutated only by explicit connect/disconnect and by
/// wallet-originated account/chain change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    pub address: Address,
    pub chain_id: u64,
}

/// A write request: target contract, ABI-encoded calldata, attached value.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
}

impl SendRequest {
    pub fn call(to: Address, calldata: Vec<u8>) -> Self {
        Self {
            to,
            calldata: calldata.into(),
            value: U256::ZERO,
        }
    }

    pub fn payable(to: Address, calldata: Vec<u8>, value: U256) -> Self {
        Self {
            to,
            calldata: calldata.into(),
            value,
        }
    }
}

/// Confirmed transaction result handed back to orchestrators for mirror
/// reconciliation.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

/// Uniform read/write contract-call surface. Everything above the gateway
/// consumes this trait so tests can substitute fakes.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Establish a signing session, requesting wallet connection and a
    /// network switch if needed. Returns the signing address.
    async fn ensure_session(&self) -> Result<Address, ChainError>;
    async fn current_address(&self) -> Option<Address>;
    async fn call_raw(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError>;
    async fn send(&self, request: SendRequest) -> Result<TxOutcome, ChainError>;
    async fn logs_for_event(&self, address: Address, topic0: B256)
    -> Result<Vec<Log>, ChainError>;
    async fn block_timestamp(&self, block_number: u64) -> Result<NaiveDateTime, ChainError>;
}

/// Gas limit: estimate plus a 20% safety buffer.
pub fn compute_gas_limit(estimate: u64) -> u64 {
    estimate + estimate / 5
}

/// Decode the membership flag regardless of how the ABI exposes it: a bare
/// bool, a one-element tuple, or a struct whose first field is the flag.
pub fn decode_membership_flag(data: &[u8]) -> Result<bool, ChainError> {
    if data.is_empty() {
        return Err(ChainError::Decode("empty return data".to_string()));
    }
    if let Ok(flag) = bool::abi_decode(data) {
        return Ok(flag);
    }
    if let Ok((flag,)) = <(bool,)>::abi_decode(data) {
        return Ok(flag);
    }
    let word = data
        .get(..32)
        .ok_or_else(|| ChainError::Decode(format!("short return data: {} bytes", data.len())))?;
    match U256::from_be_slice(word) {
        v if v == U256::ZERO => Ok(false),
        v if v == U256::from(1) => Ok(true),
        v => Err(ChainError::Decode(format!(
            "membership flag word is neither 0 nor 1: {v}"
        ))),
    }
}

pub struct ChainGateway {
    network: NetworkConfig,
    connector: Arc<dyn WalletConnector>,
    read_provider: OnceCell<DynProvider>,
    session: RwLock<Option<WalletSession>>,
    // Serializes writes per session so two transactions never race the same
    // nonce.
    send_lock: Mutex<()>,
    receipt_policy: RetryPolicy,
    default_gas_price_wei: u128,
}

impl ChainGateway {
    pub fn new(
        network: NetworkConfig,
        connector: Arc<dyn WalletConnector>,
        receipt_policy: RetryPolicy,
        default_gas_price_wei: u128,
    ) -> Self {
        Self {
            network,
            connector,
            read_provider: OnceCell::new(),
            session: RwLock::new(None),
            send_lock: Mutex::new(()),
            receipt_policy,
            default_gas_price_wei,
        }
    }

    /// Lazily build the read-only provider, preferring the configured RPC
    /// endpoint and falling back to the public one.
    fn read_provider(&self) -> Result<&DynProvider, ChainError> {
        self.read_provider.get_or_try_init(|| {
            let url = self
                .network
                .rpc_url
                .parse()
                .or_else(|_| self.network.fallback_rpc_url.parse())
                .map_err(|e| ChainError::Network(format!("no usable rpc endpoint: {e}")))?;
            Ok(ProviderBuilder::new().connect_http(url).erased())
        })
    }

    /// Establish read-only state without ever prompting: build the RPC
    /// connection and pick up any already-authorized wallet account.
    #[instrument(skip(self))]
    pub async fn initialize_read_only(&self) -> Result<(), ChainError> {
        self.read_provider()?;
        match self.connector.accounts().await {
            Ok(accounts) => {
                if let Some(address) = accounts.first().copied() {
                    let chain_id = self.connector.chain_id().await.unwrap_or_default();
                    *self.session.write().await = Some(WalletSession { address, chain_id });
                    info!(address = %address, chain_id, "Resumed already-authorized wallet session");
                } else {
                    debug!("No authorized wallet accounts, staying read-only");
                }
            }
            Err(err) => {
                debug!(error = %err, "Wallet not reachable, staying read-only");
            }
        }
        Ok(())
    }

    /// Explicit, user-initiated connection. May trigger a wallet popup.
    /// Verifies the connected chain and warns on mismatch without switching.
    #[instrument(skip(self))]
    pub async fn request_wallet_connection(&self) -> Result<WalletSession, ChainError> {
        let accounts = self.connector.request_accounts().await.map_err(|e| {
            if e.user_rejected() {
                ChainError::UserRejected
            } else {
                ChainError::Rpc(e.to_string())
            }
        })?;
        let address = accounts.first().copied().ok_or(ChainError::UserRejected)?;

        let chain_id = self
            .connector
            .chain_id()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        if chain_id != self.network.chain_id {
            warn!(
                connected = chain_id,
                expected = self.network.chain_id,
                "Wallet is connected to the wrong chain"
            );
        }

        let session = WalletSession { address, chain_id };
        *self.session.write().await = Some(session.clone());
        info!(address = %address, chain_id, "Wallet session established");
        Ok(session)
    }

    /// Ask the wallet to switch to the configured chain, adding it first if
    /// the wallet does not know it. A rejection of either request fails the
    /// switch as a network error.
    #[instrument(skip(self))]
    pub async fn switch_to_expected_network(&self) -> Result<(), ChainError> {
        let expected = self.network.chain_id;
        match self.connector.switch_chain(expected).await {
            Ok(()) => {}
            Err(err) if err.unrecognized_chain() => {
                info!(chain_id = expected, "Chain unknown to wallet, adding it");
                let params = AddChainParams::from_network(&self.network);
                self.connector.add_chain(&params).await.map_err(|e| {
                    if e.user_rejected() {
                        ChainError::Network("user rejected the add-chain request".to_string())
                    } else {
                        ChainError::Network(e.to_string())
                    }
                })?;
                self.connector.switch_chain(expected).await.map_err(|e| {
                    if e.user_rejected() {
                        ChainError::Network("user rejected the network switch".to_string())
                    } else {
                        ChainError::Network(e.to_string())
                    }
                })?;
            }
            Err(err) if err.user_rejected() => {
                return Err(ChainError::Network(
                    "user rejected the network switch".to_string(),
                ));
            }
            Err(err) => return Err(ChainError::Network(err.to_string())),
        }

        if let Some(session) = self.session.write().await.as_mut() {
            session.chain_id = expected;
        }
        Ok(())
    }

    pub async fn disconnect(&self) {
        *self.session.write().await = None;
        info!("Wallet session cleared");
    }

    pub async fn session(&self) -> Option<WalletSession> {
        self.session.read().await.clone()
    }

    /// Keep session state in step with wallet-originated account and chain
    /// change notifications.
    pub fn spawn_session_watcher(self: Arc<Self>) -> JoinHandle<()> {
        let mut accounts_rx = self.connector.accounts_changed();
        let mut chain_rx = self.connector.chain_changed();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = accounts_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let account = *accounts_rx.borrow();
                        let mut session = self.session.write().await;
                        match (account, session.as_mut()) {
                            (Some(address), Some(existing)) => {
                                info!(address = %address, "Wallet account changed");
                                existing.address = address;
                            }
                            (Some(address), None) => {
                                info!(address = %address, "Wallet account appeared");
                            }
                            (None, _) => {
                                info!("Wallet disconnected all accounts");
                                *session = None;
                            }
                        }
                    }
                    changed = chain_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let chain_id = *chain_rx.borrow();
                        let mut session = self.session.write().await;
                        if let (Some(id), Some(existing)) = (chain_id, session.as_mut()) {
                            info!(chain_id = id, "Wallet chain changed");
                            existing.chain_id = id;
                        }
                    }
                }
            }
        })
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TxOutcome, ChainError> {
        let provider = self.read_provider()?;
        for attempt in 1..=self.receipt_policy.max_attempts {
            match provider.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.status() {
                        return Err(ChainError::Revert(
                            "transaction reverted on-chain".to_string(),
                        ));
                    }
                    return Ok(TxOutcome {
                        transaction_hash: receipt.transaction_hash,
                        block_number: receipt.block_number,
                        logs: receipt.inner.logs().to_vec(),
                    });
                }
                Ok(None) => {
                    debug!(tx = %hash, attempt, "Receipt not yet available");
                }
                Err(err) => {
                    warn!(tx = %hash, attempt, error = %err, "Receipt query failed");
                }
            }
            if attempt < self.receipt_policy.max_attempts {
                self.receipt_policy.pause().await;
            }
        }
        Err(ChainError::Rpc(format!(
            "timed out waiting for receipt of {hash}"
        )))
    }
}

#[async_trait]
impl ChainClient for ChainGateway {
    async fn ensure_session(&self) -> Result<Address, ChainError> {
        let existing = self.session().await;
        let session = match existing {
            Some(session) => session,
            None => self.request_wallet_connection().await?,
        };
        if session.chain_id != self.network.chain_id {
            self.switch_to_expected_network().await?;
        }
        Ok(session.address)
    }

    async fn current_address(&self) -> Option<Address> {
        if let Some(session) = self.session().await {
            return Some(session.address);
        }
        // Non-prompting account listing as the fallback.
        self.connector
            .accounts()
            .await
            .ok()
            .and_then(|accounts| accounts.first().copied())
    }

    async fn call_raw(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let provider = self.read_provider()?;
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        provider.call(tx).await.map_err(ChainError::from)
    }

    async fn send(&self, request: SendRequest) -> Result<TxOutcome, ChainError> {
        let session = self.session().await.ok_or(ChainError::SessionRequired)?;
        let _guard = self.send_lock.lock().await;

        let provider = self.read_provider()?;
        let mut tx = TransactionRequest::default()
            .with_from(session.address)
            .with_to(request.to)
            .with_input(request.calldata.clone());
        if !request.value.is_zero() {
            tx = tx.with_value(request.value);
        }

        // Estimation failures surface the revert reason before anything is
        // submitted or any gas is spent.
        let estimate = provider
            .estimate_gas(tx.clone())
            .await
            .map_err(ChainError::from)?;

        let gas_price = match provider.get_gas_price().await {
            Ok(price) => price,
            Err(err) => {
                warn!(
                    error = %err,
                    fallback = self.default_gas_price_wei,
                    "Failed to fetch fee data, using default gas price"
                );
                self.default_gas_price_wei
            }
        };

        let tx = tx
            .with_gas_limit(compute_gas_limit(estimate))
            .with_gas_price(gas_price);

        let hash = self.connector.send_transaction(tx).await.map_err(|e| {
            if e.user_rejected() {
                ChainError::UserRejected
            } else {
                ChainError::Rpc(e.to_string())
            }
        })?;
        info!(tx = %hash, gas_estimate = estimate, "Transaction submitted");

        self.wait_for_receipt(hash).await
    }

    async fn logs_for_event(
        &self,
        address: Address,
        topic0: B256,
    ) -> Result<Vec<Log>, ChainError> {
        let provider = self.read_provider()?;
        let filter = Filter::new()
            .address(address)
            .event_signature(topic0)
            .from_block(BlockNumberOrTag::Earliest);
        provider.get_logs(&filter).await.map_err(ChainError::from)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<NaiveDateTime, ChainError> {
        let provider = self.read_provider()?;
        let block = provider
            .get_block_by_number(block_number.into())
            .await
            .map_err(ChainError::from)?
            .ok_or_else(|| ChainError::Rpc(format!("block {block_number} not found")))?;
        DateTime::from_timestamp(block.header.timestamp as i64, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| ChainError::Decode(format!("bad block timestamp {block_number}")))
    }
}
