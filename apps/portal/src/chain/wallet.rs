use super::error::{ChainError, UNRECOGNIZED_CHAIN_CODE, USER_REJECTED_CODE};
use crate::config::NetworkConfig;
use alloy::{
    primitives::{Address, B256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    transports::{RpcError, TransportError},
};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

/// Error surface of the wallet-facing JSON-RPC methods. Keeps the raw
/// provider error code so callers can tell user rejection (4001) apart from
/// an unrecognized chain (4902).
#[derive(Debug, Clone)]
pub struct WalletRpcError {
    pub code: i64,
    pub message: String,
}

impl WalletRpcError {
    pub fn user_rejected(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }

    pub fn unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN_CODE
    }
}

impl std::fmt::Display for WalletRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wallet error {}: {}", self.code, self.message)
    }
}

/// Parameters for `wallet_addEthereumChain`, built from the configured
/// network so the add-chain prompt carries the full RPC/currency/explorer
/// metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl AddChainParams {
    pub fn from_network(network: &NetworkConfig) -> Self {
        Self {
            chain_id: format!("0x{:x}", network.chain_id),
            chain_name: network.chain_name.clone(),
            rpc_urls: vec![network.rpc_url.clone()],
            native_currency: NativeCurrency {
                name: network.currency_name.clone(),
                symbol: network.currency_symbol.clone(),
                decimals: network.currency_decimals,
            },
            block_explorer_urls: vec![network.explorer_url.clone()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChainParams {
    chain_id: String,
}

/// The injected wallet surface the gateway drives. `accounts` lists
/// already-authorized accounts and never prompts; `request_accounts` may
/// open a popup. Account and chain changes are pushed through watch
/// channels so session state can be invalidated without polling.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn accounts(&self) -> Result<Vec<Address>, WalletRpcError>;
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletRpcError>;
    async fn chain_id(&self) -> Result<u64, WalletRpcError>;
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletRpcError>;
    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletRpcError>;
    /// The wallet signs and submits; the caller waits for the receipt
    /// through its own read connection.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, WalletRpcError>;
    fn accounts_changed(&self) -> watch::Receiver<Option<Address>>;
    fn chain_changed(&self) -> watch::Receiver<Option<u64>>;
}

/// Wallet connector backed by a plain JSON-RPC endpoint (a wallet bridge or
/// a local signer node).
pub struct JsonRpcWallet {
    provider: DynProvider,
    accounts_tx: watch::Sender<Option<Address>>,
    chain_tx: watch::Sender<Option<u64>>,
}

impl JsonRpcWallet {
    pub fn connect(url: &str) -> Result<Self, ChainError> {
        let parsed = url
            .parse()
            .map_err(|e| ChainError::Network(format!("invalid wallet rpc url {url}: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(parsed).erased();
        let (accounts_tx, _) = watch::channel(None);
        let (chain_tx, _) = watch::channel(None);
        Ok(Self {
            provider,
            accounts_tx,
            chain_tx,
        })
    }

    /// Feed an account change originating outside this process (the wallet
    /// UI switched accounts).
    pub fn notify_accounts_changed(&self, account: Option<Address>) {
        let _ = self.accounts_tx.send(account);
    }

    pub fn notify_chain_changed(&self, chain_id: Option<u64>) {
        let _ = self.chain_tx.send(chain_id);
    }

    fn wallet_error(err: TransportError) -> WalletRpcError {
        match &err {
            RpcError::ErrorResp(payload) => WalletRpcError {
                code: payload.code,
                message: payload.message.to_string(),
            },
            _ => WalletRpcError {
                code: -32000,
                message: err.to_string(),
            },
        }
    }
}

#[async_trait]
impl WalletConnector for JsonRpcWallet {
    async fn accounts(&self) -> Result<Vec<Address>, WalletRpcError> {
        self.provider
            .raw_request("eth_accounts".into(), ())
            .await
            .map_err(Self::wallet_error)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletRpcError> {
        self.provider
            .raw_request("eth_requestAccounts".into(), ())
            .await
            .map_err(Self::wallet_error)
    }

    async fn chain_id(&self) -> Result<u64, WalletRpcError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(Self::wallet_error)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletRpcError> {
        let params = SwitchChainParams {
            chain_id: format!("0x{chain_id:x}"),
        };
        let _: serde_json::Value = self
            .provider
            .raw_request("wallet_switchEthereumChain".into(), (params,))
            .await
            .map_err(Self::wallet_error)?;
        self.notify_chain_changed(Some(chain_id));
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletRpcError> {
        let _: serde_json::Value = self
            .provider
            .raw_request("wallet_addEthereumChain".into(), (params.clone(),))
            .await
            .map_err(Self::wallet_error)?;
        Ok(())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, WalletRpcError> {
        self.provider
            .raw_request("eth_sendTransaction".into(), (tx,))
            .await
            .map_err(Self::wallet_error)
    }

    fn accounts_changed(&self) -> watch::Receiver<Option<Address>> {
        self.accounts_tx.subscribe()
    }

    fn chain_changed(&self) -> watch::Receiver<Option<u64>> {
        self.chain_tx.subscribe()
    }
}
