use std::{
    fmt::{Debug, Formatter},
    time::Duration,
};

use async_trait::async_trait;
use solana_account_decoder::{UiAccountEncoding, UiDataSliceConfig};
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::{
    cluster::Cluster,
    rpc::{
        errors::TransportError,
        transport::{AccountFilter, BlockInfo, DataSlice, Transport},
    },
};

#[derive(Clone, Debug, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    /// Interval between signature status polls while confirming.
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 10,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(400),
        }
    }
}

/// [`Transport`] over the JSON RPC interface of a Solana cluster.
///
/// Reads are retried according to [`RetryConfig`]. Submissions are single
/// attempts, resubmitting is up to the caller.
pub struct SolanaRpcTransport {
    pub client: RpcClient,
    pub retry_config: RetryConfig,
}

impl Debug for SolanaRpcTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SolanaRpcTransport {{ client: {:?} }}",
            self.client.url()
        )
    }
}

impl SolanaRpcTransport {
    pub fn new(cluster: &Cluster) -> Self {
        Self::new_with_retry(cluster, CommitmentConfig::confirmed(), None)
    }

    pub fn new_with_retry(
        cluster: &Cluster,
        commitment: CommitmentConfig,
        retry_config: Option<RetryConfig>,
    ) -> Self {
        let client = RpcClient::new_with_commitment(cluster.url(), commitment);
        Self {
            client,
            retry_config: retry_config.unwrap_or_default(),
        }
    }

    async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, TransportError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, TransportError>>,
    {
        let mut attempts = 0;
        let start_time = Instant::now();
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if should_retry(&e) => {
                    attempts += 1;
                    if attempts >= self.retry_config.max_retries
                        || start_time.elapsed() >= self.retry_config.timeout
                    {
                        return Err(e);
                    }
                    warn!(
                        "Operation failed, retrying in {:?} (attempt {}/{}): {:?}",
                        self.retry_config.retry_delay,
                        attempts,
                        self.retry_config.max_retries,
                        e
                    );
                    sleep(self.retry_config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn should_retry(error: &TransportError) -> bool {
    matches!(error, TransportError::ClientError(_) | TransportError::IoError(_))
}

fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
        AccountFilter::Memcmp { offset, bytes } => {
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, bytes))
        }
    }
}

#[async_trait]
impl Transport for SolanaRpcTransport {
    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, TransportError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(|e| TransportError::Rejected(e.to_string()))
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        block: &BlockInfo,
    ) -> Result<(), TransportError> {
        let commitment = self.client.commitment();
        loop {
            let statuses = self
                .retry(|| async {
                    Ok(self
                        .client
                        .get_signature_statuses(std::slice::from_ref(signature))
                        .await?
                        .value)
                })
                .await?;
            if let Some(Some(status)) = statuses.first() {
                if let Some(error) = &status.err {
                    return Err(TransportError::Failed {
                        signature: *signature,
                        error: Box::new(error.clone()),
                    });
                }
                if status.satisfies_commitment(commitment) {
                    debug!("Transaction {} confirmed in slot {}", signature, status.slot);
                    return Ok(());
                }
            }
            let block_height = self
                .retry(|| async { Ok(self.client.get_block_height().await?) })
                .await?;
            if block_height > block.last_valid_block_height {
                return Err(TransportError::Expired(*signature));
            }
            sleep(self.retry_config.poll_interval).await;
        }
    }

    async fn get_latest_block_info(&self) -> Result<BlockInfo, TransportError> {
        self.retry(|| async {
            let (blockhash, last_valid_block_height) = self
                .client
                .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
                .await?;
            Ok(BlockInfo {
                blockhash,
                last_valid_block_height,
            })
        })
        .await
    }

    async fn fetch_account_bytes(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        self.retry(|| async {
            Ok(self
                .client
                .get_account_with_commitment(address, self.client.commitment())
                .await?
                .value
                .map(|account| account.data))
        })
        .await
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, TransportError> {
        self.retry(|| async {
            Ok(self
                .client
                .get_minimum_balance_for_rent_exemption(data_len)
                .await?)
        })
        .await
    }

    async fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        data_slice: Option<DataSlice>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, TransportError> {
        let config = RpcProgramAccountsConfig {
            filters: (!filters.is_empty()).then(|| filters.iter().map(to_rpc_filter).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                data_slice: data_slice.map(|slice| UiDataSliceConfig {
                    offset: slice.offset,
                    length: slice.length,
                }),
                commitment: Some(self.client.commitment()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.retry(|| async {
            let accounts = self
                .client
                .get_program_accounts_with_config(program_id, config.clone())
                .await?;
            Ok(accounts
                .into_iter()
                .map(|(pubkey, account)| (pubkey, account.data))
                .collect())
        })
        .await
    }
}
