use std::fmt::Debug;

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

use crate::rpc::errors::TransportError;

/// Blockhash a transaction was built against, together with the last block
/// height at which it can still land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Server side filter for program account scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset + bytes.len())
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }
}

/// Window of account data returned by a program account scan. Filters still
/// see the whole account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSlice {
    pub offset: usize,
    pub length: usize,
}

impl DataSlice {
    /// Returns addresses only.
    pub const NONE: DataSlice = DataSlice {
        offset: 0,
        length: 0,
    };

    pub fn apply<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let start = self.offset.min(data.len());
        let end = self.offset.saturating_add(self.length).min(data.len());
        &data[start..end]
    }
}

/// Connection to a cluster.
///
/// Submission and confirmation are separate so that callers can submit many
/// transactions and settle them concurrently.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn submit_transaction(&self, transaction: &Transaction)
        -> Result<Signature, TransportError>;

    /// Resolves once the transaction is confirmed. Fails with
    /// [`TransportError::Expired`] once `block` can no longer land and with
    /// [`TransportError::Failed`] if the transaction executed with an error.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        block: &BlockInfo,
    ) -> Result<(), TransportError>;

    async fn get_latest_block_info(&self) -> Result<BlockInfo, TransportError>;

    /// Returns `None` if the account does not exist.
    async fn fetch_account_bytes(&self, address: &Pubkey)
        -> Result<Option<Vec<u8>>, TransportError>;

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, TransportError>;

    async fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        data_slice: Option<DataSlice>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, TransportError>;

    async fn submit_and_confirm(
        &self,
        transaction: &Transaction,
        block: &BlockInfo,
    ) -> Result<Signature, TransportError> {
        let signature = self.submit_transaction(transaction).await?;
        self.confirm_transaction(&signature, block).await?;
        Ok(signature)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_data_slice_clamps_to_account() {
        let data = [1u8, 2, 3, 4];
        assert!(DataSlice::NONE.apply(&data).is_empty());
        let slice = DataSlice {
            offset: 2,
            length: 10,
        };
        assert_eq!(slice.apply(&data), &[3, 4]);
        let slice = DataSlice {
            offset: 8,
            length: 1,
        };
        assert!(slice.apply(&data).is_empty());
    }
}
