use std::collections::HashMap;

use data_account_layout::{decode_payload, DataAccountMeta, LegacyDataAccountState};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::{
    config::ProgramConfig,
    error::DataAccountError,
    rpc::{AccountFilter, DataSlice, Transport},
};

/// Metadata and payload of a data account as read from the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataAccount {
    pub meta: DataAccountMeta,
    /// `None` if the data account does not exist.
    pub payload: Option<Vec<u8>>,
}

/// Reads the metadata of `data_account`. A missing or empty metadata account
/// yields the zero record.
pub async fn read_metadata(
    transport: &dyn Transport,
    program: &ProgramConfig,
    data_account: &Pubkey,
) -> Result<DataAccountMeta, DataAccountError> {
    let address = program.metadata_address(data_account);
    let bytes = transport.fetch_account_bytes(&address).await?;
    Ok(DataAccountMeta::decode(&bytes.unwrap_or_default())?)
}

pub async fn read_payload(
    transport: &dyn Transport,
    data_account: &Pubkey,
) -> Result<Option<Vec<u8>>, DataAccountError> {
    let bytes = transport.fetch_account_bytes(data_account).await?;
    Ok(bytes.map(|bytes| decode_payload(&bytes).to_vec()))
}

/// Reads metadata and payload concurrently. The two reads are independent,
/// so they may observe different versions of the account.
pub async fn read_account(
    transport: &dyn Transport,
    program: &ProgramConfig,
    data_account: &Pubkey,
) -> Result<DataAccount, DataAccountError> {
    let (meta, payload) = tokio::try_join!(
        read_metadata(transport, program, data_account),
        read_payload(transport, data_account)
    )?;
    debug!(
        "Read data account {}: status {}, {} bytes",
        data_account,
        meta.data_status,
        payload.as_ref().map_or(0, Vec::len)
    );
    Ok(DataAccount { meta, payload })
}

/// Reads an account of the older program that keeps status and payload in a
/// single account.
pub async fn read_legacy_account(
    transport: &dyn Transport,
    address: &Pubkey,
) -> Result<Option<LegacyDataAccountState>, DataAccountError> {
    match transport.fetch_account_bytes(address).await? {
        Some(bytes) => Ok(Some(LegacyDataAccountState::decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Lists the data accounts whose metadata names `authority`, sorted by data
/// account address.
///
/// Metadata does not store the address of its data account, so every program
/// account is matched against the derived metadata addresses. That second
/// scan asks for addresses only.
pub async fn accounts_by_authority(
    transport: &dyn Transport,
    program: &ProgramConfig,
    authority: &Pubkey,
) -> Result<Vec<(Pubkey, DataAccountMeta)>, DataAccountError> {
    let filters = [
        AccountFilter::DataSize(DataAccountMeta::LEN as u64),
        AccountFilter::Memcmp {
            offset: DataAccountMeta::AUTHORITY_OFFSET,
            bytes: authority.to_bytes().to_vec(),
        },
    ];
    let metadata: HashMap<Pubkey, DataAccountMeta> = transport
        .fetch_program_accounts(&program.program_id, &filters, None)
        .await?
        .into_iter()
        .filter_map(|(address, bytes)| match DataAccountMeta::decode(&bytes) {
            Ok(meta) => Some((address, meta)),
            Err(error) => {
                warn!("Skipping undecodable metadata account {}: {}", address, error);
                None
            }
        })
        .collect();
    if metadata.is_empty() {
        return Ok(Vec::new());
    }

    let mut accounts: Vec<(Pubkey, DataAccountMeta)> = transport
        .fetch_program_accounts(&program.program_id, &[], Some(DataSlice::NONE))
        .await?
        .into_iter()
        .filter_map(|(address, _)| {
            metadata
                .get(&program.metadata_address(&address))
                .map(|meta| (address, *meta))
        })
        .collect();
    accounts.sort_by_key(|(address, _)| *address);
    debug!(
        "Found {} data accounts for authority {}",
        accounts.len(),
        authority
    );
    Ok(accounts)
}
