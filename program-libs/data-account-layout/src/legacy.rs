//! Combined single-account layout used by the first version of the program.
//!
//! There the status fields and the payload live in one account:
//!
//! ```text
//! data_status | serialization_status | authority(32) | is_dynamic | data_version
//! | data_type | len(u32 LE) | data...
//! ```
//!
//! The first program numbered its data types differently
//! (`CUSTOM, JSON, BORSH, PNG`), so `data_type` stays a raw byte here.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::{
    error::DataAccountLayoutError,
    state::{DataStatus, SerializationStatus},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LegacyHeader {
    data_status: DataStatus,
    serialization_status: SerializationStatus,
    authority: Pubkey,
    is_dynamic: bool,
    data_version: u8,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyAccountData {
    pub data_type: u8,
    /// Length written by the program. It is reported as is and not checked
    /// against `data`.
    pub declared_len: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyDataAccountState {
    pub data_status: DataStatus,
    pub serialization_status: SerializationStatus,
    pub authority: Pubkey,
    pub is_dynamic: bool,
    pub data_version: u8,
    pub account_data: Option<LegacyAccountData>,
}

impl LegacyDataAccountState {
    pub const HEADER_LEN: usize = 36;

    pub fn decode(bytes: &[u8]) -> Result<Self, DataAccountLayoutError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        if bytes.len() < Self::HEADER_LEN {
            return Err(DataAccountLayoutError::AccountTooShort {
                expected: Self::HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let (header, rest) = bytes.split_at(Self::HEADER_LEN);
        let header = LegacyHeader::try_from_slice(header)?;
        Ok(Self {
            data_status: header.data_status,
            serialization_status: header.serialization_status,
            authority: header.authority,
            is_dynamic: header.is_dynamic,
            data_version: header.data_version,
            account_data: decode_account_data(rest)?,
        })
    }
}

/// Decodes the data block of the combined layout: `data_type`, the declared
/// length and the remaining bytes as payload.
pub fn decode_account_data(bytes: &[u8]) -> Result<Option<LegacyAccountData>, DataAccountLayoutError> {
    const DATA_HEADER_LEN: usize = 5;

    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() < DATA_HEADER_LEN {
        return Err(DataAccountLayoutError::AccountTooShort {
            expected: DATA_HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let mut declared_len = [0u8; 4];
    declared_len.copy_from_slice(&bytes[1..DATA_HEADER_LEN]);
    Ok(Some(LegacyAccountData {
        data_type: bytes[0],
        declared_len: u32::from_le_bytes(declared_len),
        data: bytes[DATA_HEADER_LEN..].to_vec(),
    }))
}
