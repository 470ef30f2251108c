use std::{str::FromStr, time::Duration};

use data_account_layout::{find_metadata_address_with_seed, Opcodes, METADATA_SEED};
use solana_sdk::pubkey::Pubkey;

use crate::{
    constants::{PROGRAM_ID, UPDATE_PART_SIZE},
    error::DataAccountError,
};

/// Identifies the data account program a client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    pub program_id: Pubkey,
    pub metadata_seed: Vec<u8>,
    pub opcodes: Opcodes,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: Pubkey::from_str(PROGRAM_ID).unwrap_or_default(),
            metadata_seed: METADATA_SEED.to_vec(),
            opcodes: Opcodes::default(),
        }
    }
}

impl ProgramConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            ..Self::default()
        }
    }

    pub fn metadata_address(&self, data_account: &Pubkey) -> Pubkey {
        find_metadata_address_with_seed(data_account, &self.metadata_seed, &self.program_id).0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Payload bytes per update transaction.
    pub part_size: usize,
    /// Pause between two waves.
    pub retry_delay: Duration,
    /// Gives up after this many waves. `None` retries until cancelled.
    pub max_waves: Option<u32>,
    pub realloc_allowed: bool,
    pub confirm: bool,
    pub debug: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: UPDATE_PART_SIZE,
            retry_delay: Duration::from_millis(500),
            max_waves: None,
            realloc_allowed: true,
            confirm: true,
            debug: false,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), DataAccountError> {
        if self.part_size == 0 {
            return Err(DataAccountError::InvalidInput(
                "part size must be greater than zero".to_string(),
            ));
        }
        if self.max_waves == Some(0) {
            return Err(DataAccountError::InvalidInput(
                "max waves must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
