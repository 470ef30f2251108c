pub mod error;
pub mod instruction;
pub mod legacy;
pub mod pda;
pub mod state;

pub use error::DataAccountLayoutError;
pub use instruction::{
    CloseArgs, DataAccountInstruction, FinalizeArgs, InitializeArgs, Opcodes, UpdatePartArgs,
};
pub use legacy::{decode_account_data, LegacyAccountData, LegacyDataAccountState};
pub use pda::{find_metadata_address, find_metadata_address_with_seed, METADATA_SEED};
pub use solana_pubkey::Pubkey;
pub use state::{decode_payload, DataAccountMeta, DataStatus, DataType, SerializationStatus};
