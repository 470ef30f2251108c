use data_account_layout::DataAccountLayoutError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::{rpc::TransportError, signer::SignerError};

#[derive(Error, Debug)]
pub enum DataAccountError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Signer {signer} is not the authority {expected} of the data account")]
    NotAuthorized { expected: Pubkey, signer: Pubkey },

    #[error("Data account is finalized so cannot be updated")]
    AlreadyFinalized,

    #[error("Data account is static so cannot be realloced from {original} to {updated} bytes")]
    StaticAccountOverflow { original: usize, updated: usize },

    #[error("Decode error: {0}")]
    Decode(#[from] DataAccountLayoutError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("User rejected the request")]
    UserRejected,

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Gave up after {waves} waves with {remaining} transactions unconfirmed")]
    RetriesExhausted { waves: u32, remaining: usize },
}

impl From<SignerError> for DataAccountError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::UserRejected => DataAccountError::UserRejected,
            SignerError::Signing(error) => DataAccountError::Signer(error),
        }
    }
}
