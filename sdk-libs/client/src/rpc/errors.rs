use std::io;

use solana_client::client_error::ClientError;
use solana_sdk::{signature::Signature, transaction::TransactionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Blockhash expired before transaction {0} was confirmed")]
    Expired(Signature),

    #[error("Transaction {signature} failed: {error}")]
    Failed {
        signature: Signature,
        error: Box<TransactionError>,
    },

    #[error("ClientError: {0}")]
    ClientError(#[from] Box<ClientError>),

    #[error("IoError: {0}")]
    IoError(#[from] Box<io::Error>),

    #[error("Error: `{0}`")]
    CustomError(String),
}

impl From<ClientError> for TransportError {
    fn from(err: ClientError) -> Self {
        TransportError::ClientError(Box::new(err))
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::IoError(Box::new(err))
    }
}
