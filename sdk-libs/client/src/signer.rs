use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("User rejected the request")]
    UserRejected,
    #[error("{0}")]
    Signing(String),
}

/// Signs transactions on behalf of the payer/authority.
///
/// All transactions of one upload wave are passed in a single call so that
/// wallets prompt once per wave.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_all(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, SignerError>;
}

/// Signs with a local keypair.
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeypairSigner {{ pubkey: {} }}", self.keypair.pubkey())
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_all(
        &self,
        mut transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, SignerError> {
        for transaction in transactions.iter_mut() {
            let blockhash = transaction.message.recent_blockhash;
            transaction
                .try_partial_sign(&[&self.keypair], blockhash)
                .map_err(|e| SignerError::Signing(e.to_string()))?;
        }
        Ok(transactions)
    }
}
