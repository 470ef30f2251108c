pub mod chunk;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod diff;
pub mod error;
pub mod instructions;
pub mod lifecycle;
pub mod reader;
pub mod rpc;
pub mod signer;
pub mod upload;
pub mod utils;

pub use chunk::{chunk, UploadPart};
pub use cluster::Cluster;
pub use config::{ProgramConfig, UploadConfig};
pub use diff::{diff, Patch};
pub use error::DataAccountError;
pub use lifecycle::{close, close_all, finalize};
pub use reader::{
    accounts_by_authority, read_account, read_legacy_account, read_metadata, read_payload,
    DataAccount,
};
pub use rpc::{
    AccountFilter, BlockInfo, DataSlice, RetryConfig, SolanaRpcTransport, Transport, TransportError,
};
pub use signer::{KeypairSigner, SignerError, TransactionSigner};
pub use upload::{
    create_data_account, plan_new_upload, plan_upload, run_upload, CreateReport, NewDataAccount,
    Progress, UploadContext, UploadFailure, UploadPlan, UploadReport,
};
pub use utils::{display_size, parse_pubkey};

/// Reexport of the account and instruction layouts.
pub use data_account_layout;
