use clap::{Args, Parser, Subcommand};
use data_account_client::constants::{PROGRAM_ID, UPDATE_PART_SIZE};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of the rolling log files.
    #[arg(long, env = "DATA_API_LOG_DIR", default_value = "logs", global = true)]
    pub log_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Print the metadata and payload of a data account.
    Read(ReadArgs),
    /// Create a data account and upload a file into it.
    Upload(UploadArgs),
    /// Replace the payload of a data account with a file.
    Edit(EditArgs),
    /// Finalize a data account. Its payload can no longer change afterwards.
    Finalize(AccountArgs),
    /// Close data accounts and reclaim their rent.
    Close(CloseAccountsArgs),
    /// List the data accounts of an authority.
    List(ListArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ProgramArgs {
    #[arg(long, env = "DATA_API_PROGRAM_ID", default_value = PROGRAM_ID)]
    pub program_id: String,

    /// Custom RPC URL, used when the cluster is `Custom`.
    #[arg(long, env = "DATA_API_CUSTOM_RPC_URL")]
    pub custom_rpc_url: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ClusterArgs {
    #[arg(long, env = "DATA_API_CLUSTER", default_value = "Devnet")]
    pub cluster: String,

    #[command(flatten)]
    pub program: ProgramArgs,
}

#[derive(Args, Clone, Debug)]
pub struct SendArgs {
    /// JSON keypair file of the payer and authority.
    #[arg(long, env = "DATA_API_KEYPAIR")]
    pub keypair: String,

    #[arg(long, env = "DATA_API_PART_SIZE", default_value_t = UPDATE_PART_SIZE)]
    pub part_size: usize,

    #[arg(long, env = "DATA_API_RETRY_DELAY_MS", default_value = "500")]
    pub retry_delay_ms: u64,

    /// Give up after this many upload waves.
    #[arg(long, env = "DATA_API_MAX_WAVES")]
    pub max_waves: Option<u32>,

    #[arg(long, env = "DATA_API_DEBUG", default_value = "false")]
    pub debug: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "DATA_API_PORT", default_value = "8080")]
    pub port: u16,

    /// Bind to 0.0.0.0 instead of 127.0.0.1.
    #[arg(long, env = "DATA_API_ALLOW_PUBLIC_BIND", default_value = "false")]
    pub allow_public_bind: bool,

    #[command(flatten)]
    pub program: ProgramArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct ReadArgs {
    pub data_account: String,

    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Decode the account with the combined layout of the first program.
    #[arg(long, default_value = "false")]
    pub legacy: bool,

    /// Write the payload to this file instead of printing it.
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Parser, Clone, Debug)]
pub struct UploadArgs {
    pub file: String,

    #[arg(long, default_value = "custom")]
    pub data_type: String,

    /// Allow the account to grow on later edits.
    #[arg(long, default_value = "false")]
    pub dynamic: bool,

    /// Account space, defaults to the file size.
    #[arg(long)]
    pub space: Option<u64>,

    /// Authority of the new account, defaults to the keypair.
    #[arg(long)]
    pub authority: Option<String>,

    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub send: SendArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct EditArgs {
    pub data_account: String,

    pub file: String,

    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub send: SendArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct AccountArgs {
    pub data_account: String,

    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub send: SendArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct CloseAccountsArgs {
    /// Closed in transactions of up to ten accounts each.
    #[arg(required = true)]
    pub data_accounts: Vec<String>,

    #[command(flatten)]
    pub cluster: ClusterArgs,

    #[command(flatten)]
    pub send: SendArgs,
}

#[derive(Parser, Clone, Debug)]
pub struct ListArgs {
    pub authority: String,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}
