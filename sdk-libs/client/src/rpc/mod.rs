pub mod errors;
pub mod solana_rpc;
mod transport;

pub use errors::TransportError;
pub use solana_rpc::{RetryConfig, SolanaRpcTransport};
pub use transport::{AccountFilter, BlockInfo, DataSlice, Transport};
