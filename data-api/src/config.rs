use std::{net::SocketAddr, time::Duration};

use data_account_client::{parse_pubkey, Cluster, ProgramConfig, UploadConfig};
use solana_sdk::signature::Keypair;

use crate::{
    cli::{ClusterArgs, ProgramArgs, SendArgs, ServeArgs},
    errors::DataApiError,
};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub addr: SocketAddr,
    pub allow_public_bind: bool,
    pub program: ProgramConfig,
    /// RPC URL of the `Custom` cluster.
    pub custom_rpc_url: Option<String>,
}

impl ApiConfig {
    pub fn new_for_serve(args: &ServeArgs) -> Result<Self, DataApiError> {
        let addr = if args.allow_public_bind {
            SocketAddr::from(([0, 0, 0, 0], args.port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], args.port))
        };
        Ok(Self {
            addr,
            allow_public_bind: args.allow_public_bind,
            program: program_config(&args.program)?,
            custom_rpc_url: args.program.custom_rpc_url.clone(),
        })
    }

    pub fn cluster(&self, name: &str) -> Result<Cluster, DataApiError> {
        Cluster::from_name(name, self.custom_rpc_url.as_deref())
            .map_err(|_| DataApiError::InvalidCluster)
    }
}

pub fn program_config(args: &ProgramArgs) -> Result<ProgramConfig, DataApiError> {
    let program_id = parse_pubkey(&args.program_id)
        .map_err(|e| DataApiError::InvalidArgument(format!("program id: {}", e)))?;
    Ok(ProgramConfig::new(program_id))
}

pub fn cluster(args: &ClusterArgs) -> Result<Cluster, DataApiError> {
    Cluster::from_name(&args.cluster, args.program.custom_rpc_url.as_deref())
        .map_err(|_| DataApiError::InvalidCluster)
}

pub fn upload_config(args: &SendArgs) -> Result<UploadConfig, DataApiError> {
    let config = UploadConfig {
        part_size: args.part_size,
        retry_delay: Duration::from_millis(args.retry_delay_ms),
        max_waves: args.max_waves,
        debug: args.debug,
        ..UploadConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Reads a keypair file holding the JSON array of its 64 secret key bytes.
pub fn read_keypair(path: &str) -> Result<Keypair, DataApiError> {
    let contents = std::fs::read_to_string(path)?;
    let bytes: Vec<u8> = serde_json::from_str(&contents)?;
    Keypair::try_from(bytes.as_slice()).map_err(|e| DataApiError::InvalidKeypair(e.to_string()))
}

#[cfg(test)]
mod test {
    use solana_sdk::signature::Signer;

    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", name, rand::random::<u64>()))
    }

    #[test]
    fn test_read_keypair_file() {
        let keypair = Keypair::new();
        let path = temp_path("keypair");
        std::fs::write(&path, serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap())
            .unwrap();
        let read = read_keypair(path.to_str().unwrap()).unwrap();
        assert_eq!(read.pubkey(), keypair.pubkey());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_keypair_file() {
        let path = temp_path("short");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            read_keypair(path.to_str().unwrap()),
            Err(DataApiError::InvalidKeypair(_))
        ));
        std::fs::remove_file(path).unwrap();
        assert!(matches!(
            read_keypair("/nonexistent/keypair.json"),
            Err(DataApiError::Io(_))
        ));
    }

    #[test]
    fn test_serve_config() {
        let args = ServeArgs {
            port: 9000,
            allow_public_bind: false,
            program: ProgramArgs {
                program_id: data_account_client::constants::PROGRAM_ID.to_string(),
                custom_rpc_url: Some("http://127.0.0.1:9999".to_string()),
            },
        };
        let config = ApiConfig::new_for_serve(&args).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.cluster("custom").unwrap().url(), "http://127.0.0.1:9999");
        assert!(matches!(
            config.cluster("nowhere"),
            Err(DataApiError::InvalidCluster)
        ));
    }
}
