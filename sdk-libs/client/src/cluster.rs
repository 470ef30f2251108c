use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::DataAccountError;

pub const LOCALHOST_URL: &str = "http://localhost:8899";

/// Cluster a request is served from. Names match case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    MainnetBeta,
    Custom(String),
}

impl Cluster {
    pub fn name(&self) -> &str {
        match self {
            Cluster::Devnet => "Devnet",
            Cluster::Testnet => "Testnet",
            Cluster::MainnetBeta => "Mainnet Beta",
            Cluster::Custom(_) => "Custom",
        }
    }

    pub fn url(&self) -> String {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com".to_string(),
            Cluster::Testnet => "https://api.testnet.solana.com".to_string(),
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com".to_string(),
            Cluster::Custom(url) => url.clone(),
        }
    }

    /// Resolves a cluster name. `Custom` connects to `custom_url`, or to a
    /// local validator when none is configured.
    pub fn from_name(name: &str, custom_url: Option<&str>) -> Result<Self, DataAccountError> {
        let name = name.trim();
        let cluster = if name.eq_ignore_ascii_case("devnet") {
            Cluster::Devnet
        } else if name.eq_ignore_ascii_case("testnet") {
            Cluster::Testnet
        } else if name.eq_ignore_ascii_case("mainnet beta")
            || name.eq_ignore_ascii_case("mainnet-beta")
        {
            Cluster::MainnetBeta
        } else if name.eq_ignore_ascii_case("custom") {
            Cluster::Custom(custom_url.unwrap_or(LOCALHOST_URL).to_string())
        } else {
            return Err(DataAccountError::InvalidInput("Invalid Cluster".to_string()));
        };
        Ok(cluster)
    }
}

impl Display for Cluster {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}

impl FromStr for Cluster {
    type Err = DataAccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cluster::from_name(s, None)
    }
}
