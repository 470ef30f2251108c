use data_account_client::DataAccountError;
use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum DataApiError {
    #[error("Invalid Cluster")]
    InvalidCluster,

    #[error("Invalid Data Account PublicKey")]
    InvalidPubkey,

    #[error("No data corresponding to the Data Account")]
    NoData,

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Client(#[from] DataAccountError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DataApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DataApiError::Client(DataAccountError::Transport(_)) => StatusCode::BAD_GATEWAY,
            DataApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
