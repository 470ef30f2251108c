use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use data_account_client::{
    accounts_by_authority,
    data_account_layout::{DataAccountMeta, LegacyDataAccountState},
    parse_pubkey, read_account, read_legacy_account, read_metadata, read_payload, Cluster,
    SolanaRpcTransport, Transport,
};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use warp::{
    http::StatusCode,
    reply::{Reply, Response},
    Filter, Rejection,
};

use crate::{config::ApiConfig, content_type::sniff_content_type, errors::DataApiError};

const DEFAULT_CLUSTER: &str = "Devnet";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterQuery {
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaResponse {
    pub data_status: String,
    pub serialization_status: String,
    pub authority: String,
    pub is_dynamic: bool,
    pub data_version: u8,
    pub data_type: String,
    pub bump_seed: u8,
}

impl From<&DataAccountMeta> for MetaResponse {
    fn from(meta: &DataAccountMeta) -> Self {
        Self {
            data_status: meta.data_status.to_string(),
            serialization_status: meta.serialization_status.to_string(),
            authority: meta.authority.to_string(),
            is_dynamic: meta.is_dynamic,
            data_version: meta.data_version,
            data_type: meta.data_type.to_string(),
            bump_seed: meta.bump_seed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub pubkey: String,
    pub meta: MetaResponse,
    /// Base64 encoded payload, `null` if the data account does not exist.
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyResponse {
    pub data_status: String,
    pub serialization_status: String,
    pub authority: String,
    pub is_dynamic: bool,
    pub data_version: u8,
    pub data_type: Option<u8>,
    pub declared_len: Option<u32>,
    pub data: Option<String>,
}

impl From<&LegacyDataAccountState> for LegacyResponse {
    fn from(state: &LegacyDataAccountState) -> Self {
        let account_data = state.account_data.as_ref();
        Self {
            data_status: state.data_status.to_string(),
            serialization_status: state.serialization_status.to_string(),
            authority: state.authority.to_string(),
            is_dynamic: state.is_dynamic,
            data_version: state.data_version,
            data_type: account_data.map(|data| data.data_type),
            declared_len: account_data.map(|data| data.declared_len),
            data: account_data.map(|data| STANDARD.encode(&data.data)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityAccount {
    pub pubkey: String,
    pub meta: MetaResponse,
}

/// Hands out a transport per cluster.
pub trait TransportProvider: Send + Sync {
    fn transport(&self, cluster: &Cluster) -> Arc<dyn Transport>;
}

/// Keeps one RPC client per cluster URL.
#[derive(Default)]
pub struct RpcTransportProvider {
    transports: Mutex<HashMap<String, Arc<SolanaRpcTransport>>>,
}

impl TransportProvider for RpcTransportProvider {
    fn transport(&self, cluster: &Cluster) -> Arc<dyn Transport> {
        let url = cluster.url();
        let mut transports = match self.transports.lock() {
            Ok(transports) => transports,
            Err(poisoned) => poisoned.into_inner(),
        };
        transports
            .entry(url)
            .or_insert_with(|| Arc::new(SolanaRpcTransport::new(cluster)))
            .clone()
    }
}

pub struct ApiState {
    pub config: ApiConfig,
    pub provider: Arc<dyn TransportProvider>,
}

impl ApiState {
    fn connect(
        &self,
        pubkey: &str,
        query: &ClusterQuery,
    ) -> Result<(Arc<dyn Transport>, Pubkey), DataApiError> {
        let cluster = self
            .config
            .cluster(query.cluster.as_deref().unwrap_or(DEFAULT_CLUSTER))?;
        let pubkey = parse_pubkey(pubkey).map_err(|_| DataApiError::InvalidPubkey)?;
        Ok((self.provider.transport(&cluster), pubkey))
    }
}

fn respond(result: Result<Response, DataApiError>) -> Response {
    match result {
        Ok(response) => response,
        Err(e) => {
            warn!("Request failed: {}", e);
            error_reply(e.status_code(), e.to_string())
        }
    }
}

fn error_reply(status: StatusCode, error: String) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorResponse { error }), status).into_response()
}

async fn data_reply(
    pubkey: String,
    query: ClusterQuery,
    state: Arc<ApiState>,
) -> Result<Response, DataApiError> {
    let (transport, data_account) = state.connect(&pubkey, &query)?;
    let payload = read_payload(transport.as_ref(), &data_account)
        .await?
        .ok_or(DataApiError::NoData)?;
    let content_type = sniff_content_type(&payload);
    Ok(warp::reply::with_header(payload, "content-type", content_type).into_response())
}

async fn meta_reply(
    pubkey: String,
    query: ClusterQuery,
    state: Arc<ApiState>,
) -> Result<Response, DataApiError> {
    let (transport, data_account) = state.connect(&pubkey, &query)?;
    let meta = read_metadata(transport.as_ref(), &state.config.program, &data_account).await?;
    Ok(warp::reply::json(&MetaResponse::from(&meta)).into_response())
}

async fn account_reply(
    pubkey: String,
    query: ClusterQuery,
    state: Arc<ApiState>,
) -> Result<Response, DataApiError> {
    let (transport, data_account) = state.connect(&pubkey, &query)?;
    let account = read_account(transport.as_ref(), &state.config.program, &data_account).await?;
    Ok(warp::reply::json(&AccountResponse {
        pubkey: data_account.to_string(),
        meta: MetaResponse::from(&account.meta),
        data: account.payload.map(|payload| STANDARD.encode(payload)),
    })
    .into_response())
}

async fn legacy_reply(
    pubkey: String,
    query: ClusterQuery,
    state: Arc<ApiState>,
) -> Result<Response, DataApiError> {
    let (transport, address) = state.connect(&pubkey, &query)?;
    let state = read_legacy_account(transport.as_ref(), &address)
        .await?
        .ok_or(DataApiError::NoData)?;
    Ok(warp::reply::json(&LegacyResponse::from(&state)).into_response())
}

async fn authority_reply(
    pubkey: String,
    query: ClusterQuery,
    state: Arc<ApiState>,
) -> Result<Response, DataApiError> {
    let (transport, authority) = state.connect(&pubkey, &query)?;
    let accounts =
        accounts_by_authority(transport.as_ref(), &state.config.program, &authority).await?;
    let accounts: Vec<AuthorityAccount> = accounts
        .iter()
        .map(|(pubkey, meta)| AuthorityAccount {
            pubkey: pubkey.to_string(),
            meta: MetaResponse::from(meta),
        })
        .collect();
    Ok(warp::reply::json(&accounts).into_response())
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, error) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if rejection
        .find::<warp::reject::MethodNotAllowed>()
        .is_some()
    {
        (StatusCode::METHOD_NOT_ALLOWED, "Unsupported method".to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else {
        error!("Unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };
    Ok(error_reply(status, error))
}

/// All routes of the API, with error recovery and CORS for any origin.
pub fn routes(
    state: Arc<ApiState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_state = warp::any().map(move || state.clone());
    let query = || warp::query::<ClusterQuery>();

    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&HealthResponse {
                status: "ok".to_string(),
            })
        });

    let data_route = warp::path!("api" / "data" / String)
        .and(warp::get())
        .and(query())
        .and(with_state.clone())
        .then(
            |pubkey: String, query: ClusterQuery, state: Arc<ApiState>| async move {
                respond(data_reply(pubkey, query, state).await)
            },
        );

    let meta_route = warp::path!("api" / "meta" / String)
        .and(warp::get())
        .and(query())
        .and(with_state.clone())
        .then(
            |pubkey: String, query: ClusterQuery, state: Arc<ApiState>| async move {
                respond(meta_reply(pubkey, query, state).await)
            },
        );

    let account_route = warp::path!("api" / "account" / String)
        .and(warp::get())
        .and(query())
        .and(with_state.clone())
        .then(
            |pubkey: String, query: ClusterQuery, state: Arc<ApiState>| async move {
                respond(account_reply(pubkey, query, state).await)
            },
        );

    let legacy_route = warp::path!("api" / "legacy" / String)
        .and(warp::get())
        .and(query())
        .and(with_state.clone())
        .then(
            |pubkey: String, query: ClusterQuery, state: Arc<ApiState>| async move {
                respond(legacy_reply(pubkey, query, state).await)
            },
        );

    let authority_route = warp::path!("api" / "authority" / String)
        .and(warp::get())
        .and(query())
        .and(with_state)
        .then(
            |pubkey: String, query: ClusterQuery, state: Arc<ApiState>| async move {
                respond(authority_reply(pubkey, query, state).await)
            },
        );

    let cors = warp::cors().allow_any_origin().allow_methods(vec!["GET"]);

    health_route
        .or(data_route)
        .or(meta_route)
        .or(account_route)
        .or(legacy_route)
        .or(authority_route)
        .recover(handle_rejection)
        .with(cors)
}

/// Handle returned by spawn_api_server for graceful shutdown
pub struct ApiServerHandle {
    pub thread_handle: JoinHandle<()>,
    pub shutdown_tx: oneshot::Sender<()>,
}

impl ApiServerHandle {
    /// Trigger graceful shutdown and wait for the server to stop
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.thread_handle.join() {
            error!("API server thread panicked: {:?}", e);
        }
    }
}

/// Runs the API on its own thread and runtime until the handle is shut down.
pub fn spawn_api_server(
    config: ApiConfig,
    provider: Arc<dyn TransportProvider>,
) -> ApiServerHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread_handle = std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create tokio runtime for API server: {}", e);
                return;
            }
        };
        rt.block_on(async move {
            let addr = config.addr;
            if config.allow_public_bind {
                warn!(
                    "API server binding to {} - data account endpoints will be publicly accessible",
                    addr
                );
            }
            let routes = routes(Arc::new(ApiState { config, provider }));
            let server = warp::serve(routes).try_bind_with_graceful_shutdown(addr, async move {
                let _ = shutdown_rx.await;
                info!("API server received shutdown signal");
            });
            match server {
                Ok((addr, server)) => {
                    info!("Starting HTTP API server on {}", addr);
                    server.await;
                    info!("API server shut down gracefully");
                }
                Err(e) => error!("Failed to bind API server to {}: {}", addr, e),
            }
        });
    });

    ApiServerHandle {
        thread_handle,
        shutdown_tx,
    }
}
