use std::sync::Arc;

use clap::Parser;
use data_api::{
    api_server::{spawn_api_server, RpcTransportProvider},
    cli::{Cli, Commands},
    commands,
    config::ApiConfig,
    telemetry::setup_telemetry,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_telemetry(&cli.log_dir);

    match cli.command {
        Commands::Serve(args) => {
            let config = ApiConfig::new_for_serve(&args)?;
            let handle = spawn_api_server(config, Arc::new(RpcTransportProvider::default()));
            tokio::signal::ctrl_c().await?;
            info!("Received ctrl-c, shutting down");
            tokio::task::spawn_blocking(move || handle.shutdown()).await?;
        }
        Commands::Read(args) => commands::read(args).await?,
        Commands::Upload(args) => commands::upload(args).await?,
        Commands::Edit(args) => commands::edit(args).await?,
        Commands::Finalize(args) => commands::finalize(args).await?,
        Commands::Close(args) => commands::close(args).await?,
        Commands::List(args) => commands::list(args).await?,
    }
    Ok(())
}
