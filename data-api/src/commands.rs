use data_account_client::{
    accounts_by_authority, close_all,
    constants::{MAX_CLOSE_BATCH, MAX_FILE_SIZE},
    create_data_account,
    data_account_layout::DataType,
    display_size, parse_pubkey, plan_upload, read_account, read_legacy_account, read_metadata,
    run_upload, DataAccountError, KeypairSigner, NewDataAccount, ProgramConfig, Progress,
    SolanaRpcTransport, TransactionSigner, UploadContext,
};
use solana_sdk::signature::Keypair;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    cli::{AccountArgs, CloseAccountsArgs, EditArgs, ListArgs, ReadArgs, SendArgs, UploadArgs},
    config::{cluster, program_config, read_keypair, upload_config},
    errors::DataApiError,
};

/// Cancels the returned token on ctrl-c.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received ctrl-c, cancelling");
            token.cancel();
        }
    });
    cancel
}

fn log_progress(progress: Progress) {
    info!(
        "Progress {}% ({}/{} transactions)",
        progress.percent(),
        progress.completed,
        progress.total
    );
}

fn read_file(path: &str) -> Result<Vec<u8>, DataApiError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() > MAX_FILE_SIZE {
        return Err(DataApiError::InvalidArgument(format!(
            "{} is {}, the maximum is {}",
            path,
            display_size(bytes.len()),
            display_size(MAX_FILE_SIZE)
        )));
    }
    Ok(bytes)
}

struct Session {
    transport: SolanaRpcTransport,
    program: ProgramConfig,
    signer: KeypairSigner,
}

fn session(
    cluster_args: &crate::cli::ClusterArgs,
    send: &SendArgs,
) -> Result<Session, DataApiError> {
    Ok(Session {
        transport: SolanaRpcTransport::new(&cluster(cluster_args)?),
        program: program_config(&cluster_args.program)?,
        signer: KeypairSigner::new(read_keypair(&send.keypair)?),
    })
}

pub async fn read(args: ReadArgs) -> Result<(), DataApiError> {
    let transport = SolanaRpcTransport::new(&cluster(&args.cluster)?);
    let address = parse_pubkey(&args.data_account).map_err(|_| DataApiError::InvalidPubkey)?;

    if args.legacy {
        let state = read_legacy_account(&transport, &address)
            .await?
            .ok_or(DataApiError::NoData)?;
        println!("{:#?}", state);
        return Ok(());
    }

    let program = program_config(&args.cluster.program)?;
    let account = read_account(&transport, &program, &address).await?;
    let meta = account.meta;
    println!("Data account:  {}", address);
    println!("Metadata:      {}", program.metadata_address(&address));
    println!("Status:        {}", meta.data_status);
    println!("Serialization: {}", meta.serialization_status);
    println!("Authority:     {}", meta.authority);
    println!("Dynamic:       {}", meta.is_dynamic);
    println!("Version:       {}", meta.data_version);
    println!("Data type:     {}", meta.data_type);

    let payload = account.payload.ok_or(DataApiError::NoData)?;
    println!("Size:          {}", display_size(payload.len()));
    match args.output {
        Some(path) => {
            std::fs::write(&path, &payload)?;
            println!("Payload written to {}", path);
        }
        None => println!("{}", String::from_utf8_lossy(&payload)),
    }
    Ok(())
}

pub async fn upload(args: UploadArgs) -> Result<(), DataApiError> {
    let session = session(&args.cluster, &args.send)?;
    let config = upload_config(&args.send)?;
    let payload = read_file(&args.file)?;
    let data_type: DataType = args
        .data_type
        .parse()
        .map_err(DataApiError::InvalidArgument)?;
    let authority = match &args.authority {
        Some(authority) => parse_pubkey(authority)?,
        None => session.signer.pubkey(),
    };
    let new_account = NewDataAccount {
        keypair: Keypair::new(),
        authority,
        space: args.space.unwrap_or(payload.len() as u64),
        is_dynamic: args.dynamic,
    };
    info!(
        "Uploading {} ({}) to new data account {}",
        args.file,
        display_size(payload.len()),
        new_account.pubkey()
    );

    let ctx = UploadContext::new(&session.transport, &session.signer, &session.program, &config)
        .with_cancellation(cancel_on_ctrl_c());
    let report = create_data_account(&new_account, &payload, data_type, &ctx, log_progress).await?;
    info!(
        "Upload finished in {} waves with {} retried failures",
        report.upload.waves,
        report.upload.errors.len()
    );
    println!("{}", report.data_account);
    Ok(())
}

pub async fn edit(args: EditArgs) -> Result<(), DataApiError> {
    let session = session(&args.cluster, &args.send)?;
    let config = upload_config(&args.send)?;
    let data_account = parse_pubkey(&args.data_account).map_err(|_| DataApiError::InvalidPubkey)?;
    let updated = read_file(&args.file)?;

    let account = read_account(&session.transport, &session.program, &data_account).await?;
    let original = account.payload.ok_or(DataApiError::NoData)?;
    let plan = plan_upload(
        data_account,
        &original,
        &updated,
        &account.meta,
        config.part_size,
    )?;
    if plan.is_empty() {
        println!("Nothing to upload");
        return Ok(());
    }
    info!(
        "Uploading {} changed bytes in {} parts to {}",
        plan.total_bytes(),
        plan.parts.len(),
        data_account
    );

    let ctx = UploadContext::new(&session.transport, &session.signer, &session.program, &config)
        .with_cancellation(cancel_on_ctrl_c());
    let report = run_upload(&plan, &ctx, log_progress).await?;
    println!(
        "Updated {} in {} waves ({} signatures)",
        data_account,
        report.waves,
        report.signatures.len()
    );
    Ok(())
}

pub async fn finalize(args: AccountArgs) -> Result<(), DataApiError> {
    let session = session(&args.cluster, &args.send)?;
    let config = upload_config(&args.send)?;
    let data_account = parse_pubkey(&args.data_account).map_err(|_| DataApiError::InvalidPubkey)?;
    let meta = read_metadata(&session.transport, &session.program, &data_account).await?;

    let ctx = UploadContext::new(&session.transport, &session.signer, &session.program, &config)
        .with_cancellation(cancel_on_ctrl_c());
    match data_account_client::finalize(&data_account, &meta, &ctx).await? {
        Some(signature) => println!("Finalized {}: {}", data_account, signature),
        None => println!("Finalized {}", data_account),
    }
    Ok(())
}

pub async fn close(args: CloseAccountsArgs) -> Result<(), DataApiError> {
    let session = session(&args.cluster, &args.send)?;
    let config = upload_config(&args.send)?;
    let mut accounts = Vec::with_capacity(args.data_accounts.len());
    for data_account in &args.data_accounts {
        let data_account = parse_pubkey(data_account).map_err(|_| DataApiError::InvalidPubkey)?;
        let meta = read_metadata(&session.transport, &session.program, &data_account).await?;
        accounts.push((data_account, meta));
    }

    let ctx = UploadContext::new(&session.transport, &session.signer, &session.program, &config)
        .with_cancellation(cancel_on_ctrl_c());
    if let [(data_account, meta)] = accounts.as_slice() {
        match data_account_client::close(data_account, meta, &ctx).await? {
            Some(signature) => println!("Closed {}: {}", data_account, signature),
            None => println!("Closed {}", data_account),
        }
        return Ok(());
    }
    // No batch is sent unless the signer owns every account.
    for (data_account, meta) in &accounts {
        if meta.authority != session.signer.pubkey() {
            return Err(DataAccountError::NotAuthorized {
                expected: meta.authority,
                signer: session.signer.pubkey(),
            }
            .into());
        }
        info!("Closing {}", data_account);
    }
    for batch in accounts.chunks(MAX_CLOSE_BATCH) {
        match close_all(batch, &ctx).await? {
            Some(signature) => println!("Closed {} data accounts: {}", batch.len(), signature),
            None => println!("Closed {} data accounts", batch.len()),
        }
    }
    Ok(())
}

pub async fn list(args: ListArgs) -> Result<(), DataApiError> {
    let transport = SolanaRpcTransport::new(&cluster(&args.cluster)?);
    let program = program_config(&args.cluster.program)?;
    let authority = parse_pubkey(&args.authority)?;

    let accounts = accounts_by_authority(&transport, &program, &authority).await?;
    if accounts.is_empty() {
        println!("No data accounts for {}", authority);
    }
    for (data_account, meta) in accounts {
        println!(
            "{}  {}  {}  v{}",
            data_account, meta.data_status, meta.data_type, meta.data_version
        );
    }
    Ok(())
}
