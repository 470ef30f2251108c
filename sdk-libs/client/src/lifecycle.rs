use data_account_layout::DataAccountMeta;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use tracing::info;

use crate::{
    constants::MAX_CLOSE_BATCH,
    error::DataAccountError,
    instructions,
    upload::{send_until_confirmed, UploadContext},
};

fn check_authority(meta: &DataAccountMeta, ctx: &UploadContext<'_>) -> Result<(), DataAccountError> {
    let signer = ctx.signer.pubkey();
    if meta.authority != signer {
        return Err(DataAccountError::NotAuthorized {
            expected: meta.authority,
            signer,
        });
    }
    Ok(())
}

/// Finalizes `data_account`. After this its payload can no longer change.
///
/// Returns `None` if an earlier attempt landed without being confirmed.
pub async fn finalize(
    data_account: &Pubkey,
    meta: &DataAccountMeta,
    ctx: &UploadContext<'_>,
) -> Result<Option<Signature>, DataAccountError> {
    check_authority(meta, ctx)?;
    if meta.is_finalized() {
        return Err(DataAccountError::AlreadyFinalized);
    }
    let authority = ctx.signer.pubkey();
    let metadata = ctx.program.metadata_address(data_account);
    let mut errors = Vec::new();
    let signature = send_until_confirmed(
        ctx,
        "Finalize data account",
        &mut errors,
        |block| {
            let instruction =
                instructions::finalize(ctx.program, &authority, data_account, ctx.config.debug)?;
            let mut transaction = Transaction::new_with_payer(&[instruction], Some(&authority));
            transaction.message.recent_blockhash = block.blockhash;
            Ok(transaction)
        },
        move || async move {
            let bytes = ctx.transport.fetch_account_bytes(&metadata).await?;
            Ok(DataAccountMeta::decode(&bytes.unwrap_or_default())
                .map(|meta| meta.is_finalized())
                .unwrap_or(false))
        },
    )
    .await?;
    info!(
        "Finalized {} after {} failed attempts",
        data_account,
        errors.len()
    );
    Ok(signature)
}

/// Closes `data_account` and its metadata account, reclaiming their rent.
///
/// Returns `None` if an earlier attempt landed without being confirmed.
pub async fn close(
    data_account: &Pubkey,
    meta: &DataAccountMeta,
    ctx: &UploadContext<'_>,
) -> Result<Option<Signature>, DataAccountError> {
    check_authority(meta, ctx)?;
    let authority = ctx.signer.pubkey();
    let data_account = *data_account;
    let mut errors = Vec::new();
    let signature = send_until_confirmed(
        ctx,
        "Close data account",
        &mut errors,
        |block| {
            let instruction =
                instructions::close(ctx.program, &authority, &data_account, ctx.config.debug)?;
            let mut transaction = Transaction::new_with_payer(&[instruction], Some(&authority));
            transaction.message.recent_blockhash = block.blockhash;
            Ok(transaction)
        },
        move || async move {
            Ok(ctx
                .transport
                .fetch_account_bytes(&data_account)
                .await?
                .is_none())
        },
    )
    .await?;
    info!(
        "Closed {} after {} failed attempts",
        data_account,
        errors.len()
    );
    Ok(signature)
}

/// Closes several data accounts in one transaction.
///
/// Every account must be owned by the signer, nothing is sent otherwise.
/// Returns `None` if an earlier attempt landed without being confirmed.
pub async fn close_all(
    accounts: &[(Pubkey, DataAccountMeta)],
    ctx: &UploadContext<'_>,
) -> Result<Option<Signature>, DataAccountError> {
    if accounts.is_empty() || accounts.len() > MAX_CLOSE_BATCH {
        return Err(DataAccountError::InvalidInput(format!(
            "can close 1 to {} data accounts at once, got {}",
            MAX_CLOSE_BATCH,
            accounts.len()
        )));
    }
    for (_, meta) in accounts {
        check_authority(meta, ctx)?;
    }
    let authority = ctx.signer.pubkey();
    let data_accounts: Vec<Pubkey> = accounts.iter().map(|(address, _)| *address).collect();
    let data_accounts = &data_accounts;
    let mut errors = Vec::new();
    let signature = send_until_confirmed(
        ctx,
        "Close data accounts",
        &mut errors,
        |block| {
            let instructions = data_accounts
                .iter()
                .map(|data_account| {
                    instructions::close(ctx.program, &authority, data_account, ctx.config.debug)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut transaction = Transaction::new_with_payer(&instructions, Some(&authority));
            transaction.message.recent_blockhash = block.blockhash;
            Ok(transaction)
        },
        move || async move {
            for data_account in data_accounts {
                if ctx.transport.fetch_account_bytes(data_account).await?.is_some() {
                    return Ok(false);
                }
            }
            Ok(true)
        },
    )
    .await?;
    info!(
        "Closed {} data accounts after {} failed attempts",
        data_accounts.len(),
        errors.len()
    );
    Ok(signature)
}
