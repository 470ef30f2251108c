use std::{collections::BTreeSet, future::Future};

use data_account_layout::{DataAccountMeta, DataType, InitializeArgs};
use futures::future::join_all;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    chunk::{chunk, UploadPart},
    config::{ProgramConfig, UploadConfig},
    constants::MAX_FILE_SIZE,
    diff::{diff, Patch},
    error::DataAccountError,
    instructions,
    rpc::{BlockInfo, Transport, TransportError},
    signer::TransactionSigner,
};

/// Parts that turn the remote payload into an edited buffer, plus the guards
/// checked before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub data_account: Pubkey,
    pub data_type: DataType,
    /// Recorded authority of the account. `None` for accounts created by the
    /// uploading signer.
    pub authority: Option<Pubkey>,
    pub finalized: bool,
    pub parts: Vec<UploadPart>,
}

impl UploadPlan {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(|part| part.bytes.len()).sum()
    }
}

/// Plans the upload of an edit of an existing account.
pub fn plan_upload(
    data_account: Pubkey,
    original: &[u8],
    updated: &[u8],
    meta: &DataAccountMeta,
    part_size: usize,
) -> Result<UploadPlan, DataAccountError> {
    if meta.is_finalized() {
        return Err(DataAccountError::AlreadyFinalized);
    }
    check_file_size(updated.len())?;
    let patch = diff(original, updated, meta.is_dynamic)?;
    Ok(UploadPlan {
        data_account,
        data_type: meta.data_type,
        authority: Some(meta.authority),
        finalized: false,
        parts: chunk(&patch, part_size)?,
    })
}

/// Plans the upload of the whole payload of a freshly created account.
pub fn plan_new_upload(
    data_account: Pubkey,
    payload: &[u8],
    data_type: DataType,
    part_size: usize,
) -> Result<UploadPlan, DataAccountError> {
    check_file_size(payload.len())?;
    let patch = Patch {
        offset: 0,
        bytes: payload.to_vec(),
    };
    Ok(UploadPlan {
        data_account,
        data_type,
        authority: None,
        finalized: false,
        parts: chunk(&patch, part_size)?,
    })
}

fn check_file_size(size: usize) -> Result<(), DataAccountError> {
    if size > MAX_FILE_SIZE {
        return Err(DataAccountError::InvalidInput(format!(
            "{} bytes exceed the maximum of {} bytes",
            size, MAX_FILE_SIZE
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.completed * 100 / self.total
    }
}

struct ProgressTracker<F> {
    progress: Progress,
    on_progress: F,
}

impl<F: FnMut(Progress)> ProgressTracker<F> {
    fn new(total: usize, on_progress: F) -> Self {
        Self {
            progress: Progress {
                completed: 0,
                total,
            },
            on_progress,
        }
    }

    fn advance(&mut self) {
        self.progress.completed = (self.progress.completed + 1).min(self.progress.total);
        (self.on_progress)(self.progress);
    }
}

/// Collaborators and settings of one upload, finalize or close.
pub struct UploadContext<'a> {
    pub transport: &'a dyn Transport,
    pub signer: &'a dyn TransactionSigner,
    pub program: &'a ProgramConfig,
    pub config: &'a UploadConfig,
    pub cancel: CancellationToken,
}

impl<'a> UploadContext<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        signer: &'a dyn TransactionSigner,
        program: &'a ProgramConfig,
        config: &'a UploadConfig,
    ) -> Self {
        Self {
            transport,
            signer,
            program,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn pause(&self) -> Result<(), DataAccountError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DataAccountError::Cancelled),
            _ = sleep(self.config.retry_delay) => Ok(()),
        }
    }

    /// Checks cancellation and the wave cap before wave number `waves + 1`.
    fn check_next_wave(&self, waves: u32, remaining: usize) -> Result<(), DataAccountError> {
        if self.cancel.is_cancelled() {
            return Err(DataAccountError::Cancelled);
        }
        if self.config.max_waves.is_some_and(|max| waves >= max) {
            return Err(DataAccountError::RetriesExhausted { waves, remaining });
        }
        Ok(())
    }
}

/// Transport failure that was retried.
#[derive(Debug)]
pub struct UploadFailure {
    pub wave: u32,
    /// Index of the failed part, `None` if the whole wave failed.
    pub part: Option<usize>,
    pub error: TransportError,
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub waves: u32,
    pub completed: BTreeSet<usize>,
    pub signatures: Vec<Signature>,
    pub errors: Vec<UploadFailure>,
}

/// Uploads every part of `plan`, retrying failed parts in waves until all
/// are confirmed, the context is cancelled or the wave cap is hit.
pub async fn run_upload(
    plan: &UploadPlan,
    ctx: &UploadContext<'_>,
    on_progress: impl FnMut(Progress) + Send,
) -> Result<UploadReport, DataAccountError> {
    ctx.config.validate()?;
    let signer = ctx.signer.pubkey();
    if let Some(authority) = plan.authority {
        if authority != signer {
            return Err(DataAccountError::NotAuthorized {
                expected: authority,
                signer,
            });
        }
    }
    if plan.finalized {
        return Err(DataAccountError::AlreadyFinalized);
    }

    let mut report = UploadReport::default();
    if plan.is_empty() {
        info!("Nothing to upload to {}", plan.data_account);
        return Ok(report);
    }
    let mut tracker = ProgressTracker::new(plan.parts.len(), on_progress);
    upload_parts(plan, ctx, &mut tracker, &mut report).await?;
    Ok(report)
}

async fn upload_parts<F: FnMut(Progress)>(
    plan: &UploadPlan,
    ctx: &UploadContext<'_>,
    tracker: &mut ProgressTracker<F>,
    report: &mut UploadReport,
) -> Result<(), DataAccountError> {
    let total = plan.parts.len();
    while report.completed.len() < total {
        ctx.check_next_wave(report.waves, total - report.completed.len())?;
        if report.waves > 0 {
            ctx.pause().await?;
        }
        report.waves += 1;
        let wave = report.waves;
        let pending: Vec<&UploadPart> = plan
            .parts
            .iter()
            .filter(|part| !report.completed.contains(&part.index))
            .collect();
        info!(
            "Upload wave {} for {}: sending {} of {} parts",
            wave,
            plan.data_account,
            pending.len(),
            total
        );

        let results = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(DataAccountError::Cancelled),
            results = send_wave(plan, ctx, &pending) => results,
        };
        match results {
            Ok(results) => {
                for (part, result) in pending.iter().zip(results) {
                    match result {
                        Ok(signature) => {
                            debug!("Part {} confirmed: {}", part.index, signature);
                            report.completed.insert(part.index);
                            report.signatures.push(signature);
                            tracker.advance();
                        }
                        Err(error) => {
                            warn!("Part {} failed in wave {}: {}", part.index, wave, error);
                            report.errors.push(UploadFailure {
                                wave,
                                part: Some(part.index),
                                error,
                            });
                        }
                    }
                }
            }
            Err(DataAccountError::Transport(error)) => {
                warn!("Upload wave {} failed: {}", wave, error);
                report.errors.push(UploadFailure {
                    wave,
                    part: None,
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }
    info!(
        "Uploaded {} parts to {} in {} waves",
        total, plan.data_account, report.waves
    );
    Ok(())
}

/// Builds, signs and settles one transaction per pending part against a
/// fresh blockhash.
async fn send_wave(
    plan: &UploadPlan,
    ctx: &UploadContext<'_>,
    pending: &[&UploadPart],
) -> Result<Vec<Result<Signature, TransportError>>, DataAccountError> {
    let block = ctx.transport.get_latest_block_info().await?;
    let payer = ctx.signer.pubkey();
    let transactions = pending
        .iter()
        .map(|part| {
            let instruction = instructions::update_part(
                ctx.program,
                &payer,
                &plan.data_account,
                plan.data_type,
                part,
                ctx.config.realloc_allowed,
                ctx.config.confirm,
                ctx.config.debug,
            )?;
            Ok(unsigned_transaction(&[instruction], &payer, &block))
        })
        .collect::<Result<Vec<_>, DataAccountError>>()?;

    let signed = sign_all(ctx, transactions).await?;
    Ok(join_all(
        signed
            .iter()
            .map(|transaction| ctx.transport.submit_and_confirm(transaction, &block)),
    )
    .await)
}

async fn sign_all(
    ctx: &UploadContext<'_>,
    transactions: Vec<Transaction>,
) -> Result<Vec<Transaction>, DataAccountError> {
    let expected = transactions.len();
    let signed = ctx.signer.sign_all(transactions).await?;
    if signed.len() != expected {
        return Err(DataAccountError::Signer(format!(
            "signer returned {} of {} transactions",
            signed.len(),
            expected
        )));
    }
    Ok(signed)
}

fn unsigned_transaction(
    instructions: &[solana_sdk::instruction::Instruction],
    payer: &Pubkey,
    block: &BlockInfo,
) -> Transaction {
    let mut transaction = Transaction::new_with_payer(instructions, Some(payer));
    transaction.message.recent_blockhash = block.blockhash;
    transaction
}

/// Sends a single transaction until it is confirmed.
///
/// Every attempt uses a fresh blockhash. Before resending, `landed` checks
/// whether an earlier attempt took effect even though its confirmation was
/// lost, in which case `None` is returned.
pub(crate) async fn send_until_confirmed<B, L, Fut>(
    ctx: &UploadContext<'_>,
    label: &str,
    errors: &mut Vec<UploadFailure>,
    build: B,
    landed: L,
) -> Result<Option<Signature>, DataAccountError>
where
    B: Fn(&BlockInfo) -> Result<Transaction, DataAccountError>,
    L: Fn() -> Fut,
    Fut: Future<Output = Result<bool, TransportError>>,
{
    let mut attempts = 0;
    loop {
        ctx.check_next_wave(attempts, 1)?;
        if attempts > 0 {
            ctx.pause().await?;
            match landed().await {
                Ok(true) => {
                    info!("{} landed in an earlier attempt", label);
                    return Ok(None);
                }
                Ok(false) => {}
                Err(error) => warn!("Could not check whether {} landed: {}", label, error),
            }
        }
        attempts += 1;

        let attempt = async {
            let block = ctx.transport.get_latest_block_info().await?;
            let transaction = build(&block)?;
            let mut signed = sign_all(ctx, vec![transaction]).await?;
            let transaction = signed
                .pop()
                .ok_or_else(|| DataAccountError::Signer("no transaction signed".to_string()))?;
            Ok::<_, DataAccountError>(
                ctx.transport
                    .submit_and_confirm(&transaction, &block)
                    .await?,
            )
        };
        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(DataAccountError::Cancelled),
            result = attempt => result,
        };
        match result {
            Ok(signature) => {
                info!("{} confirmed: {}", label, signature);
                return Ok(Some(signature));
            }
            Err(DataAccountError::Transport(error)) => {
                warn!("{} failed in attempt {}: {}", label, attempts, error);
                errors.push(UploadFailure {
                    wave: attempts,
                    part: None,
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }
}

/// Parameters of a data account that does not exist yet.
pub struct NewDataAccount {
    pub keypair: Keypair,
    pub authority: Pubkey,
    pub space: u64,
    pub is_dynamic: bool,
}

impl NewDataAccount {
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[derive(Debug, Default)]
pub struct CreateReport {
    pub data_account: Pubkey,
    /// `None` if the transaction landed but its confirmation was lost.
    pub create_signature: Option<Signature>,
    pub initialize_signature: Option<Signature>,
    pub upload: UploadReport,
}

/// Creates and initializes a data account, then uploads `payload` into it.
///
/// Progress counts the create and initialize transactions on top of the
/// payload parts.
pub async fn create_data_account(
    new_account: &NewDataAccount,
    payload: &[u8],
    data_type: DataType,
    ctx: &UploadContext<'_>,
    on_progress: impl FnMut(Progress) + Send,
) -> Result<CreateReport, DataAccountError> {
    ctx.config.validate()?;
    let data_account = new_account.pubkey();
    let signer = ctx.signer.pubkey();
    if new_account.space as usize > MAX_FILE_SIZE {
        return Err(DataAccountError::InvalidInput(format!(
            "space {} exceeds the maximum of {} bytes",
            new_account.space, MAX_FILE_SIZE
        )));
    }
    if !new_account.is_dynamic && payload.len() as u64 > new_account.space {
        return Err(DataAccountError::StaticAccountOverflow {
            original: new_account.space as usize,
            updated: payload.len(),
        });
    }
    if !payload.is_empty() && new_account.authority != signer {
        return Err(DataAccountError::NotAuthorized {
            expected: new_account.authority,
            signer,
        });
    }
    let plan = plan_new_upload(data_account, payload, data_type, ctx.config.part_size)?;
    let mut tracker = ProgressTracker::new(plan.parts.len() + 2, on_progress);
    let mut report = CreateReport {
        data_account,
        ..Default::default()
    };

    let lamports = ctx
        .transport
        .minimum_balance_for_rent_exemption(new_account.space as usize)
        .await?;
    info!(
        "Creating data account {} with {} bytes for {} lamports",
        data_account, new_account.space, lamports
    );

    report.create_signature = send_until_confirmed(
        ctx,
        "Create data account",
        &mut report.upload.errors,
        |block| {
            let instruction = instructions::create_account(
                ctx.program,
                &signer,
                &data_account,
                lamports,
                new_account.space,
            );
            new_account_transaction(&[instruction], &signer, block, &new_account.keypair)
        },
        move || async move {
            Ok(ctx
                .transport
                .fetch_account_bytes(&data_account)
                .await?
                .is_some())
        },
    )
    .await?;
    tracker.advance();

    let metadata = ctx.program.metadata_address(&data_account);
    report.initialize_signature = send_until_confirmed(
        ctx,
        "Initialize data account",
        &mut report.upload.errors,
        |block| {
            let instruction = instructions::initialize(
                ctx.program,
                &signer,
                &data_account,
                InitializeArgs {
                    authority: new_account.authority,
                    space: new_account.space,
                    is_dynamic: new_account.is_dynamic,
                    is_created: true,
                    debug: ctx.config.debug,
                },
            )?;
            new_account_transaction(&[instruction], &signer, block, &new_account.keypair)
        },
        move || async move {
            let bytes = ctx.transport.fetch_account_bytes(&metadata).await?;
            Ok(DataAccountMeta::decode(&bytes.unwrap_or_default())
                .map(|meta| meta.is_initialized())
                .unwrap_or(false))
        },
    )
    .await?;
    tracker.advance();

    if !plan.is_empty() {
        upload_parts(&plan, ctx, &mut tracker, &mut report.upload).await?;
    }
    Ok(report)
}

/// Transaction that is also signed by the keypair of the new data account.
fn new_account_transaction(
    instructions: &[solana_sdk::instruction::Instruction],
    payer: &Pubkey,
    block: &BlockInfo,
    keypair: &Keypair,
) -> Result<Transaction, DataAccountError> {
    let mut transaction = unsigned_transaction(instructions, payer, block);
    transaction
        .try_partial_sign(&[keypair], block.blockhash)
        .map_err(|e| DataAccountError::Signer(e.to_string()))?;
    Ok(transaction)
}
