use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use data_account_client::{
    data_account_layout::{
        find_metadata_address_with_seed, DataAccountInstruction, DataAccountMeta, DataStatus,
        DataType,
    },
    AccountFilter, BlockInfo, DataSlice, ProgramConfig, Transport, TransportError,
};
use solana_sdk::{
    hash::Hash, instruction::CompiledInstruction, message::Message, pubkey::Pubkey,
    signature::Signature, system_program, transaction::Transaction,
};

/// Kind of the first instruction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Initialize,
    Update,
    Finalize,
    Close,
}

#[derive(Debug, Clone)]
struct SimAccount {
    owner: Pubkey,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct ChainState {
    accounts: HashMap<Pubkey, SimAccount>,
    reject: HashMap<Op, usize>,
    always_reject: HashSet<Op>,
    reject_offsets: HashSet<u64>,
    lose_confirmation: HashMap<Op, usize>,
    lost: HashSet<Signature>,
    submissions: Vec<Op>,
    block_requests: usize,
    program_scans: Vec<(Vec<AccountFilter>, Option<DataSlice>)>,
    fail_reads: bool,
}

/// In memory stand-in for a cluster running the data account program.
#[derive(Debug)]
pub struct SimulatedChain {
    program: ProgramConfig,
    state: Mutex<ChainState>,
}

#[allow(dead_code)]
impl SimulatedChain {
    pub fn new(program: ProgramConfig) -> Self {
        Self {
            program,
            state: Mutex::new(ChainState::default()),
        }
    }

    pub fn insert_data_account(
        &self,
        data_account: Pubkey,
        meta: DataAccountMeta,
        payload: &[u8],
    ) {
        let mut state = self.state.lock().unwrap();
        let program_id = self.program.program_id;
        state.accounts.insert(
            data_account,
            SimAccount {
                owner: program_id,
                data: payload.to_vec(),
            },
        );
        state.accounts.insert(
            self.program.metadata_address(&data_account),
            SimAccount {
                owner: program_id,
                data: meta.encode().unwrap(),
            },
        );
    }

    pub fn insert_raw_account(&self, address: Pubkey, data: Vec<u8>) {
        let owner = self.program.program_id;
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(address, SimAccount { owner, data });
    }

    pub fn account(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|account| account.data.clone())
    }

    pub fn meta(&self, data_account: &Pubkey) -> Option<DataAccountMeta> {
        self.account(&self.program.metadata_address(data_account))
            .map(|bytes| DataAccountMeta::decode(&bytes).unwrap())
    }

    /// Rejects the next `count` submissions of `op`.
    pub fn reject(&self, op: Op, count: usize) {
        self.state.lock().unwrap().reject.insert(op, count);
    }

    pub fn always_reject(&self, op: Op) {
        self.state.lock().unwrap().always_reject.insert(op);
    }

    /// Rejects the first submission of the update parts at `offsets`.
    pub fn reject_update_offsets_once(&self, offsets: impl IntoIterator<Item = u64>) {
        self.state.lock().unwrap().reject_offsets.extend(offsets);
    }

    /// Applies the next `count` transactions of `op` but lets their
    /// confirmation expire.
    pub fn lose_confirmation(&self, op: Op, count: usize) {
        self.state.lock().unwrap().lose_confirmation.insert(op, count);
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn submissions(&self) -> Vec<Op> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submission_count(&self, op: Op) -> usize {
        self.submissions().iter().filter(|o| **o == op).count()
    }

    /// Filters and data slice of every program account scan, in order.
    pub fn program_scans(&self) -> Vec<(Vec<AccountFilter>, Option<DataSlice>)> {
        self.state.lock().unwrap().program_scans.clone()
    }

    pub fn block_requests(&self) -> usize {
        self.state.lock().unwrap().block_requests
    }

    /// Runs every instruction of `transaction` against `accounts`. Reports the
    /// kind of the first instruction.
    fn execute(
        &self,
        accounts: &mut HashMap<Pubkey, SimAccount>,
        transaction: &Transaction,
    ) -> Result<(Op, Option<u64>), String> {
        let message = &transaction.message;
        let mut first = None;
        for instruction in &message.instructions {
            let result = self.execute_instruction(accounts, message, instruction)?;
            first.get_or_insert(result);
        }
        first.ok_or_else(|| "empty transaction".to_string())
    }

    fn execute_instruction(
        &self,
        accounts: &mut HashMap<Pubkey, SimAccount>,
        message: &Message,
        instruction: &CompiledInstruction,
    ) -> Result<(Op, Option<u64>), String> {
        let program_id = message.account_keys[instruction.program_id_index as usize];
        let keys: Vec<Pubkey> = instruction
            .accounts
            .iter()
            .map(|index| message.account_keys[*index as usize])
            .collect();
        let is_signer = |key: &Pubkey| {
            message
                .account_keys
                .iter()
                .position(|k| k == key)
                .is_some_and(|index| message.is_signer(index))
        };

        if program_id == system_program::id() {
            // create_account: tag(u32) | lamports(u64) | space(u64) | owner(32)
            let data = &instruction.data;
            let space = u64::from_le_bytes(data[12..20].try_into().unwrap());
            let owner = Pubkey::try_from(&data[20..52]).unwrap();
            if accounts.contains_key(&keys[1]) {
                return Err("account already in use".to_string());
            }
            accounts.insert(
                keys[1],
                SimAccount {
                    owner,
                    data: vec![0u8; space as usize],
                },
            );
            return Ok((Op::Create, None));
        }
        if program_id != self.program.program_id {
            return Err("unknown program".to_string());
        }

        let instruction =
            DataAccountInstruction::unpack(&instruction.data, &self.program.opcodes)
                .map_err(|e| e.to_string())?;
        let data_account = keys[1];
        let metadata = keys[2];
        if metadata != self.program.metadata_address(&data_account) {
            return Err("invalid metadata account".to_string());
        }
        let meta = accounts
            .get(&metadata)
            .map(|account| DataAccountMeta::decode(&account.data).unwrap())
            .unwrap_or_default();
        let authorized = is_signer(&keys[0]) && keys[0] == meta.authority;

        match instruction {
            DataAccountInstruction::Initialize(args) => {
                if !accounts.contains_key(&data_account) || !is_signer(&data_account) {
                    return Err("data account not created".to_string());
                }
                if meta.is_initialized() {
                    return Err("already initialized".to_string());
                }
                let (_, bump_seed) = find_metadata_address_with_seed(
                    &data_account,
                    &self.program.metadata_seed,
                    &self.program.program_id,
                );
                let meta = DataAccountMeta {
                    data_status: DataStatus::Initialized,
                    authority: args.authority,
                    is_dynamic: args.is_dynamic,
                    bump_seed,
                    ..Default::default()
                };
                accounts.insert(
                    metadata,
                    SimAccount {
                        owner: self.program.program_id,
                        data: meta.encode().unwrap(),
                    },
                );
                Ok((Op::Initialize, None))
            }
            DataAccountInstruction::UpdatePart(args) => {
                if !authorized {
                    return Err("not authorized".to_string());
                }
                if meta.is_finalized() {
                    return Err("finalized".to_string());
                }
                let account = accounts.get_mut(&data_account).ok_or("missing data account")?;
                let end = args.offset as usize + args.data.len();
                if end > account.data.len() {
                    if !(meta.is_dynamic && args.realloc_allowed) {
                        return Err("static account overflow".to_string());
                    }
                    account.data.resize(end, 0);
                }
                account.data[args.offset as usize..end].copy_from_slice(&args.data);
                let meta = DataAccountMeta {
                    data_status: DataStatus::Updated,
                    data_version: meta.data_version.wrapping_add(1),
                    data_type: args.data_type,
                    ..meta
                };
                accounts.get_mut(&metadata).ok_or("missing metadata")?.data =
                    meta.encode().unwrap();
                Ok((Op::Update, Some(args.offset)))
            }
            DataAccountInstruction::Finalize(_) => {
                if !authorized || meta.is_finalized() {
                    return Err("cannot finalize".to_string());
                }
                let meta = DataAccountMeta {
                    data_status: DataStatus::Committed,
                    ..meta
                };
                accounts.get_mut(&metadata).ok_or("missing metadata")?.data =
                    meta.encode().unwrap();
                Ok((Op::Finalize, None))
            }
            DataAccountInstruction::Close(_) => {
                if !authorized {
                    return Err("not authorized".to_string());
                }
                accounts.remove(&data_account);
                accounts.remove(&metadata);
                Ok((Op::Close, None))
            }
        }
    }
}

#[async_trait]
impl Transport for SimulatedChain {
    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Signature, TransportError> {
        transaction
            .verify()
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        let mut accounts = state.accounts.clone();
        let (op, offset) = self
            .execute(&mut accounts, transaction)
            .map_err(TransportError::Rejected)?;
        state.submissions.push(op);

        if state.always_reject.contains(&op) {
            return Err(TransportError::Rejected(format!("{:?} rejected", op)));
        }
        if let Some(count) = state.reject.get_mut(&op).filter(|count| **count > 0) {
            *count -= 1;
            return Err(TransportError::Rejected(format!("{:?} rejected", op)));
        }
        if let Some(offset) = offset {
            if state.reject_offsets.remove(&offset) {
                return Err(TransportError::Rejected(format!(
                    "update at {} rejected",
                    offset
                )));
            }
        }

        let signature = transaction.signatures[0];
        if let Some(count) = state
            .lose_confirmation
            .get_mut(&op)
            .filter(|count| **count > 0)
        {
            *count -= 1;
            state.lost.insert(signature);
        }
        state.accounts = accounts;
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _block: &BlockInfo,
    ) -> Result<(), TransportError> {
        if self.state.lock().unwrap().lost.contains(signature) {
            return Err(TransportError::Expired(*signature));
        }
        Ok(())
    }

    async fn get_latest_block_info(&self) -> Result<BlockInfo, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.block_requests += 1;
        Ok(BlockInfo {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 150 + state.block_requests as u64,
        })
    }

    async fn fetch_account_bytes(
        &self,
        address: &Pubkey,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(TransportError::CustomError("connection refused".to_string()));
        }
        Ok(state.accounts.get(address).map(|account| account.data.clone()))
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, TransportError> {
        Ok(890_880 + 6_960 * data_len as u64)
    }

    async fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
        data_slice: Option<DataSlice>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(TransportError::CustomError("connection refused".to_string()));
        }
        state.program_scans.push((filters.to_vec(), data_slice));
        Ok(state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| filters.iter().all(|filter| filter.matches(&account.data)))
            .map(|(address, account)| {
                let data = match data_slice {
                    Some(slice) => slice.apply(&account.data),
                    None => account.data.as_slice(),
                };
                (*address, data.to_vec())
            })
            .collect())
    }
}

#[allow(dead_code)]
pub fn initialized_meta(authority: Pubkey, is_dynamic: bool) -> DataAccountMeta {
    DataAccountMeta {
        data_status: DataStatus::Initialized,
        authority,
        is_dynamic,
        data_type: DataType::Custom,
        ..Default::default()
    }
}
