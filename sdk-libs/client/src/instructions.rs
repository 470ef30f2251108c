use data_account_layout::{
    CloseArgs, DataAccountInstruction, DataType, FinalizeArgs, InitializeArgs, UpdatePartArgs,
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, system_program,
};

use crate::{chunk::UploadPart, config::ProgramConfig, error::DataAccountError};

fn build(
    program: &ProgramConfig,
    instruction: DataAccountInstruction,
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, DataAccountError> {
    Ok(Instruction {
        program_id: program.program_id,
        accounts,
        data: instruction.pack(&program.opcodes)?,
    })
}

/// System program instruction allocating the data account, owned by the
/// data account program.
pub fn create_account(
    program: &ProgramConfig,
    payer: &Pubkey,
    data_account: &Pubkey,
    lamports: u64,
    space: u64,
) -> Instruction {
    system_instruction::create_account(payer, data_account, lamports, space, &program.program_id)
}

pub fn initialize(
    program: &ProgramConfig,
    payer: &Pubkey,
    data_account: &Pubkey,
    args: InitializeArgs,
) -> Result<Instruction, DataAccountError> {
    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(*data_account, true),
        AccountMeta::new(program.metadata_address(data_account), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    build(program, DataAccountInstruction::Initialize(args), accounts)
}

#[allow(clippy::too_many_arguments)]
pub fn update_part(
    program: &ProgramConfig,
    authority: &Pubkey,
    data_account: &Pubkey,
    data_type: DataType,
    part: &UploadPart,
    realloc_allowed: bool,
    confirm: bool,
    debug: bool,
) -> Result<Instruction, DataAccountError> {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*data_account, false),
        AccountMeta::new(program.metadata_address(data_account), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let args = UpdatePartArgs {
        data_type,
        data: part.bytes.clone(),
        offset: part.offset,
        realloc_allowed,
        confirm,
        debug,
    };
    build(program, DataAccountInstruction::UpdatePart(args), accounts)
}

pub fn finalize(
    program: &ProgramConfig,
    authority: &Pubkey,
    data_account: &Pubkey,
    debug: bool,
) -> Result<Instruction, DataAccountError> {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new_readonly(*data_account, false),
        AccountMeta::new(program.metadata_address(data_account), false),
    ];
    build(
        program,
        DataAccountInstruction::Finalize(FinalizeArgs { debug }),
        accounts,
    )
}

/// Closes the data account and its metadata, returning rent to `authority`.
pub fn close(
    program: &ProgramConfig,
    authority: &Pubkey,
    data_account: &Pubkey,
    debug: bool,
) -> Result<Instruction, DataAccountError> {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*data_account, false),
        AccountMeta::new(program.metadata_address(data_account), false),
    ];
    build(
        program,
        DataAccountInstruction::Close(CloseArgs { debug }),
        accounts,
    )
}
