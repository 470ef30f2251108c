use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::{error::DataAccountLayoutError, state::DataType};

/// Instruction opcodes of the data account program.
///
/// Deployments of the program did not agree on every opcode, so the table is
/// configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcodes {
    pub initialize: u8,
    pub update: u8,
    pub finalize: u8,
    pub close: u8,
}

impl Default for Opcodes {
    fn default() -> Self {
        Self {
            initialize: 0,
            update: 1,
            finalize: 3,
            close: 4,
        }
    }
}

/// `authority(32) | space(u64 LE) | is_dynamic | is_created | debug`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeArgs {
    pub authority: Pubkey,
    pub space: u64,
    pub is_dynamic: bool,
    /// The data account was already created by a system program instruction.
    pub is_created: bool,
    pub debug: bool,
}

/// `data_type | part_len(u32 LE) | part | offset(u64 LE) | realloc_allowed | confirm | debug`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdatePartArgs {
    pub data_type: DataType,
    pub data: Vec<u8>,
    pub offset: u64,
    /// Allows the program to grow a dynamic account to fit the part.
    pub realloc_allowed: bool,
    pub confirm: bool,
    pub debug: bool,
}

impl UpdatePartArgs {
    /// Bytes of instruction data around the part itself.
    pub const OVERHEAD: usize = 1 + 1 + 4 + 8 + 3;
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeArgs {
    pub debug: bool,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseArgs {
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataAccountInstruction {
    Initialize(InitializeArgs),
    UpdatePart(UpdatePartArgs),
    Finalize(FinalizeArgs),
    Close(CloseArgs),
}

impl DataAccountInstruction {
    /// Serializes the instruction as `opcode | borsh(args)`.
    pub fn pack(&self, opcodes: &Opcodes) -> Result<Vec<u8>, DataAccountLayoutError> {
        let mut data = Vec::new();
        match self {
            Self::Initialize(args) => {
                data.push(opcodes.initialize);
                args.serialize(&mut data)?;
            }
            Self::UpdatePart(args) => {
                data.reserve(UpdatePartArgs::OVERHEAD + args.data.len());
                data.push(opcodes.update);
                args.serialize(&mut data)?;
            }
            Self::Finalize(args) => {
                data.push(opcodes.finalize);
                args.serialize(&mut data)?;
            }
            Self::Close(args) => {
                data.push(opcodes.close);
                args.serialize(&mut data)?;
            }
        }
        Ok(data)
    }

    pub fn unpack(data: &[u8], opcodes: &Opcodes) -> Result<Self, DataAccountLayoutError> {
        let (opcode, rest) = data
            .split_first()
            .ok_or(DataAccountLayoutError::EmptyInstruction)?;
        let instruction = match *opcode {
            op if op == opcodes.initialize => {
                Self::Initialize(InitializeArgs::try_from_slice(rest)?)
            }
            op if op == opcodes.update => Self::UpdatePart(UpdatePartArgs::try_from_slice(rest)?),
            op if op == opcodes.finalize => Self::Finalize(FinalizeArgs::try_from_slice(rest)?),
            op if op == opcodes.close => Self::Close(CloseArgs::try_from_slice(rest)?),
            op => return Err(DataAccountLayoutError::UnknownOpcode(op)),
        };
        Ok(instruction)
    }
}
