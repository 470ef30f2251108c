use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataAccountLayoutError {
    #[error("Invalid account length, expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Account data too short, expected at least {expected} bytes, got {actual}")]
    AccountTooShort { expected: usize, actual: usize },

    #[error("Empty instruction data")]
    EmptyInstruction,

    #[error("Unknown instruction opcode {0}")]
    UnknownOpcode(u8),

    #[error("Borsh error: {0}")]
    Borsh(#[from] std::io::Error),
}
