use solana_pubkey::Pubkey;

/// Seed of the metadata PDA, followed by the data account address.
pub const METADATA_SEED: &[u8] = b"data_account_metadata";

/// Derives the metadata account of `data_account`.
pub fn find_metadata_address(data_account: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    find_metadata_address_with_seed(data_account, METADATA_SEED, program_id)
}

pub fn find_metadata_address_with_seed(
    data_account: &Pubkey,
    seed: &[u8],
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[seed, data_account.as_ref()], program_id)
}
