/// Data account program deployed on devnet.
pub const PROGRAM_ID: &str = "ECQd7f4sYhcWX5G9DQ7Hgcf3URZTfgwVwjKzH2sMQeFW";

/// Largest part that fits into one update transaction.
pub const UPDATE_PART_SIZE: usize = 881;

/// Part size used by the first upload endpoint.
pub const LEGACY_PART_SIZE: usize = 800;

/// Upper bound for the space of a new data account and for uploaded files.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Most close instructions that fit into one transaction.
pub const MAX_CLOSE_BATCH: usize = 10;
