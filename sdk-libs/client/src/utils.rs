use solana_sdk::pubkey::Pubkey;

use crate::error::DataAccountError;

/// Formats a byte count with decimal thresholds, e.g. `1.5 KB`.
pub fn display_size(size: usize) -> String {
    if size < 1_000 {
        format!("{} B", size)
    } else if size < 1_000_000 {
        format!("{:.1} KB", size as f64 / 1_000.0)
    } else {
        format!("{:.1} MB", size as f64 / 1_000_000.0)
    }
}

/// Parses a base58 encoded public key.
pub fn parse_pubkey(value: &str) -> Result<Pubkey, DataAccountError> {
    let bytes = bs58::decode(value.trim())
        .into_vec()
        .map_err(|e| DataAccountError::InvalidInput(format!("Invalid public key {}: {}", value, e)))?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
        DataAccountError::InvalidInput(format!(
            "Invalid public key {}: expected 32 bytes, got {}",
            value,
            bytes.len()
        ))
    })?;
    Ok(Pubkey::new_from_array(bytes))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_size() {
        assert_eq!(display_size(0), "0 B");
        assert_eq!(display_size(999), "999 B");
        assert_eq!(display_size(1_500), "1.5 KB");
        assert_eq!(display_size(2_500_000), "2.5 MB");
    }

    #[test]
    fn test_parse_pubkey() {
        let pubkey = Pubkey::new_unique();
        assert_eq!(parse_pubkey(&pubkey.to_string()).unwrap(), pubkey);
        assert!(matches!(
            parse_pubkey("not a key"),
            Err(DataAccountError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_pubkey("3yZe7d"),
            Err(DataAccountError::InvalidInput(_))
        ));
    }
}
