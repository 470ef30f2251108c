use crate::{diff::Patch, error::DataAccountError};

/// One update transaction worth of a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    pub index: usize,
    /// Absolute offset in the data account.
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// Splits `patch` into parts of at most `part_size` bytes.
///
/// Every part carries its absolute offset, so parts can be sent in any order.
pub fn chunk(patch: &Patch, part_size: usize) -> Result<Vec<UploadPart>, DataAccountError> {
    if part_size == 0 {
        return Err(DataAccountError::InvalidInput(
            "part size must be greater than zero".to_string(),
        ));
    }
    Ok(patch
        .bytes
        .chunks(part_size)
        .enumerate()
        .map(|(index, bytes)| UploadPart {
            index,
            offset: (patch.offset + index * part_size) as u64,
            bytes: bytes.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::seq::SliceRandom;

    use super::*;
    use crate::{
        constants::{LEGACY_PART_SIZE, UPDATE_PART_SIZE},
        diff::diff,
    };

    #[test]
    fn test_chunk_offsets() {
        let patch = Patch {
            offset: 10,
            bytes: (0..2000u32).map(|i| i as u8).collect(),
        };
        let parts = chunk(&patch, UPDATE_PART_SIZE).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].offset, 10);
        assert_eq!(parts[1].offset, 10 + 881);
        assert_eq!(parts[2].offset, 10 + 2 * 881);
        assert_eq!(parts[2].bytes.len(), 2000 - 2 * 881);

        let parts = chunk(&patch, LEGACY_PART_SIZE).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].bytes.len(), 400);
    }

    #[test]
    fn test_empty_patch_has_no_parts() {
        assert!(chunk(&Patch::default(), UPDATE_PART_SIZE).unwrap().is_empty());
    }

    #[test]
    fn test_zero_part_size_is_invalid() {
        assert!(matches!(
            chunk(&Patch::default(), 0),
            Err(DataAccountError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_part_count_is_ceil(len in 0usize..5000, part_size in 1usize..1000) {
            let patch = Patch { offset: 0, bytes: vec![1u8; len] };
            let parts = chunk(&patch, part_size).unwrap();
            prop_assert_eq!(parts.len(), len.div_ceil(part_size));
            if let Some(last) = parts.last() {
                prop_assert_eq!(last.bytes.len(), len - (parts.len() - 1) * part_size);
            }
        }

        #[test]
        fn prop_reassembly_in_any_order(
            original in prop::collection::vec(any::<u8>(), 0..600),
            updated in prop::collection::vec(any::<u8>(), 0..600),
            part_size in 1usize..100,
            seed in any::<u64>(),
        ) {
            use rand::{rngs::StdRng, SeedableRng};

            let patch = diff(&original, &updated, true).unwrap();
            let mut parts = chunk(&patch, part_size).unwrap();
            parts.shuffle(&mut StdRng::seed_from_u64(seed));

            let mut buffer = original.clone();
            for part in parts {
                Patch { offset: part.offset as usize, bytes: part.bytes }.apply_to(&mut buffer);
            }
            // Shrinks keep the account length, the tail is zeroed.
            buffer.truncate(updated.len());
            prop_assert_eq!(buffer, updated);
        }
    }
}
