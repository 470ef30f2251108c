use std::cmp::Ordering;

use crate::error::DataAccountError;

/// Byte range that turns the remote payload into the edited one when written
/// at `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl Patch {
    /// An empty patch means there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }

    /// Writes the patch into `buffer` the way the program writes an update,
    /// growing the buffer with zeros when the patch reaches past its end.
    pub fn apply_to(&self, buffer: &mut Vec<u8>) {
        if buffer.len() < self.end() {
            buffer.resize(self.end(), 0);
        }
        buffer[self.offset..self.end()].copy_from_slice(&self.bytes);
    }
}

/// Computes the patch from `original` to `updated`.
///
/// Same length buffers yield the range between the first and the last
/// differing byte. Growth appends from the first difference and needs a
/// dynamic account. Shrinking never reallocates, the tail is zeroed instead.
pub fn diff(original: &[u8], updated: &[u8], is_dynamic: bool) -> Result<Patch, DataAccountError> {
    let common = original.len().min(updated.len());
    let offset = original
        .iter()
        .zip(updated)
        .position(|(a, b)| a != b)
        .unwrap_or(common);

    let bytes = match updated.len().cmp(&original.len()) {
        Ordering::Equal => match (offset..common).rev().find(|&i| original[i] != updated[i]) {
            Some(end) => updated[offset..=end].to_vec(),
            None => Vec::new(),
        },
        Ordering::Greater => {
            if !is_dynamic {
                return Err(DataAccountError::StaticAccountOverflow {
                    original: original.len(),
                    updated: updated.len(),
                });
            }
            updated[offset..].to_vec()
        }
        Ordering::Less => {
            let mut bytes = updated[offset..].to_vec();
            bytes.resize(bytes.len() + original.len() - updated.len(), 0);
            bytes
        }
    };
    Ok(Patch { offset, bytes })
}
