use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use borsh::{
    io::{self, Read, Write},
    BorshDeserialize, BorshSerialize,
};
use solana_pubkey::Pubkey;

use crate::error::DataAccountLayoutError;

/// Declares a one-byte enum. Tags without a variant decode to
/// `Unknown(tag)` and encode back to the same byte.
macro_rules! byte_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $tag:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$variant_meta])* $variant,)+
            /// Tag this client has no name for. Never holds a known tag.
            Unknown(u8),
        }

        impl $name {
            pub const KNOWN: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> Option<&'static str> {
                match self {
                    $($name::$variant => Some($label),)+
                    $name::Unknown(_) => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::from(0)
            }
        }

        impl From<u8> for $name {
            fn from(tag: u8) -> Self {
                match tag {
                    $($tag => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                match value {
                    $($name::$variant => $tag,)+
                    $name::Unknown(tag) => tag,
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                match self.name() {
                    Some(name) => write!(f, "{}", name),
                    None => write!(f, "UNKNOWN({})", u8::from(*self)),
                }
            }
        }

        impl BorshSerialize for $name {
            fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
                u8::from(*self).serialize(writer)
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
                Ok(Self::from(u8::deserialize_reader(reader)?))
            }
        }
    };
}

byte_enum! {
    /// Lifecycle stage of a data account.
    pub enum DataStatus {
        Uninitialized = 0 => "UNINITIALIZED",
        Initialized = 1 => "INITIALIZED",
        Updated = 2 => "UPDATED",
        /// Finalized. The payload can no longer be updated.
        Committed = 3 => "COMMITTED",
    }
}

byte_enum! {
    /// Result of the program side validation of the payload.
    pub enum SerializationStatus {
        Unverified = 0 => "UNVERIFIED",
        Verified = 1 => "VERIFIED",
        Failed = 2 => "FAILED",
    }
}

byte_enum! {
    /// Interpretation hint for the payload. The client never parses the
    /// payload itself, the hint only selects how it is displayed.
    pub enum DataType {
        Custom = 0 => "CUSTOM",
        Json = 1 => "JSON",
        Img = 2 => "IMG",
        Html = 3 => "HTML",
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Accepts a name (any case) or a raw numeric tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(tag) = s.parse::<u8>() {
            return Ok(DataType::from(tag));
        }
        DataType::KNOWN
            .iter()
            .copied()
            .find(|data_type| {
                data_type
                    .name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| format!("unknown data type {}", s))
    }
}

/// Metadata record stored in the PDA next to every data account.
///
/// The borsh encoding of this struct is the on-chain layout:
///
/// | field                  | bytes     |
/// |------------------------|-----------|
/// | `data_status`          | `[0, 1)`  |
/// | `serialization_status` | `[1, 2)`  |
/// | `authority`            | `[2, 34)` |
/// | `is_dynamic`           | `[34, 35)`|
/// | `data_version`         | `[35, 36)`|
/// | `data_type`            | `[36, 37)`|
/// | `bump_seed`            | `[37, 38)`|
#[derive(BorshSerialize, BorshDeserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataAccountMeta {
    pub data_status: DataStatus,
    pub serialization_status: SerializationStatus,
    /// Only this key may update, finalize or close the data account.
    pub authority: Pubkey,
    /// Dynamic data accounts may grow, static ones keep their length.
    pub is_dynamic: bool,
    /// Incremented by the program on every update.
    pub data_version: u8,
    pub data_type: DataType,
    pub bump_seed: u8,
}

impl DataAccountMeta {
    pub const LEN: usize = 38;
    pub const AUTHORITY_OFFSET: usize = 2;

    /// Decodes a metadata account.
    ///
    /// An empty account is not an error: it has not been initialized yet and
    /// decodes to the zero record.
    pub fn decode(bytes: &[u8]) -> Result<Self, DataAccountLayoutError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        if bytes.len() != Self::LEN {
            return Err(DataAccountLayoutError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self::try_from_slice(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, DataAccountLayoutError> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn is_finalized(&self) -> bool {
        self.data_status == DataStatus::Committed
    }

    pub fn is_initialized(&self) -> bool {
        self.data_status != DataStatus::Uninitialized
    }
}

/// Payload bytes are opaque, `DataAccountMeta::data_type` decides how they
/// are displayed.
pub fn decode_payload(bytes: &[u8]) -> &[u8] {
    bytes
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_meta() -> DataAccountMeta {
        DataAccountMeta {
            data_status: DataStatus::Updated,
            serialization_status: SerializationStatus::Verified,
            authority: Pubkey::new_from_array([7u8; 32]),
            is_dynamic: true,
            data_version: 5,
            data_type: DataType::Json,
            bump_seed: 254,
        }
    }

    #[test]
    fn test_empty_metadata_decodes_to_default() {
        let meta = DataAccountMeta::decode(&[]).unwrap();
        assert_eq!(meta, DataAccountMeta::default());
        assert!(!meta.is_initialized());
        assert_eq!(meta.authority, Pubkey::default());
    }

    #[test]
    fn test_metadata_field_offsets() {
        let bytes = sample_meta().encode().unwrap();
        assert_eq!(bytes.len(), DataAccountMeta::LEN);
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[2..34], &[7u8; 32]);
        assert_eq!(bytes[34], 1);
        assert_eq!(bytes[35], 5);
        assert_eq!(bytes[36], 1);
        assert_eq!(bytes[37], 254);
    }

    #[test]
    fn test_decode_raw_metadata() {
        let mut bytes = vec![3u8, 2];
        bytes.extend_from_slice(&[9u8; 32]);
        bytes.extend_from_slice(&[0, 17, 2, 251]);
        let meta = DataAccountMeta::decode(&bytes).unwrap();
        assert_eq!(meta.data_status, DataStatus::Committed);
        assert_eq!(meta.serialization_status, SerializationStatus::Failed);
        assert_eq!(meta.authority, Pubkey::new_from_array([9u8; 32]));
        assert!(!meta.is_dynamic);
        assert_eq!(meta.data_version, 17);
        assert_eq!(meta.data_type, DataType::Img);
        assert_eq!(meta.bump_seed, 251);
        assert!(meta.is_finalized());
    }

    #[test]
    fn test_wrong_length_is_decode_error() {
        let mut bytes = sample_meta().encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            DataAccountMeta::decode(&bytes),
            Err(DataAccountLayoutError::InvalidLength {
                expected: 38,
                actual: 39
            })
        ));
        assert!(matches!(
            DataAccountMeta::decode(&bytes[..10]),
            Err(DataAccountLayoutError::InvalidLength { actual: 10, .. })
        ));
    }

    #[test]
    fn test_unknown_tags_round_trip() {
        let mut bytes = sample_meta().encode().unwrap();
        bytes[0] = 9;
        bytes[1] = 200;
        bytes[36] = 4;
        let meta = DataAccountMeta::decode(&bytes).unwrap();
        assert_eq!(meta.data_status, DataStatus::Unknown(9));
        assert_eq!(meta.serialization_status, SerializationStatus::Unknown(200));
        assert_eq!(meta.data_type, DataType::Unknown(4));
        assert_eq!(meta.authority, Pubkey::new_from_array([7u8; 32]));
        assert!(meta.is_initialized());
        assert!(!meta.is_finalized());
        assert_eq!(meta.encode().unwrap(), bytes);
        assert_eq!(meta.data_type.to_string(), "UNKNOWN(4)");
    }

    #[test]
    fn test_known_tags_never_decode_as_unknown() {
        for tag in 0..=u8::MAX {
            let data_type = DataType::from(tag);
            assert_eq!(u8::from(data_type), tag);
            assert_eq!(tag > 3, matches!(data_type, DataType::Unknown(_)));
        }
        assert_eq!(DataStatus::default(), DataStatus::Uninitialized);
        assert_eq!(DataType::default(), DataType::Custom);
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("json".parse::<DataType>().unwrap(), DataType::Json);
        assert_eq!("HTML".parse::<DataType>().unwrap(), DataType::Html);
        assert_eq!("2".parse::<DataType>().unwrap(), DataType::Img);
        assert_eq!("7".parse::<DataType>().unwrap(), DataType::Unknown(7));
        assert!("png".parse::<DataType>().is_err());
    }
}
