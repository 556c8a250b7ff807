use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;

use super::{CodecError, DictKey};

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

/// Standard (`addr_std`) account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    workchain: i32,
    hash: [u8; 32],
}

impl Address {
    pub fn new(workchain: i32, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    pub fn workchain(&self) -> i32 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// The 256-bit account id as used for provider registry keys
    pub fn hash_key(&self) -> DictKey {
        self.hash
    }

    /// `workchain:hex` form
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// User-friendly, url-safe base64 form with checksum
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }
        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as i8 as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        URL_SAFE.encode(bytes)
    }

    fn parse_raw(value: &str) -> Result<Self, CodecError> {
        let (workchain, hash) = value
            .split_once(':')
            .ok_or_else(|| CodecError::InvalidAddress(value.to_string()))?;
        let workchain = workchain
            .parse::<i32>()
            .map_err(|_| CodecError::InvalidAddress(format!("bad workchain in {}", value)))?;
        let bytes = hex::decode(hash)
            .map_err(|_| CodecError::InvalidAddress(format!("bad hash in {}", value)))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| {
                CodecError::InvalidAddress(format!("hash must be 32 bytes in {}", value))
            })?;
        Ok(Self::new(workchain, hash))
    }

    fn parse_friendly(value: &str) -> Result<Self, CodecError> {
        let bytes = if value.contains('-') || value.contains('_') {
            URL_SAFE.decode(value)
        } else {
            STANDARD.decode(value)
        }
        .map_err(|_| CodecError::InvalidAddress(format!("bad base64 in {}", value)))?;

        if bytes.len() != 36 {
            return Err(CodecError::InvalidAddress(format!(
                "friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }
        let tag = bytes[0] & !TAG_TEST_ONLY;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(CodecError::InvalidAddress(format!(
                "unknown address tag {:#04x}",
                bytes[0]
            )));
        }
        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != expected {
            return Err(CodecError::InvalidAddress(format!(
                "checksum mismatch in {}",
                value
            )));
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(Self::new(i32::from(bytes[1] as i8), hash))
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.contains(':') {
            Self::parse_raw(value)
        } else if value.len() == 48 {
            Self::parse_friendly(value)
        } else {
            Err(CodecError::InvalidAddress(value.to_string()))
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_friendly(true, false))
    }
}

/// CRC-16/XMODEM
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRIENDLY: &str = "EQAiRfFdxEf5dmSb2cEpq8pjhyHts6hmoI1woHqLRPRwZKuw";
    const RAW: &str = "0:2245f15dc447f976649bd9c129abca638721edb3a866a08d70a07a8b44f47064";

    #[test]
    fn test_friendly_and_raw_agree() {
        let friendly: Address = FRIENDLY.parse().unwrap();
        let raw: Address = RAW.parse().unwrap();
        assert_eq!(friendly, raw);
        assert_eq!(friendly.workchain(), 0);
        assert_eq!(friendly.to_raw(), RAW);
        assert_eq!(friendly.to_string(), FRIENDLY);
        assert_eq!(
            friendly.to_friendly(false, false),
            "UQAiRfFdxEf5dmSb2cEpq8pjhyHts6hmoI1woHqLRPRwZPZ1"
        );
    }

    #[test]
    fn test_checksum_is_verified() {
        let mut corrupted = FRIENDLY.to_string();
        corrupted.replace_range(47..48, "x");
        assert!(matches!(
            corrupted.parse::<Address>(),
            Err(CodecError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_masterchain_raw() {
        let address: Address = format!("-1:{}", "ab".repeat(32)).parse().unwrap();
        assert_eq!(address.workchain(), -1);
        let reparsed: Address = address.to_string().parse().unwrap();
        assert_eq!(reparsed, address);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("not-an-address".parse::<Address>().is_err());
        assert!("0:abcd".parse::<Address>().is_err());
    }
}
