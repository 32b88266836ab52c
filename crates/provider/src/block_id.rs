//! Block identifier (spec.md §3): a tagged union of block number, block
//! hash, or a symbolic tag.

use alloy_primitives::B256;
use rpcdaemon_errors::ProviderError;

/// `{64-bit block number, 32-byte block hash, symbolic tag}` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Number(u64),
    Hash(B256),
    Earliest,
    Latest,
    Pending,
}

impl BlockId {
    /// Parse a JSON-RPC block parameter: a decimal or `0x`-prefixed hex
    /// number, a `0x`-prefixed 32-byte hash, or one of the symbolic tags.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        match value {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            "pending" => Ok(Self::Pending),
            hex if hex.len() == 66 && hex.starts_with("0x") => {
                let bytes = alloy_primitives::hex::decode(&hex[2..]).map_err(|err| ProviderError::decode("hex:BlockHash", err))?;
                Ok(Self::Hash(B256::from_slice(&bytes)))
            }
            hex if hex.starts_with("0x") => {
                let number = u64::from_str_radix(&hex[2..], 16).map_err(|err| ProviderError::decode("hex:BlockNumber", err))?;
                Ok(Self::Number(number))
            }
            decimal => {
                let number = decimal.parse::<u64>().map_err(|err| ProviderError::decode("decimal:BlockNumber", err))?;
                Ok(Self::Number(number))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags() {
        assert_eq!(BlockId::parse("earliest").unwrap(), BlockId::Earliest);
        assert_eq!(BlockId::parse("latest").unwrap(), BlockId::Latest);
        assert_eq!(BlockId::parse("pending").unwrap(), BlockId::Pending);
    }

    #[test]
    fn parses_hex_and_decimal_numbers() {
        assert_eq!(BlockId::parse("0xddff12121212").unwrap(), BlockId::Number(0x0000ddff12121212));
        assert_eq!(BlockId::parse("42").unwrap(), BlockId::Number(42));
    }

    #[test]
    fn parses_block_hash() {
        let hash = format!("0x{}", "11".repeat(32));
        assert_eq!(BlockId::parse(&hash).unwrap(), BlockId::Hash(B256::from_slice(&[0x11; 32])));
    }
}
