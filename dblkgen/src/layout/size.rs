// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer};

use crate::layout::error::LayoutError;

/// Requested region size.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Size {
    /// Whole largest free run.
    Rest,
    Bytes(u64),
}

impl Size {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let lower = value.trim().to_ascii_lowercase();
        if lower == "rest" {
            return Ok(Size::Rest);
        }
        parse_size_bytes(&lower).map(Size::Bytes)
    }

    /// Byte count handed to the allocator; `rest` is 0.
    pub fn request(&self, region: &str) -> Result<u32, LayoutError> {
        match *self {
            Size::Rest => Ok(0),
            Size::Bytes(0) => Err(LayoutError::ZeroSize(region.into())),
            Size::Bytes(n) => {
                u32::try_from(n).map_err(|_| LayoutError::SizeTooLarge(region.into(), n))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl<'de> serde::de::Visitor<'de> for SizeVisitor {
            type Value = Size;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a byte count or a size string like '64K', '8M', '1G' or 'rest'")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Size::Bytes(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .map(Size::Bytes)
                    .map_err(|_| E::custom(format!("Negative size {value}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Size::parse(value).map_err(|_| {
                    E::custom(format!(
                        "Invalid size format '{value}'. Use bytes, a K, M or G suffix, or 'rest'."
                    ))
                })
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const K: u64 = 1024;
        match *self {
            Size::Rest => write!(f, "rest"),
            Size::Bytes(n) if n >= K * K * K && n % (K * K * K) == 0 => write!(f, "{}G", n / (K * K * K)),
            Size::Bytes(n) if n >= K * K && n % (K * K) == 0 => write!(f, "{}M", n / (K * K)),
            Size::Bytes(n) if n >= K && n % K == 0 => write!(f, "{}K", n / K),
            Size::Bytes(n) => write!(f, "{n} B"),
        }
    }
}

fn parse_size_bytes(size: &str) -> anyhow::Result<u64> {
    let (num, shift) = if let Some(num) = size.strip_suffix('k') {
        (num, 10)
    } else if let Some(num) = size.strip_suffix('m') {
        (num, 20)
    } else if let Some(num) = size.strip_suffix('g') {
        (num, 30)
    } else if size.bytes().all(|b| b.is_ascii_digit()) && !size.is_empty() {
        (size, 0)
    } else {
        anyhow::bail!("Unknown size format '{}'", size);
    };
    let n = num.trim().parse::<u64>()?;
    n.checked_mul(1u64 << shift)
        .ok_or_else(|| anyhow::anyhow!("Size '{size}' overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_and_rest() {
        assert_eq!(Size::parse("64K").unwrap(), Size::Bytes(64 * 1024));
        assert_eq!(Size::parse(" 8m ").unwrap(), Size::Bytes(8 << 20));
        assert_eq!(Size::parse("1G").unwrap(), Size::Bytes(1 << 30));
        assert_eq!(Size::parse("4096").unwrap(), Size::Bytes(4096));
        assert_eq!(Size::parse("REST").unwrap(), Size::Rest);
        assert!(Size::parse("12T").is_err());
        assert!(Size::parse("").is_err());
        assert!(Size::parse("k").is_err());
    }

    #[test]
    fn request_bounds() {
        assert_eq!(Size::Rest.request("DBLK0001"), Ok(0));
        assert_eq!(Size::Bytes(8192).request("CNFG0001"), Ok(8192));
        assert_eq!(
            Size::Bytes(0).request("PANIC001"),
            Err(LayoutError::ZeroSize("PANIC001".into()))
        );
        assert!(matches!(
            Size::Bytes(1 << 32).request("DBLK0001"),
            Err(LayoutError::SizeTooLarge(_, _))
        ));
    }

    #[test]
    fn display_picks_largest_unit() {
        assert_eq!(Size::Bytes(128 * 1024).to_string(), "128K");
        assert_eq!(Size::Bytes(3 << 20).to_string(), "3M");
        assert_eq!(Size::Bytes(1000).to_string(), "1000 B");
        assert_eq!(Size::Rest.to_string(), "rest");
    }
}
