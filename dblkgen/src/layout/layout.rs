// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use dblkfs::prelude::ShortName;

use crate::layout::{error::LayoutError, size::Size};

/// What a region is used for; each role appears exactly once.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Panic,
    Config,
    Dblk,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Panic, Role::Config, Role::Dblk];
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Role::Panic => "panic",
            Role::Config => "config",
            Role::Dblk => "dblk",
        })
    }
}

/// Record header variant written by the deployed firmware.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    #[default]
    Device,
    Legacy,
}

impl FromStr for StreamFormat {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(StreamFormat::Device),
            "legacy" => Ok(StreamFormat::Legacy),
            _ => Err(LayoutError::UnknownFormat(s.into())),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamConfig {
    #[serde(default)]
    pub format: StreamFormat,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RegionSpec {
    pub name: String,
    pub role: Role,
    pub size: Size,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Layout {
    #[serde(default)]
    pub stream: StreamConfig,
    pub regions: Vec<RegionSpec>,
}

impl Default for Layout {
    fn default() -> Self {
        let region = |name: &str, role, size| RegionSpec {
            name: name.into(),
            role,
            size,
        };
        Self {
            stream: StreamConfig::default(),
            regions: vec![
                region("PANIC001", Role::Panic, Size::Bytes(128 * 1024)),
                region("CNFG0001", Role::Config, Size::Bytes(8 * 1024)),
                region("DBLK0001", Role::Dblk, Size::Rest),
            ],
        }
    }
}

impl FromStr for Layout {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> anyhow::Result<Self> {
        let layout: Layout = toml::from_str(content)?;
        Ok(layout)
    }
}

impl Layout {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading layout {}", path.display()))?;
        content
            .parse()
            .with_context(|| format!("parsing layout {}", path.display()))
    }

    pub fn region(&self, role: Role) -> Option<&RegionSpec> {
        self.regions.iter().find(|r| r.role == role)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        for role in Role::ALL {
            match self.regions.iter().filter(|r| r.role == role).count() {
                0 => return Err(LayoutError::MissingRole(role)),
                1 => {}
                _ => return Err(LayoutError::DuplicateRole(role)),
            }
        }

        let mut seen = HashSet::new();
        let last = self.regions.len() - 1;
        for (i, r) in self.regions.iter().enumerate() {
            let short = ShortName::parse(&r.name)
                .map_err(|_| LayoutError::InvalidName(r.name.clone()))?;
            if !seen.insert(short.0) {
                return Err(LayoutError::DuplicateName(r.name.clone()));
            }
            if r.size == Size::Rest && i != last {
                return Err(LayoutError::RestNotLast(r.name.clone()));
            }
            r.size.request(&r.name)?;
        }
        Ok(())
    }
}

impl core::fmt::Display for Layout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "\n  stream format: {:?}", self.stream.format)?;
        writeln!(f, "  ┌────┬──────────┬────────┬────────────┐")?;
        writeln!(f, "  | Id | Name     | Role   | Size       |")?;
        writeln!(f, "  ├────┼──────────┼────────┼────────────┤")?;
        for (i, r) in self.regions.iter().enumerate() {
            writeln!(
                f,
                "  | {i:<2} | {n:<8} | {k:<6} | {s:>10} |",
                n = r.name,
                k = r.role.to_string(),
                s = r.size.to_string(),
            )?;
        }
        writeln!(f, "  └────┴──────────┴────────┴────────────┘")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [stream]
        format = "legacy"

        [[regions]]
        name = "PANIC001"
        role = "panic"
        size = "64K"

        [[regions]]
        name = "cnfg0001"
        role = "config"
        size = 8192

        [[regions]]
        name = "DBLK0001"
        role = "dblk"
        size = "rest"
    "#;

    #[test]
    fn parses_toml() {
        let layout: Layout = SAMPLE.parse().unwrap();
        assert_eq!(layout.stream.format, StreamFormat::Legacy);
        assert_eq!(layout.regions.len(), 3);
        assert_eq!(layout.region(Role::Config).unwrap().size, Size::Bytes(8192));
        assert_eq!(layout.region(Role::Dblk).unwrap().size, Size::Rest);
        assert_eq!(layout.validate(), Ok(()));
    }

    #[test]
    fn stream_section_is_optional() {
        let text = SAMPLE.replace("[stream]", "").replace("format = \"legacy\"", "");
        let layout: Layout = text.parse().unwrap();
        assert_eq!(layout.stream.format, StreamFormat::Device);
    }

    #[test]
    fn default_layout_is_valid() {
        let layout = Layout::default();
        assert_eq!(layout.validate(), Ok(()));
        assert_eq!(
            layout.region(Role::Panic).unwrap().size,
            Size::Bytes(128 * 1024)
        );
    }

    #[test]
    fn semantic_errors() {
        let mut layout = Layout::default();
        layout.regions.pop();
        assert_eq!(layout.validate(), Err(LayoutError::MissingRole(Role::Dblk)));

        let mut layout = Layout::default();
        layout.regions[2].role = Role::Config;
        assert_eq!(layout.validate(), Err(LayoutError::DuplicateRole(Role::Config)));

        let mut layout = Layout::default();
        layout.regions.swap(1, 2);
        assert_eq!(
            layout.validate(),
            Err(LayoutError::RestNotLast("DBLK0001".into()))
        );

        let mut layout = Layout::default();
        layout.regions[0].name = "PANIC.AREA".into();
        assert_eq!(
            layout.validate(),
            Err(LayoutError::InvalidName("PANIC.AREA".into()))
        );

        let mut layout = Layout::default();
        layout.regions[1].name = "panic001".into();
        assert_eq!(
            layout.validate(),
            Err(LayoutError::DuplicateName("panic001".into()))
        );

        let bad = SAMPLE.replace("\"64K\"", "\"64Q\"");
        assert!(bad.parse::<Layout>().is_err());
    }

    #[test]
    fn format_from_str() {
        assert_eq!("Device".parse::<StreamFormat>(), Ok(StreamFormat::Device));
        assert_eq!(
            "v2".parse::<StreamFormat>(),
            Err(LayoutError::UnknownFormat("v2".into()))
        );
    }
}
