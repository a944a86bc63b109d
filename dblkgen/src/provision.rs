// SPDX-License-Identifier: MIT

use anyhow::Context;
use dblkfs::prelude::*;

use crate::layout::{Layout, Role};

#[inline]
fn slot(role: Role) -> usize {
    match role {
        Role::Panic => 0,
        Role::Config => 1,
        Role::Dblk => 2,
    }
}

/// Makes every region of `layout` exist, then writes the volume locator.
///
/// Regions already present are reused as they are, so provisioning an
/// already provisioned volume only rewrites the locator.
pub fn provision<IO: DblkIO + ?Sized>(
    io: &mut IO,
    layout: &Layout,
) -> anyhow::Result<VolumeLocator> {
    layout.validate()?;

    let mut buf = SectorBuf::new();
    let mut fat = PseudoFat::initialize(io, &mut buf).context("mounting FAT32 volume")?;

    let mut placed = [Region::default(); 3];
    for spec in &layout.regions {
        let request = spec.size.request(&spec.name)?;
        let region = match fat.find_entry(&spec.name) {
            Ok(info) => {
                if info.region.len_bytes() < u64::from(request) {
                    anyhow::bail!(
                        "Region '{}' already exists with {} bytes, layout asks for {}",
                        spec.name,
                        info.region.len_bytes(),
                        spec.size
                    );
                }
                log::info!(
                    "region {} ({}): reusing sectors {}..={}",
                    spec.name,
                    spec.role,
                    info.region.start,
                    info.region.end
                );
                info.region
            }
            Err(FxError::NotFound) => fat
                .create_region(&spec.name, request)
                .with_context(|| format!("creating region '{}' ({})", spec.name, spec.size))?,
            Err(e) => {
                return Err(e).with_context(|| format!("looking up region '{}'", spec.name));
            }
        };
        placed[slot(spec.role)] = region;
    }

    let [panic, config, dblk] = placed;
    let locator = VolumeLocator::new(panic, config, dblk);
    fat.write_locator(&locator)
        .context("writing volume locator")?;
    Ok(locator)
}

/// Reads the region map of a provisioned volume.
///
/// Touches only the boot sector(s) holding the locator.
pub fn mount<IO: DblkIO + ?Sized>(io: &mut IO) -> anyhow::Result<VolumeLocator> {
    let mut buf = SectorBuf::new();
    read_volume_locator(io, &mut buf)
        .context("reading volume locator")?
        .context("Volume has no valid locator; provision it first")
}

/// Cross-checks a locator against the directory entries named by `layout`.
pub fn verify<IO: DblkIO + ?Sized>(
    io: &mut IO,
    layout: &Layout,
    locator: &VolumeLocator,
) -> anyhow::Result<()> {
    let mut buf = SectorBuf::new();
    let mut fat = PseudoFat::initialize(io, &mut buf).context("mounting FAT32 volume")?;
    for spec in &layout.regions {
        let expected = match spec.role {
            Role::Panic => locator.panic,
            Role::Config => locator.config,
            Role::Dblk => locator.dblk,
        };
        let found = fat
            .find_region(&spec.name)
            .with_context(|| format!("looking up region '{}'", spec.name))?;
        if found != expected {
            anyhow::bail!(
                "Region '{}' is at {}..={} but the locator says {}..={}",
                spec.name,
                found.start,
                found.end,
                expected.start,
                expected.end
            );
        }
    }
    Ok(())
}
