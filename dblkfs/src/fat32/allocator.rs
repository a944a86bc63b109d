// SPDX-License-Identifier: MIT

use alloc::vec::Vec;

use dblkio::prelude::*;
use dblkpart::Mbr;

use crate::{
    errors::*,
    fat32::{
        boot::{Fat32BootSector, FsInfo},
        dir::{self, DirEntry, DirSlot, ShortName},
        fat::{self, ClusterRun},
        locator::VolumeLocator,
        meta::Fat32Geometry,
        region::{Region, RegionInfo},
    },
};

/// Finds the FAT32 volume on the device.
///
/// Sector 0 is either the volume boot sector itself or an MBR whose first
/// entry points at it. Returns the volume start and its boot sector; `buf`
/// is left holding the volume boot sector.
pub fn locate_volume<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
) -> FxResult<(u32, Fat32BootSector)> {
    buf.load(io, 0)?;
    let bs = Fat32BootSector::from_sector(buf)?;
    if bs.is_fat32() {
        log::debug!("fat32: bare volume at sector 0");
        return Ok((0, bs));
    }

    let (start, sectors) = Mbr::from_sector(buf)?.fat32_partition()?;
    buf.load(io, start)?;
    let bs = Fat32BootSector::from_sector(buf)?;
    if let Err(why) = bs.check() {
        log::debug!("fat32: partition at {start} rejected: {why}");
        return Err(FxError::NoPartition);
    }
    let total = bs.total_sectors_32.get();
    if sectors != total && total.checked_add(1) != Some(sectors) {
        return Err(FxError::SizeMismatch {
            partition: sectors,
            volume: total,
        });
    }
    log::debug!("fat32: partition 1 at sector {start}, {sectors} sectors");
    Ok((start, bs))
}

/// Reads the locator from the primary sector, then from the backup.
///
/// `buf` must hold the primary sector already.
fn locator_from<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    backup: Option<u32>,
) -> FxResult<Option<VolumeLocator>> {
    if let Some(loc) = VolumeLocator::from_sector(buf) {
        return Ok(Some(loc));
    }
    let Some(lba) = backup else {
        return Ok(None);
    };
    buf.load(io, lba)?;
    if !buf.has_boot_signature() {
        return Ok(None);
    }
    let loc = VolumeLocator::from_sector(buf);
    if loc.is_some() {
        log::warn!("locator: primary copy invalid, using backup at sector {lba}");
    }
    Ok(loc)
}

/// Reads the locator with no allocator state: boot sector(s) and locator only.
pub fn read_volume_locator<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
) -> FxResult<Option<VolumeLocator>> {
    let (volume_start, bs) = locate_volume(io, buf)?;
    let backup = match bs.backup_boot_sector.get() {
        0 | 0xFFFF => None,
        s if s < bs.reserved_sectors.get() => Some(volume_start + s as u32),
        _ => None,
    };
    locator_from(io, buf, backup)
}

/// Contiguous region allocator on top of an existing FAT32 volume.
///
/// Only the root directory and the FAT are touched; region files are plain
/// single-run chains any FAT implementation can read.
pub struct PseudoFat<'a, IO: DblkIO + ?Sized> {
    io: &'a mut IO,
    buf: &'a mut SectorBuf,
    geo: Fat32Geometry,
    root: Vec<u32>,
}

struct Located {
    slot: DirSlot,
    entry: DirEntry,
    run: ClusterRun,
}

impl<'a, IO: DblkIO + ?Sized> PseudoFat<'a, IO> {
    /// Mounts the volume: boot sector, geometry, FSInfo, root-directory chain.
    pub fn initialize(io: &'a mut IO, buf: &'a mut SectorBuf) -> FxResult<Self> {
        let (volume_start, bs) = locate_volume(io, buf)?;
        let mut geo = Fat32Geometry::from_boot(&bs, volume_start)?;

        if let Some(lba) = geo.fsinfo_sector {
            buf.load(io, lba)?;
            if !FsInfo::is_valid(buf) {
                log::debug!("fat32: FSInfo at sector {lba} invalid, ignoring");
                geo.fsinfo_sector = None;
            }
        }

        let root = fat::read_chain(io, buf, &geo, geo.root_cluster)?;
        log::debug!(
            "fat32: {} clusters of {} bytes, FAT at {}..={} x{}, data at {}, root {} cluster(s)",
            geo.cluster_count,
            geo.cluster_bytes(),
            geo.fat_start,
            geo.fat_end,
            geo.num_fats,
            geo.data_start,
            root.len()
        );

        Ok(Self { io, buf, geo, root })
    }

    #[inline]
    pub fn geometry(&self) -> &Fat32Geometry {
        &self.geo
    }

    #[inline]
    pub fn root_clusters(&self) -> &[u32] {
        &self.root
    }

    fn region_of(&self, run: ClusterRun) -> Region {
        Region::new(
            self.geo.cluster_to_sector(run.first),
            self.geo.run_end_sector(run.first, run.count),
        )
    }

    fn locate(&mut self, name: &ShortName) -> FxResult<Located> {
        let (slot, entry) = dir::find_entry(self.io, self.buf, &self.geo, &self.root, name)?
            .ok_or(FxError::NotFound)?;
        let first = entry.first_cluster();
        if !self.geo.is_valid_cluster(first) {
            return Err(FxError::InvalidCluster(first));
        }
        let run = fat::walk_contiguous(self.io, self.buf, &self.geo, first)?;
        Ok(Located { slot, entry, run })
    }

    /// Fails with Exists unless `name` is definitely absent.
    fn ensure_absent(&mut self, name: &ShortName) -> FxResult<()> {
        match self.locate(name) {
            Err(FxError::NotFound) => Ok(()),
            Err(FxError::IO(e)) => Err(FxError::IO(e)),
            _ => Err(FxError::Exists),
        }
    }

    fn free_slot(&mut self) -> FxResult<DirSlot> {
        dir::find_free_slot(self.io, self.buf, &self.geo, &self.root)?.ok_or(FxError::RootDirFull)
    }

    /// Region named `name` with its recorded size.
    pub fn find_entry(&mut self, name: &str) -> FxResult<RegionInfo> {
        let name = ShortName::parse(name)?;
        let found = self.locate(&name)?;
        Ok(RegionInfo {
            region: self.region_of(found.run),
            size: found.entry.size(),
            first_cluster: found.run.first,
        })
    }

    /// Sector range of the contiguous region named `name`.
    pub fn find_region(&mut self, name: &str) -> FxResult<Region> {
        self.find_entry(name).map(|info| info.region)
    }

    /// Allocates a new contiguous region.
    ///
    /// A zero `size` takes the largest free run (up to the largest size a
    /// directory entry can record).
    pub fn create_region(&mut self, name: &str, size: u32) -> FxResult<Region> {
        let name = ShortName::parse(name)?;
        self.ensure_absent(&name)?;

        let cap = self.geo.max_file_clusters();
        let want = (size > 0).then(|| self.geo.clusters_for(size));
        let run = fat::find_free_run(self.io, self.buf, &self.geo, want, cap)?
            .ok_or(FxError::NoRoom)?;
        if want.is_some_and(|w| run.count < w) {
            log::debug!("fat32: largest free run is {} clusters, {:?} wanted", run.count, want);
            return Err(FxError::NoRoom);
        }
        let slot = self.free_slot()?;

        fat::write_chain(self.io, self.buf, &self.geo, run)?;
        let entry = DirEntry::new_file(name, run.first, run.count * self.geo.cluster_bytes());
        dir::write_entry(self.io, self.buf, slot, &entry)?;
        self.invalidate_fsinfo()?;

        let region = self.region_of(run);
        log::info!(
            "fat32: created {} at clusters {}..={} (sectors {}..={})",
            name,
            run.first,
            run.last(),
            region.start,
            region.end
        );
        Ok(region)
    }

    /// Splits `name` at the cluster boundary covering `new_size` bytes.
    ///
    /// The head keeps its name and is resized to `new_size`; the tail becomes
    /// a new entry `new_name`. Returns `(head, tail)`.
    pub fn cap_region(
        &mut self,
        name: &str,
        new_size: u32,
        new_name: &str,
    ) -> FxResult<(Region, Region)> {
        let old = ShortName::parse(name)?;
        let new = ShortName::parse(new_name)?;
        self.ensure_absent(&new)?;

        let found = self.locate(&old)?;
        let old_size = found.entry.size();
        if new_size == 0 || new_size >= old_size {
            return Err(FxError::InvalidSize);
        }
        let cluster_bytes = self.geo.cluster_bytes();
        let keep = self.geo.clusters_for(new_size);
        if keep >= found.run.count || old_size <= keep * cluster_bytes {
            return Err(FxError::InvalidSize);
        }
        let slot = self.free_slot()?;

        let mut head_entry = dir::read_entry(self.io, self.buf, found.slot)?;
        head_entry.size.set(new_size);
        dir::write_entry(self.io, self.buf, found.slot, &head_entry)?;

        let tail_first = found.run.first + keep;
        fat::mark_end_of_chain(self.io, self.buf, &self.geo, tail_first - 1)?;

        let tail_entry = DirEntry::new_file(new, tail_first, old_size - keep * cluster_bytes);
        dir::write_entry(self.io, self.buf, slot, &tail_entry)?;

        let head = self.region_of(ClusterRun {
            first: found.run.first,
            count: keep,
        });
        let tail = self.region_of(ClusterRun {
            first: tail_first,
            count: found.run.count - keep,
        });
        log::info!(
            "fat32: capped {} at {} bytes, tail {} at sectors {}..={}",
            old,
            new_size,
            new,
            tail.start,
            tail.end
        );
        Ok((head, tail))
    }

    fn invalidate_fsinfo(&mut self) -> FxResult<()> {
        let Some(lba) = self.geo.fsinfo_sector else {
            return Ok(());
        };
        self.buf.load(self.io, lba)?;
        FsInfo::invalidate_hints(self.buf);
        self.buf.store(self.io, lba)?;
        Ok(())
    }

    /// Writes the locator into the volume boot sector and its backup.
    pub fn write_locator(&mut self, locator: &VolumeLocator) -> FxResult<()> {
        let primary = self.geo.volume_start;
        self.buf.load(self.io, primary)?;
        if !self.buf.has_boot_signature() {
            return Err(FxError::BadBootSignature);
        }
        locator.write_into(self.buf)?;
        self.buf.store(self.io, primary)?;

        if let Some(backup) = self.geo.backup_boot_sector {
            self.buf.load(self.io, backup)?;
            if self.buf.has_boot_signature() {
                locator.write_into(self.buf)?;
                self.buf.store(self.io, backup)?;
            } else {
                log::debug!("locator: backup sector {backup} unsigned, skipped");
            }
        }
        self.io.flush()?;
        log::info!(
            "locator: panic {}..={}, config {}..={}, dblk {}..={}",
            locator.panic.start,
            locator.panic.end,
            locator.config.start,
            locator.config.end,
            locator.dblk.start,
            locator.dblk.end
        );
        Ok(())
    }

    /// Primary locator, or the backup copy when the primary is damaged.
    pub fn read_locator(&mut self) -> FxResult<Option<VolumeLocator>> {
        self.buf.load(self.io, self.geo.volume_start)?;
        locator_from(self.io, self.buf, self.geo.backup_boot_sector)
    }
}
