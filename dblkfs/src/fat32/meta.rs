// SPDX-License-Identifier: MIT

use crate::{
    errors::*,
    fat32::{boot::Fat32BootSector, constant::*},
};

/// Volume geometry derived from a FAT32 boot sector.
///
/// Every sector number is absolute on the device, so a partitioned disk and
/// a bare volume are handled the same way once `volume_start` is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32Geometry {
    pub volume_start: u32,
    pub total_sectors: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    pub fat_size: u32,
    pub fat_start: u32,
    pub fat_end: u32,
    pub data_start: u32,
    pub cluster_count: u32,
    pub max_cluster: u32,
    pub root_cluster: u32,
    pub fsinfo_sector: Option<u32>,
    pub backup_boot_sector: Option<u32>,
}

impl Fat32Geometry {
    /// Derives the layout of the volume whose boot sector lives at `volume_start`.
    ///
    /// Pure function of its inputs. Rejects volumes below the FAT32 cluster
    /// threshold.
    pub fn from_boot(bs: &Fat32BootSector, volume_start: u32) -> FxResult<Self> {
        const OVERFLOW: FxError = FxError::Invalid("geometry overflow");

        let spc = bs.sectors_per_cluster as u32;
        let reserved = bs.reserved_sectors.get() as u32;
        let num_fats = bs.num_fats as u32;
        let fat_size = bs.fat_size_32.get();
        let total = bs.total_sectors_32.get();

        let fats_total = fat_size.checked_mul(num_fats).ok_or(OVERFLOW)?;
        let fat_start = volume_start.checked_add(reserved).ok_or(OVERFLOW)?;
        let data_start = fat_start.checked_add(fats_total).ok_or(OVERFLOW)?;
        let data_sectors = total
            .checked_sub(reserved)
            .and_then(|s| s.checked_sub(fats_total))
            .ok_or(FxError::Invalid("FAT region larger than volume"))?;
        let cluster_count = data_sectors / spc.max(1);

        if cluster_count < FAT32_MIN_CLUSTERS {
            return Err(FxError::NotFat32 {
                clusters: cluster_count,
            });
        }
        volume_start.checked_add(total).ok_or(OVERFLOW)?;

        // Never address entries past the end of the FAT itself.
        let fat_capacity = fat_size.saturating_mul(FAT_ENTRIES_PER_SECTOR);
        let max_cluster = (cluster_count + 1).min(fat_capacity.saturating_sub(1));
        if max_cluster < FAT_FIRST_CLUSTER {
            return Err(FxError::Invalid("FAT too small"));
        }
        if max_cluster != cluster_count + 1 {
            log::debug!(
                "fat32: FAT holds {} entries, clamping max cluster to {}",
                fat_capacity,
                max_cluster
            );
        }

        let fsinfo = bs.fsinfo_sector.get();
        let backup = bs.backup_boot_sector.get();
        let optional = |field: u16| match field {
            0 | 0xFFFF => None,
            s if (s as u32) < reserved => Some(volume_start + s as u32),
            _ => None,
        };

        Ok(Self {
            volume_start,
            total_sectors: total,
            sectors_per_cluster: spc,
            reserved_sectors: reserved,
            num_fats,
            fat_size,
            fat_start,
            fat_end: fat_start + fat_size - 1,
            data_start,
            cluster_count,
            max_cluster,
            root_cluster: bs.root_cluster.get(),
            fsinfo_sector: optional(fsinfo),
            backup_boot_sector: optional(backup),
        })
    }

    #[inline]
    pub fn cluster_bytes(&self) -> u32 {
        self.sectors_per_cluster * FAT_SECTOR_SIZE as u32
    }

    #[inline]
    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        (FAT_FIRST_CLUSTER..=self.max_cluster).contains(&cluster)
    }

    /// First sector of `cluster`. `cluster` must be valid.
    #[inline]
    pub fn cluster_to_sector(&self, cluster: u32) -> u32 {
        (cluster - FAT_FIRST_CLUSTER) * self.sectors_per_cluster + self.data_start
    }

    /// Last sector of a run of `count` clusters starting at `first`.
    #[inline]
    pub fn run_end_sector(&self, first: u32, count: u32) -> u32 {
        self.cluster_to_sector(first + count) - 1
    }

    /// Sector and byte offset of `cluster`'s entry in FAT copy `copy`.
    #[inline]
    pub fn fat_entry_location(&self, cluster: u32, copy: u32) -> (u32, usize) {
        let lba = self.fat_start
            + copy * self.fat_size
            + cluster / FAT_ENTRIES_PER_SECTOR;
        let off = (cluster % FAT_ENTRIES_PER_SECTOR) as usize * FAT_ENTRY_SIZE;
        (lba, off)
    }

    /// Largest cluster count whose byte size still fits a directory entry.
    #[inline]
    pub fn max_file_clusters(&self) -> u32 {
        u32::MAX / self.cluster_bytes()
    }

    /// Clusters needed to hold `bytes`, rounded up.
    #[inline]
    pub fn clusters_for(&self, bytes: u32) -> u32 {
        bytes.div_ceil(self.cluster_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromZeros;
    use zerocopy::byteorder::little_endian::{U16, U32};

    fn bpb(total: u32, spc: u8, fat_size: u32) -> Fat32BootSector {
        let mut bs = Fat32BootSector::new_zeroed();
        bs.bytes_per_sector = U16::new(512);
        bs.sectors_per_cluster = spc;
        bs.reserved_sectors = U16::new(32);
        bs.num_fats = 2;
        bs.total_sectors_32 = U32::new(total);
        bs.fat_size_32 = U32::new(fat_size);
        bs.root_cluster = U32::new(2);
        bs.fsinfo_sector = U16::new(1);
        bs.backup_boot_sector = U16::new(6);
        bs
    }

    #[test]
    fn layout_of_a_4gib_volume() {
        let geo = Fat32Geometry::from_boot(&bpb(8_388_608, 8, 8192), 0).unwrap();
        assert_eq!(geo.fat_start, 32);
        assert_eq!(geo.fat_end, 32 + 8192 - 1);
        assert_eq!(geo.data_start, 32 + 2 * 8192);
        assert_eq!(geo.cluster_count, (8_388_608 - 32 - 2 * 8192) / 8);
        assert_eq!(geo.max_cluster, geo.cluster_count + 1);
        assert_eq!(geo.cluster_to_sector(2), geo.data_start);
        assert_eq!(geo.cluster_to_sector(3), geo.data_start + 8);
        assert_eq!(geo.fsinfo_sector, Some(1));
        assert_eq!(geo.backup_boot_sector, Some(6));
        assert_eq!(geo.cluster_bytes(), 4096);
    }

    #[test]
    fn derivation_is_deterministic() {
        let bs = bpb(81_920, 1, 640);
        let a = Fat32Geometry::from_boot(&bs, 2048).unwrap();
        let b = Fat32Geometry::from_boot(&bs, 2048).unwrap();
        assert_eq!(a, b);
        for c in [2, 3, 1000, a.max_cluster] {
            assert_eq!(a.cluster_to_sector(c), b.cluster_to_sector(c));
        }
        assert_eq!(a.fat_start, 2048 + 32);
    }

    #[test]
    fn small_volumes_are_not_fat32() {
        let err = Fat32Geometry::from_boot(&bpb(65_536, 1, 520), 0).unwrap_err();
        assert!(matches!(err, FxError::NotFat32 { clusters } if clusters < FAT32_MIN_CLUSTERS));
    }

    #[test]
    fn fat_entry_locations() {
        let geo = Fat32Geometry::from_boot(&bpb(81_920, 1, 640), 0).unwrap();
        assert_eq!(geo.fat_entry_location(2, 0), (32, 8));
        assert_eq!(geo.fat_entry_location(128, 0), (33, 0));
        assert_eq!(geo.fat_entry_location(129, 1), (32 + 640 + 1, 4));
    }

    #[test]
    fn max_cluster_never_exceeds_the_fat() {
        // 80608 clusters but a FAT of 600 sectors only holds 76800 entries.
        let geo = Fat32Geometry::from_boot(&bpb(81_920, 1, 600), 0).unwrap();
        assert_eq!(geo.max_cluster, 600 * 128 - 1);
        let (lba, _) = geo.fat_entry_location(geo.max_cluster, 0);
        assert!(lba <= geo.fat_end);
    }

    #[test]
    fn cluster_rounding() {
        let geo = Fat32Geometry::from_boot(&bpb(8_388_608, 8, 8192), 0).unwrap();
        assert_eq!(geo.clusters_for(1), 1);
        assert_eq!(geo.clusters_for(4096), 1);
        assert_eq!(geo.clusters_for(4097), 2);
        assert_eq!(geo.clusters_for(64 * 1024), 16);
        assert_eq!(geo.max_file_clusters(), u32::MAX / 4096);
    }
}
