// SPDX-License-Identifier: MIT

use alloc::vec::Vec;

use dblkio::prelude::*;

use crate::{
    errors::*,
    fat32::{constant::*, meta::Fat32Geometry},
};

/// Decoded FAT32 entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    Free,
    Next(u32),
    Bad,
    EndOfChain,
}

impl FatEntry {
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        match raw & FAT_ENTRY_MASK {
            FAT_FREE => FatEntry::Free,
            FAT_BAD => FatEntry::Bad,
            v if v >= FAT_EOC_MIN => FatEntry::EndOfChain,
            v => FatEntry::Next(v),
        }
    }
}

/// A run of consecutive clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRun {
    pub first: u32,
    pub count: u32,
}

impl ClusterRun {
    #[inline]
    pub fn last(&self) -> u32 {
        self.first + self.count - 1
    }

    #[inline]
    pub fn contains(&self, cluster: u32) -> bool {
        cluster >= self.first && cluster - self.first < self.count
    }
}

/// Sector-at-a-time view of FAT copy 0.
///
/// Remembers which FAT sector it loaded into the shared buffer; any other
/// user of the buffer invalidates that knowledge, so a reader is created per
/// operation and dropped before the buffer is reused.
struct FatReader<'b> {
    buf: &'b mut SectorBuf,
    loaded: Option<u32>,
}

impl<'b> FatReader<'b> {
    fn new(buf: &'b mut SectorBuf) -> Self {
        Self { buf, loaded: None }
    }

    fn raw<IO: DblkIO + ?Sized>(
        &mut self,
        io: &mut IO,
        geo: &Fat32Geometry,
        cluster: u32,
    ) -> FxResult<u32> {
        let (lba, off) = geo.fat_entry_location(cluster, 0);
        if self.loaded != Some(lba) {
            self.loaded = None;
            self.buf.load(io, lba)?;
            self.loaded = Some(lba);
        }
        Ok(self.buf.u32_at(off))
    }
}

/// Reads the entry of `cluster` from the first FAT copy.
pub fn read_entry<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    cluster: u32,
) -> FxResult<FatEntry> {
    if cluster > geo.max_cluster {
        return Err(FxError::InvalidCluster(cluster));
    }
    FatReader::new(buf).raw(io, geo, cluster).map(FatEntry::from_raw)
}

/// Follows a chain that must be contiguous and end in end-of-chain.
///
/// Returns the run covering the whole chain.
pub fn walk_contiguous<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    first: u32,
) -> FxResult<ClusterRun> {
    if !geo.is_valid_cluster(first) {
        return Err(FxError::InvalidCluster(first));
    }
    let mut reader = FatReader::new(buf);
    let mut cur = first;
    loop {
        match FatEntry::from_raw(reader.raw(io, geo, cur)?) {
            FatEntry::EndOfChain => {
                return Ok(ClusterRun {
                    first,
                    count: cur - first + 1,
                });
            }
            FatEntry::Next(next) if next == cur + 1 && geo.is_valid_cluster(next) => cur = next,
            other => {
                log::debug!("fat32: chain from {first} breaks at {cur} ({other:?})");
                return Err(FxError::NotContiguous { cluster: cur });
            }
        }
    }
}

/// Collects an arbitrary (possibly fragmented) chain, guarding against loops.
pub fn read_chain<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    first: u32,
) -> FxResult<Vec<u32>> {
    if !geo.is_valid_cluster(first) {
        return Err(FxError::InvalidCluster(first));
    }
    let mut reader = FatReader::new(buf);
    let mut chain = Vec::new();
    let mut cur = first;
    loop {
        if chain.len() as u32 >= geo.cluster_count {
            return Err(FxError::LoopDetected);
        }
        chain.push(cur);
        match FatEntry::from_raw(reader.raw(io, geo, cur)?) {
            FatEntry::EndOfChain => return Ok(chain),
            FatEntry::Next(next) if geo.is_valid_cluster(next) => cur = next,
            FatEntry::Next(next) => return Err(FxError::InvalidCluster(next)),
            FatEntry::Free | FatEntry::Bad => return Err(FxError::InvalidCluster(cur)),
        }
    }
}

/// Single pass over the FAT looking for free runs.
///
/// With `want = Some(n)` the scan stops at the first run reaching `n`
/// clusters and returns exactly `n` of them. With `None` the largest run wins
/// (first one on ties). Runs are capped at `cap` clusters.
pub fn find_free_run<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    want: Option<u32>,
    cap: u32,
) -> FxResult<Option<ClusterRun>> {
    let target = want.unwrap_or(cap).min(cap);
    if target == 0 {
        return Ok(None);
    }

    let mut best: Option<ClusterRun> = None;
    let mut run: Option<ClusterRun> = None;

    let first_sector = FAT_FIRST_CLUSTER / FAT_ENTRIES_PER_SECTOR;
    let last_sector = geo.max_cluster / FAT_ENTRIES_PER_SECTOR;

    'scan: for s in first_sector..=last_sector {
        buf.load(io, geo.fat_start + s)?;
        for i in 0..FAT_ENTRIES_PER_SECTOR {
            let cluster = s * FAT_ENTRIES_PER_SECTOR + i;
            if !geo.is_valid_cluster(cluster) {
                continue;
            }
            let free = buf.u32_at(i as usize * FAT_ENTRY_SIZE) & FAT_ENTRY_MASK == FAT_FREE;
            if !free {
                if let Some(r) = run.take() {
                    if best.is_none_or(|b| r.count > b.count) {
                        best = Some(r);
                    }
                }
                continue;
            }
            let r = run.get_or_insert(ClusterRun {
                first: cluster,
                count: 0,
            });
            r.count += 1;
            if r.count >= target {
                best = Some(*r);
                run = None;
                break 'scan;
            }
        }
    }
    if let Some(r) = run {
        if best.is_none_or(|b| r.count > b.count) {
            best = Some(r);
        }
    }
    buf.invalidate();
    Ok(best)
}

/// Rewrites the entries of `run` in every FAT copy.
///
/// `value(cluster)` gives the new entry; the reserved top four bits of each
/// entry are preserved. Each FAT sector is re-read before it is patched.
pub fn write_run<IO: DblkIO + ?Sized, F: Fn(u32) -> u32>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    run: ClusterRun,
    value: F,
) -> FxResult<()> {
    if run.count == 0 || !geo.is_valid_cluster(run.first) || !geo.is_valid_cluster(run.last()) {
        return Err(FxError::InvalidCluster(run.first));
    }
    let first_sector = run.first / FAT_ENTRIES_PER_SECTOR;
    let last_sector = run.last() / FAT_ENTRIES_PER_SECTOR;

    for copy in 0..geo.num_fats {
        for s in first_sector..=last_sector {
            let lba = geo.fat_start + copy * geo.fat_size + s;
            buf.load(io, lba)?;
            for i in 0..FAT_ENTRIES_PER_SECTOR {
                let cluster = s * FAT_ENTRIES_PER_SECTOR + i;
                if !run.contains(cluster) {
                    continue;
                }
                let off = i as usize * FAT_ENTRY_SIZE;
                let old = buf.u32_at(off);
                let new = (old & FAT_RESERVED_BITS) | (value(cluster) & FAT_ENTRY_MASK);
                buf.set_u32_at(off, new);
            }
            buf.store(io, lba)?;
        }
    }
    Ok(())
}

/// Links `run` as one contiguous chain ending in end-of-chain.
pub fn write_chain<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    run: ClusterRun,
) -> FxResult<()> {
    let last = run.last();
    write_run(io, buf, geo, run, |c| if c == last { FAT_EOC } else { c + 1 })
}

/// Marks `cluster` as end-of-chain in every FAT copy.
pub fn mark_end_of_chain<IO: DblkIO + ?Sized>(
    io: &mut IO,
    buf: &mut SectorBuf,
    geo: &Fat32Geometry,
    cluster: u32,
) -> FxResult<()> {
    write_run(
        io,
        buf,
        geo,
        ClusterRun {
            first: cluster,
            count: 1,
        },
        |_| FAT_EOC,
    )
}
