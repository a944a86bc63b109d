// SPDX-License-Identifier: MIT

mod console;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dblkfs::prelude::*;
use dblkgen::dump::decode_configured;
use dblkgen::*;
use dblkstream::prelude::Record;

#[derive(Parser)]
#[command(name = "dblkgen", version, about = "dblk volume provisioning tool", long_about = None)]
struct Cli {
    /// Debug output from the storage layers
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or reuse) the layout's regions and write the volume locator
    Provision {
        /// Layout path
        #[arg(short, long, default_value = "layout/dblk.toml")]
        layout: PathBuf,

        /// FAT32 image or block device
        #[arg(short, long)]
        image: PathBuf,

        /// Only print the layout, don't touch the image
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the regions recorded in the volume locator
    Mount {
        #[arg(short, long)]
        image: PathBuf,

        /// Check the locator against the layout's directory entries
        #[arg(short, long)]
        layout: Option<PathBuf>,
    },
    /// Decode the record stream of the dblk region
    Dump {
        #[arg(short, long)]
        image: PathBuf,

        /// Record header variant (device or legacy); defaults to the layout's
        #[arg(short, long)]
        format: Option<StreamFormat>,

        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    console::init(cli.verbose);

    match cli.command {
        Commands::Provision {
            layout,
            image,
            dry_run,
        } => {
            let layout = Layout::from_file(&layout)?;
            layout.validate()?;
            println!("{layout}");
            if dry_run {
                println!("[dblkgen] Dry run mode: no data will be written.");
                return Ok(());
            }
            let mut file = open_image(&image, true)?;
            let mut io = StdDblkIO::new(&mut file);
            let locator = provision(&mut io, &layout)?;
            println!("[dblkgen] Provisioned {}", image.display());
            print_locator(&locator);
        }
        Commands::Mount { image, layout } => {
            let mut file = open_image(&image, false)?;
            let mut io = StdDblkIO::new(&mut file);
            let locator = mount(&mut io)?;
            print_locator(&locator);
            if let Some(path) = layout {
                verify(&mut io, &Layout::from_file(&path)?, &locator)?;
                println!("[dblkgen] {}", "Locator matches the directory".green());
            }
        }
        Commands::Dump {
            image,
            format,
            layout,
            limit,
        } => {
            let format = match (format, layout) {
                (Some(format), _) => format,
                (None, Some(path)) => Layout::from_file(&path)?.stream.format,
                (None, None) => StreamFormat::default(),
            };
            let mut file = open_image(&image, false)?;
            let mut io = StdDblkIO::new(&mut file);
            let locator = mount(&mut io)?;

            let limit = limit.unwrap_or(usize::MAX);
            let mut shown = 0usize;
            let summary = decode_configured(&mut io, locator.dblk, format, |item| {
                match item {
                    Ok(record) => {
                        println!("{}", describe(record));
                        shown += 1;
                    }
                    Err(e) => println!("{} {e}", "***".red()),
                }
                shown < limit
            });

            let s = summary.stats;
            let c = summary.counters;
            println!(
                "[dblkgen] {} records, {} bad, {} resyncs, {} bytes skipped",
                s.records, s.bad_records, s.resyncs, s.skipped_bytes
            );
            println!(
                "[dblkgen] {} sectors read, {} bad, {} empty, {} sequence gaps",
                c.sectors_read, c.bad_sectors, c.empty_sectors, c.sequence_gaps
            );
            if let Some(fault) = summary.fault {
                anyhow::bail!("Stream stopped on a fatal error: {fault}");
            }
        }
    }

    Ok(())
}

fn open_image(path: &Path, write: bool) -> anyhow::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(write)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))
}

fn print_locator(locator: &VolumeLocator) {
    for (role, r) in [
        ("panic", locator.panic),
        ("config", locator.config),
        ("dblk", locator.dblk),
    ] {
        println!(
            "  {role:<6} {:>10}..={:<10} {:>12} bytes",
            r.start,
            r.end,
            r.len_bytes()
        );
    }
}

fn describe(record: &Record) -> String {
    let recnum = record
        .recnum
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".into());
    format!("{recnum:>8} {:<16} len {}", record.name, record.len())
}
