//! ubicheck - UBI/UBIFS rootfs sanity gate.
//!
//! Extracts a built rootfs image with ubireader and verifies the userspace
//! an embedded board needs to boot is present:
//! - udev (udevadm, rules, S10udev init script)
//! - kmod and blkid libraries
//! - an executable /sbin/init and busybox
//!
//! Exit status is 0 when every required check passes, 10 when any fails,
//! and a stage-specific code (2-6) when extraction cannot complete.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use ubicheck::config::Config;
use ubicheck::extract::UbiReader;
use ubicheck::pipeline::{self, RunOptions};

#[derive(Parser)]
#[command(name = "ubicheck")]
#[command(about = "Sanity-check a UBI/UBIFS rootfs image before it ships")]
#[command(
    after_help = "EXIT CODES:\n  0   all required checks passed\n  2   rootfs image not found\n  3   ubireader_extract_images failed\n  4   ubifs-root missing after extraction\n  5   no volume file extracted\n  6   ubireader_extract_files failed\n  10  required rootfs components missing"
)]
struct Cli {
    /// Path to rootfs.img (UBI image)
    #[arg(long)]
    rootfs_img: PathBuf,

    /// Output directory for logs and extraction
    #[arg(long)]
    outdir: PathBuf,

    /// Workspace root searched for Buildroot .config files
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load();
    let extractor = UbiReader::new(config.python.clone());

    let opts = RunOptions {
        rootfs_img: cli.rootfs_img,
        outdir: cli.outdir,
        workspace: cli.workspace,
        config,
    };

    match pipeline::run(&opts, &extractor) {
        Ok(outcome) => {
            println!("{}", outcome.message());
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
