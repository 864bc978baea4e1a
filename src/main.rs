//! Herdstore node tool
//!
//! Prepares a node's base directory and inspects its epoch log.
//!
//! # Usage
//!
//! ```text
//! herdstore --base-dir /var/lib/herd init
//! herdstore --base-dir /var/lib/herd --disks /mnt/d1,/mnt/d2 init
//! herdstore epoch latest
//! herdstore epoch show 7 --json
//! herdstore epoch list
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use herdstore::epoch::EpochLog;
use herdstore::store::{
    init_base_path, resolve_disk_space, BaseDirLock, StoreOptions, StorePaths,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Herdstore - epoch-versioned object store node tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory holding the lock, config and epoch log
    #[arg(
        long,
        env = "HERD_BASE_DIR",
        default_value = "/var/lib/herdstore",
        global = true
    )]
    base_dir: PathBuf,

    /// Dedicated object disks (comma separated)
    #[arg(long, env = "HERD_DISKS", value_delimiter = ',', global = true)]
    disks: Vec<PathBuf>,

    /// Never open objects with synchronous flags
    #[arg(long, env = "HERD_NO_SYNC", global = true)]
    no_sync: bool,

    /// A write-ahead journal covers durability
    #[arg(long, env = "HERD_JOURNAL", global = true)]
    journal: bool,

    /// Use direct I/O for aligned data-object access
    #[arg(long, env = "HERD_DIRECT_IO", global = true)]
    direct_io: bool,

    /// Advertised capacity in bytes (0 = detect)
    #[arg(long, env = "HERD_DISK_SPACE", default_value = "0", global = true)]
    disk_space: u64,

    /// Run as a gateway that stores no objects
    #[arg(long, env = "HERD_GATEWAY", global = true)]
    gateway: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create and lock the base directory, lay out disks, settle capacity
    Init,
    /// Inspect the epoch log
    Epoch {
        #[command(subcommand)]
        action: EpochCommand,
    },
}

#[derive(Subcommand, Debug)]
enum EpochCommand {
    /// Print the latest recorded epoch
    Latest,
    /// Print the membership of one epoch
    Show {
        epoch: u32,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every recorded epoch
    List,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    match &args.command {
        Command::Init => init_node(&args),
        Command::Epoch { action } => run_epoch(&args, action),
    }
}

fn init_node(args: &Args) -> anyhow::Result<()> {
    info!("Initializing node at {:?}", args.base_dir);

    init_base_path(&args.base_dir)?;
    let _lock = BaseDirLock::acquire(&args.base_dir)?;

    let mut disk_arg = args.base_dir.to_string_lossy().into_owned();
    for disk in &args.disks {
        disk_arg.push(',');
        disk_arg.push_str(&disk.to_string_lossy());
    }
    let paths = StorePaths::init(&args.base_dir, &disk_arg)
        .with_context(|| format!("failed to lay out {:?}", args.base_dir))?;

    let opts = StoreOptions {
        nosync: args.no_sync,
        backend_dio: args.direct_io,
        ..StoreOptions::default()
    };
    opts.set_journal(args.journal);

    let space = resolve_disk_space(&paths, args.disk_space, args.gateway)?;
    let latest = EpochLog::new(paths.epoch_dir()).latest_epoch()?;

    info!("  Object disks: {}", paths.disks().len());
    info!("  Sync writes: {}", !opts.skip_sync());
    info!("  Direct I/O: {}", opts.backend_dio);

    println!("base:   {}", paths.base().display());
    for disk in paths.disks() {
        println!("disk:   {}", disk.display());
    }
    println!("space:  {}", space);
    println!("epoch:  {}", latest);
    Ok(())
}

fn run_epoch(args: &Args, action: &EpochCommand) -> anyhow::Result<()> {
    let log = EpochLog::new(StorePaths::epoch_dir_for(&args.base_dir));

    match action {
        EpochCommand::Latest => {
            println!("{}", log.latest_epoch()?);
        }
        EpochCommand::List => {
            for epoch in log.epochs()? {
                println!("{:08}", epoch);
            }
        }
        EpochCommand::Show { epoch, json } => {
            let record = log
                .read(*epoch)
                .with_context(|| format!("failed to read epoch {}", epoch))?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!(
                    "epoch {} created {} ({} nodes)",
                    record.epoch,
                    record.created_at.to_rfc3339(),
                    record.nodes.len()
                );
                for (idx, node) in record.nodes.iter().enumerate() {
                    println!(
                        "  [{}] {} zone={} vnodes={} space={}",
                        idx, node, node.zone, node.nr_vnodes, node.space
                    );
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
