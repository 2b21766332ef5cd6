//! kfs: command-line access to a Kademlia File Store table.
//!
//! ```text
//! kfs --table ./store write <key> photo.jpg
//! kfs --table ./store read <key> - > photo.jpg
//! kfs --table ./store list --index 42
//! kfs probe
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=kfs=debug` for S-bucket activity.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kfs::{BTable, KfsOptions, SBucketSelector, StoreBackend};

/// Kademlia File Store
#[derive(Parser, Debug)]
#[command(name = "kfs", version)]
#[command(about = "Store, fetch and inspect files in a KFS table")]
struct Cli {
    /// Table directory (".kfs" is appended when missing)
    #[arg(short, long, default_value = "kfs", global = true)]
    table: PathBuf,

    /// S-bucket storage backend
    #[arg(short, long, value_enum, default_value_t = Backend::Log, global = true)]
    backend: Backend,

    /// Fsync every write
    #[arg(long, global = true)]
    sync: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    Log,
    Memory,
    Rocksdb,
}

impl Backend {
    fn store_backend(self) -> Result<StoreBackend> {
        match self {
            Backend::Log => Ok(StoreBackend::Log),
            Backend::Memory => Ok(StoreBackend::Memory),
            #[cfg(feature = "rocksdb")]
            Backend::Rocksdb => Ok(StoreBackend::RocksDb),
            #[cfg(not(feature = "rocksdb"))]
            Backend::Rocksdb => bail!("kfs was built without the \"rocksdb\" feature"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the output of every key and path helper
    Probe {
        /// Path checked for existence
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Store a file ("-" reads stdin)
    Write {
        key: String,
        #[arg(default_value = "-")]
        input: String,
    },
    /// Fetch a file ("-" writes stdout)
    Read {
        key: String,
        #[arg(default_value = "-")]
        output: String,
    },
    /// Delete a file
    Unlink { key: String },
    /// Check whether a file is stored
    Exists { key: String },
    /// Space used per S-bucket, as JSON
    Stat(Selector),
    /// Files per S-bucket, as JSON
    List(Selector),
    /// Compact every S-bucket
    Flush,
}

#[derive(Args, Debug)]
struct Selector {
    /// Select the S-bucket this key routes to
    #[arg(conflicts_with = "index")]
    key: Option<String>,

    /// Select an S-bucket by index
    #[arg(short, long)]
    index: Option<usize>,
}

impl Selector {
    fn as_selector(&self) -> SBucketSelector<'_> {
        match (&self.key, self.index) {
            (Some(key), _) => SBucketSelector::Key(key),
            (None, Some(index)) => SBucketSelector::Index(index),
            (None, None) => SBucketSelector::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kfs=warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Probe needs no table
    if let Command::Probe { path } = &cli.command {
        print_probe(path);
        return Ok(());
    }

    let options = KfsOptions::new()
        .with_backend(cli.backend.store_backend()?)
        .with_sync_writes(cli.sync);
    // Only `write` may create a new table
    let opened = if matches!(cli.command, Command::Write { .. }) {
        BTable::open(&cli.table, options)
    } else {
        BTable::open_existing(&cli.table, options)
    };
    let table = opened.with_context(|| format!("failed to open table {}", cli.table.display()))?;

    run(&table, cli.command)?;
    table.close()?;
    Ok(())
}

fn run(table: &BTable, command: Command) -> Result<()> {
    match command {
        Command::Probe { path } => print_probe(&path),
        Command::Write { key, input } => {
            let mut stream = table.create_write_stream(&key)?;
            let copied = if input == "-" {
                io::copy(&mut io::stdin().lock(), &mut stream)
            } else {
                let mut file = File::open(&input).with_context(|| format!("cannot open {}", input))?;
                io::copy(&mut file, &mut stream)
            };
            match copied {
                Ok(bytes) => {
                    let chunks = stream.finish()?;
                    info!("[kfs] Stored {} bytes in {} chunks under {}", bytes, chunks, key);
                }
                Err(err) => {
                    stream.destroy()?;
                    return Err(err).context("write failed");
                }
            }
        }
        Command::Read { key, output } => {
            let mut stream = table.create_read_stream(&key)?;
            if output == "-" {
                io::copy(&mut stream, &mut io::stdout().lock())?;
            } else {
                let mut file = File::create(&output).with_context(|| format!("cannot create {}", output))?;
                io::copy(&mut stream, &mut file)?;
                file.flush()?;
            }
        }
        Command::Unlink { key } => table.unlink(&key)?,
        Command::Exists { key } => {
            println!("{}", table.exists(&key)?);
        }
        Command::Stat(selector) => {
            let stats = table.stat(selector.as_selector())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::List(selector) => {
            let lists = table.list(selector.as_selector())?;
            println!("{}", serde_json::to_string_pretty(&lists)?);
        }
        Command::Flush => table.flush()?,
    }
    Ok(())
}

fn print_probe(path: &Path) {
    for line in kfs::probe::probe_lines(path) {
        println!("{}", line);
    }
}
