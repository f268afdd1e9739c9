use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};

/// Runtime configuration for the `seqid` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "seqid",
    version,
    about = "Allocate table IDs and formatted serial numbers against a JSON store"
)]
pub struct CliArgs {
    /// Path of the JSON file acting as the backing store.
    ///
    /// The file maps `table -> column -> { ids, texts }`. It is created on
    /// first save if missing.
    ///
    /// Environment variable: `SEQID_STORE`
    #[arg(long, env = "SEQID_STORE", default_value = "seqid-store.json")]
    pub store: PathBuf,

    /// Number of threads sharing the allocation work.
    ///
    /// All threads allocate from the same in-memory counter, so the result
    /// is the same set of values as a single thread would produce.
    ///
    /// Environment variable: `SEQID_THREADS`
    #[arg(long, env = "SEQID_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Log output format, written to stderr. Filtered by `RUST_LOG`.
    ///
    /// Environment variable: `SEQID_LOG_FORMAT`
    #[arg(long, env = "SEQID_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// How many values to allocate.
    #[arg(short, long, global = true, default_value_t = 1)]
    pub count: usize,

    /// Print the in-memory counters as JSON after allocating.
    #[arg(long, global = true, default_value_t = false)]
    pub show: bool,

    /// Do not write allocated values back to the store.
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Allocate integer IDs for `TABLE.COLUMN`
    Id {
        table: String,
        column: String,

        /// Read `MAX(column)` from the store for every ID instead of using
        /// the cached counter.
        #[arg(short, long, default_value_t = false)]
        force: bool,
    },

    /// Allocate serial numbers for `TABLE.COLUMN`
    Sno {
        table: String,
        column: String,

        /// A chunk as `NAME=FORMAT`, e.g. `Prefix=Text[INV][3]`. Repeat in
        /// output order.
        #[arg(long = "chunk", value_parser = parse_chunk, required = true)]
        chunks: Vec<(String, String)>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: PathBuf,
    pub threads: usize,
    pub log_format: LogFormat,
    pub count: usize,
    pub show: bool,
    pub dry_run: bool,
    pub command: Command,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.threads == 0 {
            bail!("SEQID_THREADS must be greater than 0");
        }

        if args.count == 0 {
            bail!("--count must be greater than 0");
        }

        // Forced IDs are only unique if each one is persisted before the
        // next read.
        if let Command::Id { force: true, .. } = args.command {
            if args.threads > 1 {
                bail!(
                    "--force reads the store for every ID and cannot run on {} threads",
                    args.threads
                );
            }
            if args.dry_run && args.count > 1 {
                bail!("--force with --dry-run would return the same ID {} times", args.count);
            }
        }

        Ok(Self {
            store: args.store,
            threads: args.threads.min(args.count),
            log_format: args.log_format,
            count: args.count,
            show: args.show,
            dry_run: args.dry_run,
            command: args.command,
        })
    }
}

fn parse_chunk(raw: &str) -> Result<(String, String), String> {
    let (name, format) = raw
        .split_once('=')
        .ok_or_else(|| format!("`{raw}` is not NAME=FORMAT"))?;
    if name.is_empty() {
        return Err(format!("`{raw}` has an empty chunk name"));
    }
    Ok((name.to_owned(), format.to_owned()))
}
