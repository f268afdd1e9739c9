#![doc = include_str!("../README.md")]

mod config;
mod store;
mod telemetry;

use std::thread::scope;

use anyhow::anyhow;
use clap::Parser;
use config::{CliArgs, Command, Config};
use seqid::SequenceManager;
use store::JsonStore;
use telemetry::init_telemetry;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    init_telemetry(config.log_format)?;

    let store = JsonStore::open(&config.store)?;
    let manager = SequenceManager::default();
    log_startup_info(&config, &store);

    let values = match &config.command {
        Command::Id {
            table,
            column,
            force: false,
        } => {
            let mut ids = allocate_parallel(config.threads, config.count, || {
                manager.new_id(&store, table, column)
            })?;
            ids.sort_unstable();
            for &id in &ids {
                store.record_id(table, column, id);
            }
            ids.iter().map(i64::to_string).collect()
        }
        Command::Id {
            table,
            column,
            force: true,
        } => {
            let mut ids = Vec::with_capacity(config.count);
            for _ in 0..config.count {
                let id = manager.new_id_force(&store, table, column)?;
                store.record_id(table, column, id);
                ids.push(id.to_string());
            }
            ids
        }
        Command::Sno {
            table,
            column,
            chunks,
        } => {
            let mut snos = allocate_parallel(config.threads, config.count, || {
                manager.new_sno_from_formats(&store, table, column, chunks)
            })?;
            snos.sort_unstable_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            for sno in &snos {
                store.record_text(table, column, sno.clone());
            }
            snos
        }
    };

    for value in &values {
        println!("{value}");
    }

    if config.show {
        let snapshot = serde_json::json!({
            "ids": manager.show_current_ids(None, None)?,
            "snos": manager.show_current_snos::<&str>(None, None, None)?,
        });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if config.dry_run {
        tracing::info!(count = values.len(), "dry run, store left untouched");
    } else {
        store.save()?;
        tracing::info!(count = values.len(), path = %store.path().display(), "store saved");
    }
    Ok(())
}

/// Runs `allocate` `count` times spread over `threads` scoped threads, all
/// sharing the same manager.
fn allocate_parallel<T, F>(threads: usize, count: usize, allocate: F) -> anyhow::Result<Vec<T>>
where
    T: Send,
    F: Fn() -> seqid::Result<T> + Sync,
{
    scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let share = count / threads + usize::from(worker < count % threads);
                let allocate = &allocate;
                s.spawn(move || (0..share).map(|_| allocate()).collect::<seqid::Result<Vec<T>>>())
            })
            .collect();

        let mut values = Vec::with_capacity(count);
        for handle in handles {
            let batch = handle
                .join()
                .map_err(|_| anyhow!("allocation thread panicked"))??;
            values.extend(batch);
        }
        Ok(values)
    })
}

fn log_startup_info(config: &Config, store: &JsonStore) {
    if cfg!(debug_assertions) {
        tracing::debug!(
            "Running against {} with full config: {:#?}",
            store.path().display(),
            config
        );
    } else {
        tracing::debug!(
            "Running against {} with {} threads",
            store.path().display(),
            config.threads
        );
    }
}
