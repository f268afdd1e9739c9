//! Log output for the `seqid` binary.
//!
//! Everything goes to stderr so that stdout carries only allocated values
//! and `--show` output. The filter comes from `RUST_LOG` and defaults to
//! `info`; `seqid=debug` shows counter hydration and cycle resets.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LogFormat;

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_target(false)
                    .with_timer(ChronoLocal::rfc_3339()),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_thread_ids(true)
                    .with_timer(ChronoLocal::rfc_3339()),
            )
            .try_init()?,
    }

    Ok(())
}
