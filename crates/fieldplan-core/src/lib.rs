//! Scheduling core of the fieldplan farm dashboard: canonical task model,
//! month-grid builder, temporal filters, and the view-controller refresh
//! contract, plus the CLI driver around them.

pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod datastore;
pub mod datetime;
pub mod filter;
pub mod normalize;
pub mod render;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting fieldplan CLI");

    let cfg = config::Config::load(cli.config.as_deref())?;
    debug!(scope = %cfg.default_scope(), "config loaded");

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let store = datastore::DataStore::open(&data_dir)
        .with_context(|| format!("failed to open datastore at {}", data_dir.display()))?;

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(cli.rest)?;

    commands::dispatch(&store, &cfg, &mut renderer, cli.scope.as_deref(), inv)?;

    info!("done");
    Ok(())
}
