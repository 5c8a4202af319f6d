mod app;
mod case_map;
mod cli;
mod config;
mod drift;
mod error;
mod files;
mod keeper;
mod logging;
mod monitor;
mod plugins;
mod reconcile;
mod snapshot;
mod starfield;
mod ui;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
