use clap::Parser;
use textgrab_config::{Config, ConfigStore};

mod cli;
mod controller;
mod events;
mod io;
mod logging;

use self::cli::Cli;
use self::controller::AppController;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    };
    let config = effective_config(&store, &cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    AppController::new(store, config)?.run()
}

/// Settings file, then environment, then command line
fn effective_config(store: &ConfigStore, cli: &Cli) -> anyhow::Result<Config> {
    let mut config = store.load_or_init()?;
    config.apply_env();
    cli.apply(&mut config);
    Ok(config)
}
