use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use console::style;
use log::{error, info};
use tokio::sync::Mutex;

use notepad::{
    App, Cli, Config, FileBackend, Notepad, Result, Store, SystemClock, TerminalNotifier,
};

pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load_or_init(&path)?,
        None => Config::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    info!("Using data directory {}", config.data_dir.display());

    let store = Store::load(FileBackend::open(&config.data_dir)?);
    let notepad = Notepad::new(store, Arc::new(SystemClock), Arc::new(TerminalNotifier));

    let app = App::new(
        Arc::new(Mutex::new(notepad)),
        config,
        cli.pin,
        cli.verbose,
    );
    app.run(cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");
    let outcome = run(cli).await;
    info!("Application shutting down");

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", style(e.to_string()).red());
            ExitCode::FAILURE
        }
    }
}
