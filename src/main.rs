mod core;
mod display;
mod link;
mod server;
mod settings;
mod store;
mod txn;

use anyhow::Result;
use clap::{arg, Command};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::settings::Settings;

static CLIENT_NAME: &str = "banklink";

async fn run() -> Result<()> {
    let app = Command::new(CLIENT_NAME)
        .about("The banklink service links bank accounts through Plaid and keeps \
         a local copy of their transaction history.")
        .version("0.1.0")
        .subcommand_required(true)
        .allow_external_subcommands(false)
        .arg(arg!(CONFIG: -c --config [FILE] "Sets a custom config file"))
        .arg(arg!(verbose: -v --verbose "Logs at debug level"))
        .subcommand(Command::new("serve")
            .about("Serves the linking page and the link and sync API."))
        .subcommand(Command::new("links")
            .about("Lists linked institutions."))
        .subcommand(Command::new("transactions")
            .subcommand_required(true)
            .about("Syncs and prints stored transactions.")
            .subcommand(Command::new("sync")
                .about("Pulls the last two years of transactions for every linked institution."))
            .subcommand(Command::new("list")
                .about("Prints all stored transactions, newest first.")));

    let matches = app.get_matches();

    let default_level = if matches.is_present("verbose") {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new(matches.value_of("CONFIG"))?;

    match matches.subcommand() {
        Some(("serve", _serve_matches)) => server::run(settings).await?,
        Some(("links", _link_matches)) => link::run(settings).await?,
        Some(("transactions", txn_matches)) => txn::run(txn_matches, settings).await?,
        None => unreachable!("subcommand is required"),
        _ => unreachable!(),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        println!("{}", err);
        std::process::exit(1);
    }
}
