use anyhow::Result;
use chrono::Local;
use clap::{CommandFactory, Parser};
use sqlpkg::cli::{Cli, Runner};
use sqlpkg::config::get_app_config;
use sqlpkg::database::sqlcmd::SqlCmd;
use sqlpkg::package::{PackageTool, SqlPackage, TOOL_MISSING_EXIT_CODE};
use sqlpkg::state::AppState;
use sqlpkg::utils::format_elapsed;
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if cli.arguments.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let config = match get_app_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            anyhow::bail!(e);
        }
    };

    let tool = SqlPackage::new(&config);
    match tool.probe().await {
        Ok(version) => info!("Using {} {}", tool.program(), version),
        Err(e) => {
            error!("{} is not available: {:#}", tool.program(), e);
            eprintln!("Install it with: dotnet tool install -g microsoft.sqlpackage");
            std::process::exit(TOOL_MISSING_EXIT_CODE);
        }
    }

    let state = match AppState::import(&cli.arguments) {
        Ok(state) => state,
        Err(e) => {
            error!("Invalid arguments: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = SqlCmd::new(&config);
    let runner = Runner::new(&config, &tool, &catalog, cli.dry_run);

    let started = Instant::now();
    info!("Started {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    let exit_code = match runner.run(&state).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    info!(
        "Finished {} (elapsed {}), exit code {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        format_elapsed(started.elapsed()),
        exit_code
    );
    std::process::exit(exit_code);
}
