//! `xbps`: command-line front-end for the transaction engine.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod output;

use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use xbps_config::{CliOverrides, ConfigLoader};
use xbps_downloader::HttpTransport;
use xbps_pkgdb::PackageDatabase;
use xbps_repository::RepositoryPool;
use xbps_transaction::{ExecutorConfig, Handle};

fn main() -> ExitCode {
    let start = Instant::now();
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let filter = EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();

    output::init(cli.color, cli.quiet);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            output::error(&err.to_string());
            commands::exit_code_for(&err)
        }
    };

    if cli.verbose > 0 {
        output::info(&format!("total time: {}", output::format_duration(start.elapsed())));
    }
    ExitCode::from(code)
}

fn run(cli: &Cli) -> anyhow::Result<u8> {
    let overrides = CliOverrides {
        rootdir: cli.rootdir.clone(),
        cachedir: cli.cachedir.clone(),
        extra_repositories: cli.repository.clone(),
    };
    let config = ConfigLoader::new().resolve(&overrides)?;

    let pkgdb_path = config.rootdir.join("var/db/xbps/pkgdb.plist");
    let db = PackageDatabase::load(&pkgdb_path, config.transaction_frequency_flush)?;

    let mut pool = RepositoryPool::new();
    pool.set_virtualpkg_aliases(config.virtualpkg.iter().cloned().collect());

    let transport = HttpTransport::new(Duration::from_secs(u64::from(config.fetch_timeout_connection)))?;

    let cache_dir = config.cachedir.join("repodata");
    match xbps_repository::sync_index(&mut pool, &config.repositories, &transport, &cache_dir, None) {
        Ok(report) => {
            if cli.verbose > 0 {
                for (uri, message) in &report.failed {
                    output::warning(&format!("repository '{uri}' failed to sync: {message}"));
                }
            }
        }
        Err(xbps_repository::Error::NoRepositories) => {}
        Err(err) => return Err(err.into()),
    }

    let executor_config = ExecutorConfig {
        rootdir: config.rootdir.clone(),
        cache_dir: config.cachedir.clone(),
        force_configure: cli.force,
        force_remove: cli.force,
        ..ExecutorConfig::default()
    };

    let callbacks = commands::build_callbacks();
    let mut handle = Handle::new(pool, db, transport, executor_config).with_callbacks(callbacks);

    commands::dispatch(&cli.command, &mut handle, &config)
}
