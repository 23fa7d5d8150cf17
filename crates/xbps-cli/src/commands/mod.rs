//! CLI command surface: argument parsing, exit-code mapping, and
//! dispatch to the per-subcommand implementations.

mod autoremove;
mod install;
mod list;
mod remove;
mod search;
mod show;
mod sync;
mod update;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;
use xbps_config::ResolvedConfig;
use xbps_downloader::Transport;
use xbps_transaction::{Callbacks, Handle};

/// Transaction-document outcomes that have no engine error variant of
/// their own: the resolver records them on the document rather than
/// failing outright, but the CLI still needs a distinct exit code.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("missing dependencies: {0:?}")]
    MissingDeps(Vec<String>),
    #[error("conflicting packages: {0:?}")]
    Conflicts(Vec<(String, String)>),
}

/// A drop-in command-line front-end for the binary package transaction engine.
#[derive(Parser, Debug)]
#[command(name = "xbps", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the install root (default: `/`).
    #[arg(long, global = true)]
    pub rootdir: Option<PathBuf>,

    /// Override the package cache directory.
    #[arg(long, global = true)]
    pub cachedir: Option<PathBuf>,

    /// Add a repository URL on top of the configured set.
    #[arg(long = "repository", short = 'r', global = true)]
    pub repository: Vec<String>,

    /// Skip confirmation prompts and ignore configure/remove failures from a previous run.
    #[arg(long, short = 'f', global = true)]
    pub force: bool,

    /// Suppress informational output.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Increase log verbosity (`-v`, `-vv`).
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Force colored output on or off; default auto-detects the terminal.
    #[arg(long, global = true)]
    pub color: Option<bool>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Install one or more packages and their dependencies.
    Install(install::InstallArgs),
    /// Update installed packages to their best available version.
    Update(update::UpdateArgs),
    /// Remove one or more installed packages.
    Remove(remove::RemoveArgs),
    /// Remove packages that were installed automatically and are no longer depended on.
    Autoremove(autoremove::AutoremoveArgs),
    /// Refresh the cached repository indexes.
    Sync(sync::SyncArgs),
    /// Search the repository pool by name or description.
    Search(search::SearchArgs),
    /// Show a package's full metadata.
    Show(show::ShowArgs),
    /// List installed packages.
    List(list::ListArgs),
}

/// Build the console callback trio wired to the `output` module.
#[must_use]
pub fn build_callbacks<'a>() -> Callbacks<'a> {
    let mut callbacks = Callbacks::default();
    callbacks.on_fetch = Some(Box::new(|progress| {
        crate::output::progress::report_fetch(progress);
        xbps_transaction::Cancel::Continue
    }));
    callbacks.on_unpack = Some(Box::new(|progress| {
        crate::output::progress::report_unpack(progress);
        xbps_transaction::Cancel::Continue
    }));
    callbacks.on_state = Some(Box::new(|event| {
        crate::output::progress::report_state(event);
        xbps_transaction::Cancel::Continue
    }));
    callbacks
}

/// Dispatch a parsed subcommand against a constructed handle.
///
/// # Errors
/// Propagates whatever the dispatched command returns.
pub fn dispatch<T: Transport + Sync>(command: &Commands, handle: &mut Handle<'_, T>, config: &ResolvedConfig) -> anyhow::Result<u8> {
    match command {
        Commands::Install(args) => install::run(args, handle),
        Commands::Update(args) => update::run(args, handle, config),
        Commands::Remove(args) => remove::run(args, handle),
        Commands::Autoremove(args) => autoremove::run(args, handle),
        Commands::Sync(args) => sync::run(args, handle, config),
        Commands::Search(args) => search::run(args, handle),
        Commands::Show(args) => show::run(args, handle),
        Commands::List(args) => list::run(args, handle),
    }
}

/// Map an error surfaced from the engine to the exit code it documents.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<xbps_resolver::Error>() {
        return match err {
            xbps_resolver::Error::AlreadyInstalled(_) | xbps_resolver::Error::UpToDate(_) => libc::EEXIST as u8,
            xbps_resolver::Error::NotFound(_) | xbps_resolver::Error::NotInstalled(_) => libc::ENOENT as u8,
            xbps_resolver::Error::NoRepositories => libc::ENOTSUP as u8,
            xbps_resolver::Error::Repository(_) | xbps_resolver::Error::Core(_) => libc::EIO as u8,
        };
    }
    if let Some(xbps_repository::Error::NoRepositories) = err.downcast_ref::<xbps_repository::Error>() {
        return libc::ENOTSUP as u8;
    }
    if let Some(err) = err.downcast_ref::<CommandError>() {
        return match err {
            CommandError::MissingDeps(_) => libc::ENODEV as u8,
            CommandError::Conflicts(_) => libc::EAGAIN as u8,
        };
    }
    1
}
