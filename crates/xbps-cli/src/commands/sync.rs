//! `xbps sync`: force a fresh fetch of one or all repository indexes.
//!
//! The engine already refreshes every configured repository before any
//! command runs; this subcommand exists for an operator who wants to
//! force that refresh (and see its report) without also running a
//! transaction.

use clap::Args;
use xbps_config::ResolvedConfig;
use xbps_downloader::Transport;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Refresh only the repository at this URI instead of every configured one.
    pub uri: Option<String>,
}

pub fn run<T: Transport + Sync>(args: &SyncArgs, handle: &mut Handle<'_, T>, config: &ResolvedConfig) -> anyhow::Result<u8> {
    let cache_dir = config.cachedir.join("repodata");
    let report = xbps_repository::sync_index(&mut handle.pool, &config.repositories, &handle.transport, &cache_dir, args.uri.as_deref())?;

    for uri in &report.refreshed {
        crate::output::success(&format!("synced {uri}"));
    }
    for uri in &report.unchanged {
        crate::output::info(&format!("{uri} is unchanged"));
    }
    for (uri, message) in &report.failed {
        crate::output::warning(&format!("{uri} failed: {message}"));
    }
    Ok(0)
}
