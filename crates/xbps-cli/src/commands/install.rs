//! `xbps install`: resolve and execute an install transaction.

use super::CommandError;
use clap::Args;
use xbps_downloader::Transport;
use xbps_resolver::SeedOp;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Package names or `name>=version`-style patterns to install.
    #[arg(required = true)]
    pub packages: Vec<String>,
}

pub fn run<T: Transport + Sync>(args: &InstallArgs, handle: &mut Handle<'_, T>) -> anyhow::Result<u8> {
    let seeds: Vec<SeedOp> = args.packages.iter().cloned().map(SeedOp::Install).collect();
    let document = xbps_resolver::resolve(&seeds, &handle.pool, &handle.db)?;

    if !document.missing.is_empty() {
        return Err(CommandError::MissingDeps(document.missing).into());
    }
    if !document.conflicts.is_empty() {
        return Err(CommandError::Conflicts(document.conflicts).into());
    }

    crate::output::info(&format!(
        "{} to install, {} download",
        document.steps.len(),
        crate::output::format_bytes(document.download_size)
    ));

    let report = handle.execute(&document)?;
    for name in &report.installed {
        crate::output::success(&format!("installed {name}"));
    }
    Ok(0)
}
