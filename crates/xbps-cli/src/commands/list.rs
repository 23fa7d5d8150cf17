//! `xbps list`: list installed packages.

use clap::Args;
use xbps_core::package::PackageState;
use xbps_downloader::Transport;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only list packages installed automatically as a dependency.
    #[arg(long)]
    pub automatic: bool,
}

pub fn run<T: Transport + Sync>(args: &ListArgs, handle: &mut Handle<'_, T>) -> anyhow::Result<u8> {
    let mut packages: Vec<_> = handle
        .db
        .foreach()
        .filter(|p| p.state == PackageState::Installed)
        .filter(|p| !args.automatic || p.automatic)
        .collect();
    packages.sort_by(|a, b| a.record.key.name.cmp(&b.record.key.name));

    if packages.is_empty() {
        crate::output::info("no packages installed");
        return Ok(0);
    }

    for installed in packages {
        crate::output::package(&installed.record.key.name, Some(&installed.record.key.version));
    }
    Ok(0)
}
