//! `xbps autoremove`: remove automatically-installed packages that
//! nothing depends on anymore.

use clap::Args;
use xbps_downloader::Transport;
use xbps_resolver::SeedOp;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct AutoremoveArgs {}

pub fn run<T: Transport + Sync>(_args: &AutoremoveArgs, handle: &mut Handle<'_, T>) -> anyhow::Result<u8> {
    let document = xbps_resolver::resolve(&[SeedOp::Autoremove], &handle.pool, &handle.db)?;

    if document.steps.is_empty() {
        crate::output::info("no orphaned packages");
        return Ok(0);
    }

    for step in &document.steps {
        crate::output::package(&step.record.key.name, Some(&step.record.key.version));
    }
    if !handle.config.force_remove && !crate::output::confirm(&format!("remove {} orphaned package(s)?", document.steps.len()), false) {
        crate::output::info("aborted");
        return Ok(0);
    }

    let report = handle.execute(&document)?;
    for name in &report.removed {
        crate::output::success(&format!("removed {name}"));
    }
    Ok(0)
}
