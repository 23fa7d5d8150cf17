//! `xbps update`: refresh installed packages to their best available
//! version. With no names given, updates everything not on hold.

use super::CommandError;
use clap::Args;
use xbps_config::ResolvedConfig;
use xbps_core::compare_pkgver;
use xbps_core::version::Pkgver;
use xbps_downloader::Transport;
use xbps_repository::FindKind;
use xbps_resolver::SeedOp;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Package names to update. If omitted, updates every installed
    /// package not named in `PackagesOnHold`.
    pub packages: Vec<String>,
}

/// For an explicit `update <name>` we want the resolver's real error
/// (`UpToDate`/`NotFound`) surfaced; for `update` with no args we silently
/// skip packages that are already current rather than aborting the
/// whole batch on the first one found.
fn names_with_newer_candidate<T: Transport + Sync>(handle: &Handle<'_, T>, config: &ResolvedConfig) -> Vec<String> {
    handle
        .db
        .foreach()
        .filter(|p| !config.packages_on_hold.iter().any(|h| h == &p.record.key.name))
        .filter_map(|p| {
            let candidate = handle.pool.find_best(&p.record.key.name, FindKind::ByName)?;
            let candidate_pkgver = Pkgver::parse(&candidate.pkgver()).ok()?;
            let installed_pkgver = Pkgver::parse(&p.record.pkgver()).ok()?;
            (compare_pkgver(&candidate_pkgver, &installed_pkgver) == std::cmp::Ordering::Greater)
                .then(|| p.record.key.name.clone())
        })
        .collect()
}

pub fn run<T: Transport + Sync>(args: &UpdateArgs, handle: &mut Handle<'_, T>, config: &ResolvedConfig) -> anyhow::Result<u8> {
    let update_all = args.packages.is_empty();
    let names: Vec<String> = if update_all { names_with_newer_candidate(handle, config) } else { args.packages.clone() };

    if names.is_empty() {
        crate::output::info("everything is up to date");
        return Ok(0);
    }

    let seeds: Vec<SeedOp> = names.into_iter().map(SeedOp::Update).collect();
    let document = xbps_resolver::resolve(&seeds, &handle.pool, &handle.db)?;

    if !document.missing.is_empty() {
        return Err(CommandError::MissingDeps(document.missing).into());
    }
    if !document.conflicts.is_empty() {
        return Err(CommandError::Conflicts(document.conflicts).into());
    }
    if document.steps.is_empty() {
        crate::output::info("everything is up to date");
        return Ok(0);
    }

    let report = handle.execute(&document)?;
    for name in &report.updated {
        crate::output::success(&format!("updated {name}"));
    }
    Ok(0)
}
