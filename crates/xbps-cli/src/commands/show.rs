//! `xbps show`: print a package's full metadata, preferring the
//! installed record over the repository candidate when both exist.

use clap::Args;
use xbps_downloader::Transport;
use xbps_repository::FindKind;
use xbps_resolver::Error as ResolverError;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Package name.
    pub name: String,
}

pub fn run<T: Transport + Sync>(args: &ShowArgs, handle: &mut Handle<'_, T>) -> anyhow::Result<u8> {
    if let Some(installed) = handle.db.get(&args.name) {
        print_table(&installed.record, Some(installed.automatic));
        return Ok(0);
    }

    let record = handle
        .pool
        .find_best(&args.name, FindKind::ByName)
        .cloned()
        .ok_or_else(|| ResolverError::NotFound(args.name.clone()))?;
    print_table(&record, None);
    Ok(0)
}

fn print_table(record: &xbps_core::PackageRecord, automatic: Option<bool>) {
    let table = crate::output::table::kv_table([
        ("pkgver", record.pkgver()),
        ("architecture", record.arch.clone().unwrap_or_else(|| "noarch".to_string())),
        ("installed_size", crate::output::format_bytes(record.installed_size)),
        ("filename_size", crate::output::format_bytes(record.filename_size)),
        ("run_depends", record.dependencies.iter().map(|d| d.render()).collect::<Vec<_>>().join(", ")),
        ("provides", record.provides.iter().cloned().collect::<Vec<_>>().join(", ")),
        ("repository", record.repository.clone().unwrap_or_default()),
        ("automatic", automatic.map_or_else(|| "n/a".to_string(), |a| a.to_string())),
    ]);
    table.print();
}
