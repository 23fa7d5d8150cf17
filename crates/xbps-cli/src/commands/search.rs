//! `xbps search`: look up packages in the repository pool by name
//! substring.

use clap::Args;
use xbps_downloader::Transport;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Substring to match against package names.
    pub pattern: String,
}

pub fn run<T: Transport + Sync>(args: &SearchArgs, handle: &mut Handle<'_, T>) -> anyhow::Result<u8> {
    let mut hits: Vec<_> = handle
        .pool
        .repositories()
        .iter()
        .flat_map(xbps_repository::Repository::iter)
        .filter(|rec| rec.key.name.contains(&args.pattern))
        .collect();
    hits.sort_by(|a, b| a.key.name.cmp(&b.key.name));
    hits.dedup_by(|a, b| a.key.name == b.key.name);

    if hits.is_empty() {
        crate::output::info(&format!("no matches for '{}'", args.pattern));
        return Ok(0);
    }

    for rec in hits {
        let installed = handle.db.contains(&rec.key.name);
        let marker = if installed { "[*]" } else { "[ ]" };
        crate::output::package(&format!("{marker} {}", rec.key.name), Some(&rec.key.version));
    }
    Ok(0)
}
