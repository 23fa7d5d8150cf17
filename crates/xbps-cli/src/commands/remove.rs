//! `xbps remove`: remove one or more installed packages, optionally
//! pulling in every installed package that transitively depends on them.

use super::CommandError;
use clap::Args;
use std::collections::BTreeSet;
use xbps_downloader::Transport;
use xbps_pkgdb::PackageDatabase;
use xbps_resolver::SeedOp;
use xbps_transaction::Handle;

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Package names to remove.
    #[arg(required = true)]
    pub packages: Vec<String>,

    /// Also remove every installed package that depends on a removed one.
    #[arg(long, short = 'R')]
    pub recursive: bool,
}

/// Breadth-first closure of installed packages whose `run_depends`
/// transitively name one of `roots`.
fn dependents_of(db: &PackageDatabase, roots: &[String]) -> BTreeSet<String> {
    let mut closure: BTreeSet<String> = roots.iter().cloned().collect();
    loop {
        let mut added = false;
        for installed in db.foreach() {
            let name = &installed.record.key.name;
            if closure.contains(name) {
                continue;
            }
            let depends_on_closure = installed
                .record
                .dependencies
                .iter()
                .filter_map(xbps_core::version::DepAtom::name)
                .any(|dep_name| closure.contains(dep_name));
            if depends_on_closure {
                closure.insert(name.clone());
                added = true;
            }
        }
        if !added {
            break;
        }
    }
    closure
}

pub fn run<T: Transport + Sync>(args: &RemoveArgs, handle: &mut Handle<'_, T>) -> anyhow::Result<u8> {
    let targets: Vec<String> = if args.recursive {
        dependents_of(&handle.db, &args.packages).into_iter().collect()
    } else {
        args.packages.clone()
    };

    let seeds: Vec<SeedOp> = targets.iter().cloned().map(SeedOp::Remove).collect();
    let document = xbps_resolver::resolve(&seeds, &handle.pool, &handle.db)?;

    if !document.conflicts.is_empty() {
        return Err(CommandError::Conflicts(document.conflicts).into());
    }

    if !handle.config.force_remove && !crate::output::confirm(&format!("remove {} package(s)?", document.steps.len()), false) {
        crate::output::info("aborted");
        return Ok(0);
    }

    let report = handle.execute(&document)?;
    for name in &report.removed {
        crate::output::success(&format!("removed {name}"));
    }
    Ok(0)
}
