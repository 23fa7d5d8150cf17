//! `PackageRecord` <-> plist codec for a repository's index document.
//!
//! Mirrors the field set `xbps-pkgdb`'s installed-package codec handles,
//! extended with the fields an index entry carries that an installed
//! record does not need on first load (`dirs`, `links`, `conflicts`,
//! `filename_size`, `arch`).

use std::collections::{BTreeMap, BTreeSet};
use xbps_core::package::{FileEntry, PackageKey, PackageRecord};
use xbps_core::plist::Plist;
use xbps_core::version::DepAtom;
use xbps_core::Error;

/// Render a full index document from its package records, keyed by name.
#[must_use]
pub fn render_index(records: &[PackageRecord]) -> Plist {
    let mut dict = BTreeMap::new();
    for rec in records {
        dict.insert(rec.key.name.clone(), render_record(rec));
    }
    Plist::Dict(dict)
}

/// Parse a full index document back into its package records.
///
/// # Errors
/// Returns an error if the document root is not a dict or an entry is
/// missing a required field.
pub fn parse_index(doc: &Plist) -> Result<Vec<PackageRecord>, Error> {
    let dict = doc.as_dict().ok_or_else(|| Error::malformed_plist("repository index root is not a dict", None))?;
    dict.values().map(parse_record).collect()
}

fn render_record(rec: &PackageRecord) -> Plist {
    let mut d = BTreeMap::new();
    d.insert("pkgname".to_string(), Plist::String(rec.key.name.clone()));
    d.insert("version".to_string(), Plist::String(rec.key.version.clone()));
    d.insert("revision".to_string(), Plist::Integer(i64::from(rec.key.revision)));
    d.insert(
        "run_depends".to_string(),
        Plist::Array(rec.dependencies.iter().map(|a| Plist::String(a.render())).collect()),
    );
    d.insert(
        "conflicts".to_string(),
        Plist::Array(rec.conflicts.iter().map(|a| Plist::String(a.render())).collect()),
    );
    d.insert(
        "provides".to_string(),
        Plist::Array(rec.provides.iter().map(|p| Plist::String(p.clone())).collect()),
    );
    d.insert("files".to_string(), Plist::Array(rec.files.iter().map(render_file_entry).collect()));
    d.insert(
        "conf_files".to_string(),
        Plist::Array(rec.conf_files.iter().map(render_file_entry).collect()),
    );
    d.insert("dirs".to_string(), Plist::Array(rec.dirs.iter().map(|p| Plist::String(p.clone())).collect()));
    d.insert(
        "links".to_string(),
        Plist::Array(rec.links.iter().map(|(path, target)| render_link(path, target)).collect()),
    );
    d.insert("installed_size".to_string(), Plist::Integer(rec.installed_size as i64));
    d.insert("filename_size".to_string(), Plist::Integer(rec.filename_size as i64));
    if let Some(arch) = &rec.arch {
        d.insert("architecture".to_string(), Plist::String(arch.clone()));
    }
    Plist::Dict(d)
}

fn parse_record(node: &Plist) -> Result<PackageRecord, Error> {
    let name = node.get("pkgname")?.as_str().unwrap_or_default().to_string();
    let version = node.get("version")?.as_str().unwrap_or_default().to_string();
    let revision = node.get("revision")?.as_integer().unwrap_or(0) as u32;

    let dependencies = node
        .get("run_depends")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| p.as_str().and_then(DepAtom::parse))
        .collect();
    let conflicts = node
        .get("conflicts")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| p.as_str().and_then(DepAtom::parse))
        .collect();
    let provides: BTreeSet<String> = node
        .get("provides")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| p.as_str().map(str::to_string))
        .collect();
    let files = node.get("files")?.as_array().unwrap_or(&[]).iter().filter_map(parse_file_entry).collect();
    let conf_files = node
        .get("conf_files")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(parse_file_entry)
        .collect();
    let dirs = node
        .get("dirs")?
        .as_array()
        .unwrap_or(&[])
        .iter()
        .filter_map(|p| p.as_str().map(str::to_string))
        .collect();
    let links = node.get("links")?.as_array().unwrap_or(&[]).iter().filter_map(parse_link).collect();
    let installed_size = node.get("installed_size")?.as_integer().unwrap_or(0) as u64;
    let filename_size = node.get("filename_size")?.as_integer().unwrap_or(0) as u64;
    let arch = node.get("architecture").ok().and_then(Plist::as_str).map(str::to_string);

    Ok(PackageRecord {
        key: PackageKey { name, version, revision },
        dependencies,
        provides,
        conflicts,
        files,
        dirs,
        links,
        conf_files,
        installed_size,
        filename_size,
        arch,
        repository: None,
    })
}

fn render_file_entry(f: &FileEntry) -> Plist {
    let mut d = BTreeMap::new();
    d.insert("file".to_string(), Plist::String(f.path.clone()));
    d.insert("sha256".to_string(), Plist::String(f.sha256.clone()));
    d.insert("size".to_string(), Plist::Integer(f.size as i64));
    Plist::Dict(d)
}

fn parse_file_entry(node: &Plist) -> Option<FileEntry> {
    Some(FileEntry {
        path: node.get("file").ok()?.as_str()?.to_string(),
        sha256: node.get("sha256").ok()?.as_str()?.to_string(),
        size: node.get("size").ok()?.as_integer()? as u64,
    })
}

fn render_link(path: &str, target: &str) -> Plist {
    let mut d = BTreeMap::new();
    d.insert("file".to_string(), Plist::String(path.to_string()));
    d.insert("target".to_string(), Plist::String(target.to_string()));
    Plist::Dict(d)
}

fn parse_link(node: &Plist) -> Option<(String, String)> {
    Some((
        node.get("file").ok()?.as_str()?.to_string(),
        node.get("target").ok()?.as_str()?.to_string(),
    ))
}
