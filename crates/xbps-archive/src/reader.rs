//! Reads a binary package archive: a tar-family stream whose two
//! metadata entries (`props.plist`, `files.plist`) may appear anywhere
//! in the stream but must both precede the first payload entry from the
//! caller's point of view. The reader buffers the whole stream once so
//! entry order in the underlying file never constrains the caller.

use crate::error::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-entry metadata the executor needs to unpack a payload file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub path: PathBuf,
    pub size: u64,
    pub mode: u32,
    pub link_target: Option<PathBuf>,
    pub is_dir: bool,
    pub is_symlink: bool,
}

const PROPS_ENTRY: &str = "props.plist";
const FILES_ENTRY: &str = "files.plist";

/// A fully-read package archive: metadata entries available via
/// accessors, payload entries in their original stream order.
#[derive(Debug)]
pub struct PackageArchive {
    props: Vec<u8>,
    files: Vec<u8>,
    payload: Vec<(EntryHeader, Vec<u8>)>,
}

impl PackageArchive {
    /// Open and fully buffer a package archive, transparently
    /// decompressing gzip or xz if the path's extension indicates it.
    ///
    /// # Errors
    /// Returns an error if either metadata entry is absent, or an entry
    /// cannot be read.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| xbps_core::Error::io(path, e))?;
        let reader: Box<dyn Read> = match Compression::from_path(path) {
            Compression::Plain => Box::new(file),
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(file)),
        };
        Self::from_reader(reader, path)
    }

    fn from_reader(reader: impl Read, path: &Path) -> Result<Self> {
        let mut archive = tar::Archive::new(reader);
        let mut props = None;
        let mut files = None;
        let mut payload = Vec::new();

        for entry in archive.entries().map_err(|e| xbps_core::Error::io(path, e))? {
            let mut entry = entry.map_err(|e| xbps_core::Error::io(path, e))?;
            let entry_path = entry
                .path()
                .map_err(|e| Error::MalformedEntry { path: path.to_path_buf(), message: e.to_string() })?
                .to_path_buf();
            let name = entry_path.to_string_lossy().trim_start_matches("./").to_string();

            let header = EntryHeader {
                path: entry_path.clone(),
                size: entry.header().size().unwrap_or(0),
                mode: entry.header().mode().unwrap_or(0o644),
                link_target: entry.link_name().ok().flatten().map(|p| p.to_path_buf()),
                is_dir: entry.header().entry_type().is_dir(),
                is_symlink: entry.header().entry_type().is_symlink(),
            };

            let mut body = Vec::with_capacity(header.size as usize);
            entry.read_to_end(&mut body).map_err(|e| xbps_core::Error::io(path, e))?;

            match name.as_str() {
                PROPS_ENTRY => props = Some(body),
                FILES_ENTRY => files = Some(body),
                _ => payload.push((header, body)),
            }
        }

        let props = props.ok_or_else(|| Error::MissingMetadata { path: path.to_path_buf(), entry: PROPS_ENTRY })?;
        let files = files.ok_or_else(|| Error::MissingMetadata { path: path.to_path_buf(), entry: FILES_ENTRY })?;
        debug!(entries = payload.len(), "buffered package archive");

        Ok(Self { props, files, payload })
    }

    #[must_use]
    pub fn props(&self) -> &[u8] {
        &self.props
    }

    #[must_use]
    pub fn files(&self) -> &[u8] {
        &self.files
    }

    /// Payload entries in their original on-disk stream order.
    #[must_use]
    pub fn payload(&self) -> &[(EntryHeader, Vec<u8>)] {
        &self.payload
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Plain,
    Gzip,
    Xz,
}

impl Compression {
    fn from_path(path: &Path) -> Self {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_lowercase();
        if name.ends_with(".gz") || name.ends_with(".tgz") {
            Self::Gzip
        } else if name.ends_with(".xz") || name.ends_with(".txz") {
            Self::Xz
        } else {
            Self::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn metadata_available_regardless_of_stream_position() {
        let bytes = build_archive(&[
            ("./usr/bin/app", b"binary-contents"),
            ("files.plist", b"<files/>"),
            ("props.plist", b"<props/>"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0_1.x86_64.xbps");
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();

        let archive = PackageArchive::open(&path).unwrap();
        assert_eq!(archive.props(), b"<props/>");
        assert_eq!(archive.files(), b"<files/>");
        assert_eq!(archive.payload().len(), 1);
        assert_eq!(archive.payload()[0].1, b"binary-contents");
    }

    #[test]
    fn missing_metadata_entry_is_an_error() {
        let bytes = build_archive(&[("props.plist", b"<props/>")]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.xbps");
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();

        let err = PackageArchive::open(&path).unwrap_err();
        assert!(matches!(err, Error::MissingMetadata { entry: "files.plist", .. }));
    }

    #[test]
    fn payload_entries_preserve_stream_order() {
        let bytes = build_archive(&[
            ("props.plist", b"<props/>"),
            ("files.plist", b"<files/>"),
            ("./a", b"a"),
            ("./b", b"b"),
            ("./c", b"c"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.xbps");
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();

        let archive = PackageArchive::open(&path).unwrap();
        let names: Vec<_> = archive.payload().iter().map(|(h, _)| h.path.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("./a"), PathBuf::from("./b"), PathBuf::from("./c")]);
    }
}
