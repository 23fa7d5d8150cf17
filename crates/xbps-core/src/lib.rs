//! Core types shared across the transaction engine: version algebra, the
//! package data model, property-list serialization, and the error
//! taxonomy every other crate converts into at its boundary.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod package;
pub mod plist;
pub mod util;
pub mod version;

pub use error::{Error, Result};
pub use package::{FileEntry, InstalledPackage, PackageKey, PackageRecord, PackageState};
pub use plist::Plist;
pub use version::{compare_pkgver, compare_versions, match_pattern, DepAtom, MatchResult, Pkgver};

/// Global allocator, matching the engine's ambient allocation stack.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
