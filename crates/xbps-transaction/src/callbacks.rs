//! The executor's capability trio: `{on_fetch, on_unpack, on_state}`.
//!
//! Each is an optional closure invoked synchronously on the executor's
//! thread. A no-op default is provided so embedders only wire up the
//! callbacks they care about.

use xbps_downloader::FetchProgress;

/// Whether a callback wants the transaction to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancel {
    Continue,
    Abort,
}

impl Cancel {
    #[must_use]
    pub fn is_abort(self) -> bool {
        matches!(self, Self::Abort)
    }
}

/// Progress within a single archive's unpack pass.
#[derive(Debug, Clone, Copy)]
pub struct UnpackProgress<'a> {
    pub pkgver: &'a str,
    pub entry_path: &'a std::path::Path,
    pub entry_index: usize,
    pub entry_count: usize,
}

/// A phase boundary or a named event, reported to an embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTag {
    TransDownload,
    TransVerify,
    TransRun,
    TransConfigure,
    ConfigFile,
    VerifyFail,
    UnpackFail,
    ConfigureFail,
    RemoveFileHashFail,
}

/// One state-callback invocation: `on_state(tag, description, pkgname?,
/// version?, err?)` from the original C callback contract, reshaped as a
/// struct so new fields don't break callers.
#[derive(Debug, Clone, Copy)]
pub struct StateEvent<'a> {
    pub tag: StateTag,
    pub description: &'a str,
    pub pkgname: Option<&'a str>,
    pub version: Option<&'a str>,
    pub err: Option<&'a str>,
}

type FetchFn<'a> = dyn Fn(FetchProgress<'_>) -> Cancel + 'a;
type UnpackFn<'a> = dyn Fn(UnpackProgress<'_>) -> Cancel + 'a;
type StateFn<'a> = dyn Fn(StateEvent<'_>) -> Cancel + 'a;

/// The handle's registered callback trio. Construct with [`Callbacks::default`]
/// for a no-op set, then set the fields an embedder needs.
#[derive(Default)]
pub struct Callbacks<'a> {
    pub on_fetch: Option<Box<FetchFn<'a>>>,
    pub on_unpack: Option<Box<UnpackFn<'a>>>,
    pub on_state: Option<Box<StateFn<'a>>>,
}

impl<'a> Callbacks<'a> {
    pub(crate) fn fetch(&self, progress: FetchProgress<'_>) -> Cancel {
        self.on_fetch.as_ref().map_or(Cancel::Continue, |f| f(progress))
    }

    pub(crate) fn unpack(&self, progress: UnpackProgress<'_>) -> Cancel {
        self.on_unpack.as_ref().map_or(Cancel::Continue, |f| f(progress))
    }

    pub(crate) fn state(&self, event: StateEvent<'_>) -> Cancel {
        self.on_state.as_ref().map_or(Cancel::Continue, |f| f(event))
    }
}
