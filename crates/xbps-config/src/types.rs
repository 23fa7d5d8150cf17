//! The resolved configuration value, merged from every source in the
//! precedence chain.

use std::path::PathBuf;

/// Manual virtual-package alias: virtual name -> real pkgver.
pub type VirtualPkgAlias = (String, String);

/// Configuration merged from defaults, the system config file, the
/// environment override, and CLI flags, in that precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub rootdir: PathBuf,
    pub cachedir: PathBuf,
    pub repositories: Vec<String>,
    pub virtualpkg: Vec<VirtualPkgAlias>,
    pub packages_on_hold: Vec<String>,
    pub fetch_cache_connections: u32,
    pub fetch_timeout_connection: u32,
    pub transaction_frequency_flush: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            rootdir: PathBuf::from("/"),
            cachedir: PathBuf::from("/var/cache/xbps"),
            repositories: Vec::new(),
            virtualpkg: Vec::new(),
            packages_on_hold: Vec::new(),
            fetch_cache_connections: 4,
            fetch_timeout_connection: 30,
            transaction_frequency_flush: 5,
        }
    }
}
