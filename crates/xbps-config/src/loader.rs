//! Hierarchical configuration loader, collapsed to the precedence chain
//! this engine actually needs: `Defaults -> /etc/xbps/xbps.conf ->
//! $XBPS_CONF_PLIST override -> CLI flags`.

use crate::error::{Error, Result};
use crate::types::ResolvedConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a value in the resolved configuration came from, in ascending
/// precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    Defaults,
    SystemFile,
    EnvOverride,
    Cli,
}

impl ConfigSource {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::SystemFile => "/etc/xbps/xbps.conf",
            Self::EnvOverride => "XBPS_CONF_PLIST override",
            Self::Cli => "command-line arguments",
        }
    }
}

/// CLI-supplied overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub rootdir: Option<PathBuf>,
    pub cachedir: Option<PathBuf>,
    pub extra_repositories: Vec<String>,
}

impl CliOverrides {
    pub fn apply_to(&self, resolved: &mut ResolvedConfig) {
        if let Some(ref rootdir) = self.rootdir {
            resolved.rootdir = rootdir.clone();
        }
        if let Some(ref cachedir) = self.cachedir {
            resolved.cachedir = cachedir.clone();
        }
        resolved.repositories.extend(self.extra_repositories.iter().cloned());
    }
}

/// Loads and merges the configuration chain.
#[derive(Debug)]
pub struct ConfigLoader {
    system_path: PathBuf,
    env_override_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Build a loader rooted at the standard system config path,
    /// honoring `XBPS_CONF_PLIST` if set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system_path: PathBuf::from("/etc/xbps/xbps.conf"),
            env_override_path: std::env::var_os("XBPS_CONF_PLIST").map(PathBuf::from),
        }
    }

    /// Build a loader against an explicit system config path (for tests).
    #[must_use]
    pub fn with_system_path(system_path: impl Into<PathBuf>) -> Self {
        Self { system_path: system_path.into(), env_override_path: None }
    }

    #[must_use]
    pub fn with_env_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_override_path = Some(path.into());
        self
    }

    /// Resolve the full precedence chain into one value.
    ///
    /// # Errors
    /// Returns an error if a present config file fails to parse.
    pub fn resolve(&self, cli: &CliOverrides) -> Result<ResolvedConfig> {
        let mut resolved = ResolvedConfig::default();

        if self.system_path.exists() {
            let merged = load_file(&self.system_path)?;
            apply(&mut resolved, merged, ConfigSource::SystemFile);
        }

        if let Some(ref path) = self.env_override_path {
            if path.exists() {
                let merged = load_file(path)?;
                apply(&mut resolved, merged, ConfigSource::EnvOverride);
            }
        }

        cli.apply_to(&mut resolved);
        debug!(rootdir = %resolved.rootdir.display(), "configuration resolved");
        Ok(resolved)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// One key=value entry parsed from a config file; multi-valued keys
/// appear as multiple entries with the same key.
struct ParsedEntry {
    key: String,
    value: String,
}

fn load_file(path: &Path) -> Result<Vec<ParsedEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| xbps_core::Error::io(path, e))?;
    Ok(parse(&content, path))
}

fn parse(content: &str, path: &Path) -> Vec<ParsedEntry> {
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(path = %path.display(), line, "ignoring malformed config line");
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim().to_string();
        if !is_recognized_key(&key) {
            warn!(path = %path.display(), %key, "ignoring unrecognized config key");
        }
        entries.push(ParsedEntry { key, value });
    }
    entries
}

const RECOGNIZED_KEYS: &[&str] = &[
    "rootdir",
    "cachedir",
    "repository",
    "virtualpkg",
    "PackagesOnHold",
    "FetchCacheConnections",
    "FetchTimeoutConnection",
    "TransactionFrequencyFlush",
];

fn is_recognized_key(key: &str) -> bool {
    RECOGNIZED_KEYS.contains(&key)
}

fn apply(resolved: &mut ResolvedConfig, entries: Vec<ParsedEntry>, source: ConfigSource) {
    for entry in entries {
        match entry.key.as_str() {
            "rootdir" => {
                if Path::new(&entry.value).is_absolute() {
                    resolved.rootdir = PathBuf::from(entry.value);
                } else {
                    warn!(value = %entry.value, source = source.description(), "rootdir must be absolute, ignoring");
                }
            }
            "cachedir" => resolved.cachedir = PathBuf::from(entry.value),
            "repository" => resolved.repositories.push(entry.value),
            "virtualpkg" => {
                if let Some((name, pkgver)) = entry.value.split_once(':') {
                    resolved.virtualpkg.push((name.to_string(), pkgver.to_string()));
                } else {
                    warn!(value = %entry.value, "malformed virtualpkg entry, expected '<vname>:<real-pkgver>'");
                }
            }
            "PackagesOnHold" => resolved.packages_on_hold.push(entry.value),
            "FetchCacheConnections" => {
                if let Ok(n) = entry.value.parse() {
                    resolved.fetch_cache_connections = n;
                }
            }
            "FetchTimeoutConnection" => {
                if let Ok(n) = entry.value.parse() {
                    resolved.fetch_timeout_connection = n;
                }
            }
            "TransactionFrequencyFlush" => {
                if let Ok(n) = entry.value.parse() {
                    resolved.transaction_frequency_flush = n;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_conf(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xbps.conf");
        std::fs::File::create(&path).unwrap().write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_used_when_no_file_present() {
        let loader = ConfigLoader::with_system_path("/nonexistent/xbps.conf");
        let resolved = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn system_file_overrides_defaults() {
        let (_dir, path) = write_conf("rootdir=/opt/root\ncachedir=/opt/cache\n# comment\n");
        let loader = ConfigLoader::with_system_path(&path);
        let resolved = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(resolved.rootdir, PathBuf::from("/opt/root"));
        assert_eq!(resolved.cachedir, PathBuf::from("/opt/cache"));
    }

    #[test]
    fn multi_valued_keys_accumulate() {
        let (_dir, path) = write_conf("repository=https://a\nrepository=https://b\n");
        let loader = ConfigLoader::with_system_path(&path);
        let resolved = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(resolved.repositories, vec!["https://a", "https://b"]);
    }

    #[test]
    fn relative_rootdir_is_rejected() {
        let (_dir, path) = write_conf("rootdir=relative/path\n");
        let loader = ConfigLoader::with_system_path(&path);
        let resolved = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(resolved.rootdir, ResolvedConfig::default().rootdir);
    }

    #[test]
    fn virtualpkg_entries_parse_into_pairs() {
        let (_dir, path) = write_conf("virtualpkg=vname:real-1.0_1\n");
        let loader = ConfigLoader::with_system_path(&path);
        let resolved = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(resolved.virtualpkg, vec![("vname".to_string(), "real-1.0_1".to_string())]);
    }

    #[test]
    fn env_override_takes_precedence_over_system_file() {
        let (_dir, system_path) = write_conf("rootdir=/system\n");
        let (_dir2, env_path) = write_conf("rootdir=/env-override\n");
        let loader = ConfigLoader::with_system_path(&system_path).with_env_override(&env_path);
        let resolved = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(resolved.rootdir, PathBuf::from("/env-override"));
    }

    #[test]
    fn cli_overrides_win_over_every_file_source() {
        let (_dir, path) = write_conf("rootdir=/system\n");
        let loader = ConfigLoader::with_system_path(&path);
        let cli = CliOverrides { rootdir: Some(PathBuf::from("/cli-root")), ..Default::default() };
        let resolved = loader.resolve(&cli).unwrap();
        assert_eq!(resolved.rootdir, PathBuf::from("/cli-root"));
    }

    #[test]
    fn unrecognized_key_is_a_warning_not_a_failure() {
        let (_dir, path) = write_conf("totally-unknown-key=value\n");
        let loader = ConfigLoader::with_system_path(&path);
        assert!(loader.resolve(&CliOverrides::default()).is_ok());
    }
}
