//! Settings file.
//!
//! Everything has a default, so the file is optional. Example:
//!
//! ```toml
//! product_tag = "v6-1-1"
//!
//! [catalog]
//! url = "https://cmsweb.cern.ch"
//! attempts = 5
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GridError, GridResult};
use crate::retry::DEFAULT_ATTEMPTS;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Production tag interpolated into names and paths.
    pub product_tag: String,
    /// Prefix of request names and output dataset tags.
    pub request_prefix: String,
    /// Directory under `/store/user/<user>/` receiving the output.
    pub lfn_area: String,
    /// Search root for psets, relative to `$CMSSW_BASE/src`.
    pub pset_subdir: PathBuf,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSettings {
    pub url: String,
    pub attempts: u32,
    /// No timeout when absent.
    pub timeout_secs: Option<u64>,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
    /// Grid proxy PEM; `X509_USER_PROXY` is used when unset.
    pub proxy: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            product_tag: "v6-1-1".to_string(),
            request_prefix: "TopNanoAOD".to_string(),
            lfn_area: "topNanoAOD".to_string(),
            pset_subdir: PathBuf::from("PhysicsTools").join("NanoAOD"),
            catalog: CatalogSettings::default(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: "https://cmsweb.cern.ch".to_string(),
            attempts: DEFAULT_ATTEMPTS,
            timeout_secs: None,
            poll_interval_secs: 2,
            max_polls: 150,
            proxy: None,
        }
    }
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> GridResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GridError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> GridResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str, origin: &Path) -> GridResult<Self> {
        toml::from_str(content).map_err(|e| GridError::Settings {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn pset_root(&self, cmssw_base: &Path) -> PathBuf {
        cmssw_base.join("src").join(&self.pset_subdir)
    }
}

impl CatalogSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn proxy_path(&self) -> Option<PathBuf> {
        self.proxy
            .clone()
            .or_else(|| std::env::var_os("X509_USER_PROXY").map(PathBuf::from))
    }
}
