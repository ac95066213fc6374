//! Release presets
//!
//! A preset names a distribution release and fills in everything that
//! differs between releases: where the binary and source repositories live
//! and which registry branch carries the ownership data.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

const KOJIPKGS: &str = "https://kojipkgs.fedoraproject.org/compose";

/// Binary and source repository locations of one release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotSources {
    pub repo: String,
    pub source_repo: String,
}

impl SnapshotSources {
    pub fn is_empty(&self) -> bool {
        self.repo.is_empty() && self.source_repo.is_empty()
    }
}

/// Known release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleasePreset {
    /// Fedora development branch
    Rawhide,

    /// Latest branched Fedora release (f39)
    Branched,

    Epel9,
    Epel8,
    Epel7,
}

impl ReleasePreset {
    pub const ALL: [ReleasePreset; 5] = [
        Self::Rawhide,
        Self::Branched,
        Self::Epel9,
        Self::Epel8,
        Self::Epel7,
    ];

    /// Parse preset from string
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                ConfigError::Custom(format!(
                    "Unknown release '{}'. Valid releases: rawhide, branched, epel9, epel8, epel7",
                    s
                ))
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rawhide => "rawhide",
            Self::Branched => "branched",
            Self::Epel9 => "epel9",
            Self::Epel8 => "epel8",
            Self::Epel7 => "epel7",
        }
    }

    /// Registry branch the ownership data is read from
    pub fn branch(&self) -> &'static str {
        match self {
            Self::Rawhide => "rawhide",
            Self::Branched => "f39",
            Self::Epel9 => "epel9",
            Self::Epel8 => "epel8",
            Self::Epel7 => "epel7",
        }
    }

    pub fn sources(&self) -> SnapshotSources {
        let compose = match self {
            Self::Rawhide => "rawhide/latest-Fedora-Rawhide/compose".to_string(),
            Self::Branched => "branched/latest-Fedora-39/compose".to_string(),
            Self::Epel9 | Self::Epel8 | Self::Epel7 => {
                format!("updates/{}/compose", self.as_str())
            }
        };
        SnapshotSources {
            repo: format!("{KOJIPKGS}/{compose}/Everything/x86_64/os/"),
            source_repo: format!("{KOJIPKGS}/{compose}/Everything/source/tree/"),
        }
    }
}

impl Default for ReleasePreset {
    fn default() -> Self {
        Self::Rawhide
    }
}

impl std::fmt::Display for ReleasePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
