//! Package configurations and the selection sent with a release.

use std::collections::BTreeMap;

use octopus_api::SelectedPackage;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A package version pinned by the job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfiguration {
    pub package_name: String,
    pub package_version: String,
}

impl PackageConfiguration {
    pub fn new(package_name: &str, package_version: &str) -> Self {
        Self {
            package_name: package_name.trim().to_string(),
            package_version: package_version.trim().to_string(),
        }
    }
}

impl std::str::FromStr for PackageConfiguration {
    type Err = String;

    /// Parse `name=version` (or `name:version`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, version) = s
            .split_once('=')
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| format!("expected NAME=VERSION, got '{s}'"))?;
        let config = PackageConfiguration::new(name, version);
        if config.package_name.is_empty() || config.package_version.is_empty() {
            return Err(format!("package name and version must be non-empty in '{s}'"));
        }
        Ok(config)
    }
}

/// A resolved `(package name, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSelection {
    pub package_name: String,
    pub version: String,
}

/// Packages selected for a release, unique by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSelectionSet {
    packages: BTreeMap<String, String>,
}

impl PackageSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `version` for `package_name`.
    ///
    /// A later selection for the same name replaces the earlier one; the
    /// replaced version is returned.
    pub fn insert(&mut self, selection: PackageSelection) -> Option<String> {
        let previous = self
            .packages
            .insert(selection.package_name.clone(), selection.version.clone());
        if let Some(old) = previous.as_deref() {
            if old != selection.version {
                warn!(
                    package = %selection.package_name,
                    replaced = %old,
                    version = %selection.version,
                    "package selected more than once; keeping the last version"
                );
            }
        }
        previous
    }

    pub fn version_of(&self, package_name: &str) -> Option<&str> {
        self.packages.get(package_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PackageSelection> + '_ {
        self.packages.iter().map(|(name, version)| PackageSelection {
            package_name: name.clone(),
            version: version.clone(),
        })
    }

    /// Wire form, ordered by package name.
    pub fn to_selected_packages(&self) -> Vec<SelectedPackage> {
        self.packages
            .iter()
            .map(|(name, version)| SelectedPackage::new(name.as_str(), version.as_str()))
            .collect()
    }
}

impl FromIterator<PackageSelection> for PackageSelectionSet {
    fn from_iter<I: IntoIterator<Item = PackageSelection>>(iter: I) -> Self {
        let mut set = PackageSelectionSet::new();
        for selection in iter {
            set.insert(selection);
        }
        set
    }
}
