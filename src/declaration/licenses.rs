//! SPDX license and exception reference set.
//!
//! The list ships embedded in the binary (SPDX `licenses.json` /
//! `exceptions.json` format) and is parsed once. A complete list published by
//! SPDX can be loaded from disk instead.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use serde::Deserialize;

const EMBEDDED_LICENSES: &str = include_str!("../../resources/spdx/licenses.json");
const EMBEDDED_EXCEPTIONS: &str = include_str!("../../resources/spdx/exceptions.json");

static EMBEDDED: LazyLock<Arc<LicenseList>> = LazyLock::new(|| {
    let list = LicenseList::from_json(EMBEDDED_LICENSES, EMBEDDED_EXCEPTIONS)
        .expect("Invalid embedded SPDX license list");
    Arc::new(list)
});

/// One entry of the SPDX license list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub license_id: String,
    pub name: String,
    #[serde(default)]
    pub is_osi_approved: bool,
    #[serde(default)]
    pub is_deprecated_license_id: bool,
}

/// One entry of the SPDX exception list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    pub license_exception_id: String,
    pub name: String,
    #[serde(default)]
    pub is_deprecated_license_id: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LicenseFile {
    license_list_version: Option<String>,
    licenses: Vec<LicenseInfo>,
}

#[derive(Deserialize)]
struct ExceptionFile {
    exceptions: Vec<ExceptionInfo>,
}

/// Known license and exception identifiers, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LicenseList {
    version: Option<String>,
    licenses: HashMap<String, LicenseInfo>,
    exceptions: HashMap<String, ExceptionInfo>,
}

impl LicenseList {
    /// The list compiled into the binary.
    pub fn embedded() -> Arc<LicenseList> {
        Arc::clone(&EMBEDDED)
    }

    /// Parse a license list and an exception list in SPDX JSON format.
    pub fn from_json(licenses_json: &str, exceptions_json: &str) -> serde_json::Result<Self> {
        let license_file: LicenseFile = serde_json::from_str(licenses_json)?;
        let exception_file: ExceptionFile = serde_json::from_str(exceptions_json)?;

        let licenses = license_file
            .licenses
            .into_iter()
            .map(|info| (info.license_id.to_ascii_lowercase(), info))
            .collect();
        let exceptions = exception_file
            .exceptions
            .into_iter()
            .map(|info| (info.license_exception_id.to_ascii_lowercase(), info))
            .collect();

        Ok(Self {
            version: license_file.license_list_version,
            licenses,
            exceptions,
        })
    }

    /// Load the list from files on disk. A missing path falls back to the
    /// embedded data for that half of the list.
    pub fn load(licenses_path: Option<&Path>, exceptions_path: Option<&Path>) -> Result<Arc<Self>> {
        if licenses_path.is_none() && exceptions_path.is_none() {
            return Ok(Self::embedded());
        }

        let licenses_json = read_or_embedded(licenses_path, EMBEDDED_LICENSES)?;
        let exceptions_json = read_or_embedded(exceptions_path, EMBEDDED_EXCEPTIONS)?;
        let list = Self::from_json(&licenses_json, &exceptions_json)
            .context("Failed to parse SPDX license list")?;

        log::debug!(
            "Loaded SPDX license list {} ({} licenses, {} exceptions)",
            list.version().unwrap_or("unknown"),
            list.licenses.len(),
            list.exceptions.len()
        );
        Ok(Arc::new(list))
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Look up a license identifier, ignoring case.
    pub fn license(&self, id: &str) -> Option<&LicenseInfo> {
        self.licenses.get(&id.to_ascii_lowercase())
    }

    /// Look up an exception identifier, ignoring case.
    pub fn exception(&self, id: &str) -> Option<&ExceptionInfo> {
        self.exceptions.get(&id.to_ascii_lowercase())
    }

    pub fn license_count(&self) -> usize {
        self.licenses.len()
    }
}

fn read_or_embedded(path: Option<&Path>, embedded: &str) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read license list {}", path.display())),
        None => Ok(embedded.to_string()),
    }
}
