//! Package records as published in the registry index.
//!
//! A [`RawPackage`] is one entry of the index document exactly as the
//! registry publishes it. [`Package`] adds the synthesized `id`
//! (`{name}-{version}`) that the rest of the pipeline keys on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    error::{RegistryError, Result},
    nonempty::NonEmpty,
    version::PackageVersion,
};

/// One published version of one package, as listed in the index.
///
/// Unknown fields are ignored; a non-semver `version` or an empty `tags`
/// list fails deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawPackage {
    pub name: String,
    pub author: String,
    pub description: String,
    pub title: String,
    pub version: PackageVersion,
    pub archive_url: String,
    pub archive_sha256_url: String,
    pub tags: NonEmpty<String>,
}

/// A validated index entry together with its derived identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawPackage")]
pub struct Package {
    pub id: String,
    pub name: String,
    pub author: String,
    pub description: String,
    pub title: String,
    pub version: PackageVersion,
    pub archive_url: String,
    pub archive_sha256_url: String,
    pub tags: NonEmpty<String>,
}

impl From<RawPackage> for Package {
    fn from(raw: RawPackage) -> Self {
        Self {
            id: format!("{}-{}", raw.name, raw.version),
            name: raw.name,
            author: raw.author,
            description: raw.description,
            title: raw.title,
            version: raw.version,
            archive_url: raw.archive_url,
            archive_sha256_url: raw.archive_sha256_url,
            tags: raw.tags,
        }
    }
}

impl Package {
    /// Decodes a single index entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPackage`] when a required field is
    /// missing or has the wrong type, the version is not `MAJOR.MINOR.PATCH`,
    /// or `tags` is empty.
    pub fn decode(value: Value) -> Result<Self> {
        serde_json::from_value::<RawPackage>(value)
            .map(Package::from)
            .map_err(|err| RegistryError::InvalidPackage(err.to_string()))
    }

    /// Decodes every entry independently, dropping (and logging) the ones
    /// that fail so that one bad record never rejects its siblings.
    pub fn decode_array(values: Vec<Value>) -> Vec<Self> {
        values
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| {
                let name = value
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string();
                match Self::decode(value) {
                    Ok(package) => Some(package),
                    Err(err) => {
                        warn!(position, name = %name, "dropping invalid index entry: {err}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}
