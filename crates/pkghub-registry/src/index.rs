//! The registry-wide package index document.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, Utc};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;

use crate::{
    error::{RegistryError, Result},
    ordering::{latest_per_name, order_by_version},
    package::Package,
};

/// Name reserved for registry smoke tests; never shown to consumers.
pub const SENTINEL_PACKAGE: &str = "dummy-package";

/// Every known package version plus the time the index was generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagesIndex {
    /// Unix seconds.
    pub last_update: i64,
    pub packages: Vec<Package>,
}

/// Document shape before per-entry validation.
#[derive(Deserialize)]
struct RawIndex {
    #[serde(deserialize_with = "unix_seconds")]
    last_update: i64,
    packages: Vec<Value>,
}

fn unix_seconds<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SecondsVisitor;

    impl<'de> Visitor<'de> for SecondsVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a unix timestamp in seconds")
        }

        fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            i64::try_from(v).map_err(|_| E::custom("timestamp out of range"))
        }

        fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_finite() && v.abs() < i64::MAX as f64 {
                Ok(v.trunc() as i64)
            } else {
                Err(E::custom("timestamp out of range"))
            }
        }
    }

    deserializer.deserialize_any(SecondsVisitor)
}

impl PackagesIndex {
    /// Parses and validates raw index bytes.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::JsonError`] if the bytes are not JSON
    /// - [`RegistryError::InvalidIndex`] if the document lacks `last_update`
    ///   or `packages`, or they have the wrong type
    ///
    /// Individual malformed packages never fail the document; they are
    /// dropped by [`Package::decode_array`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(bytes)?;
        Self::decode(document)
    }

    pub fn decode(document: Value) -> Result<Self> {
        let raw: RawIndex = serde_json::from_value(document)
            .map_err(|err| RegistryError::InvalidIndex(err.to_string()))?;

        Ok(Self {
            last_update: raw.last_update,
            packages: Package::decode_array(raw.packages),
        })
    }

    /// Drops entries named [`SENTINEL_PACKAGE`].
    pub fn without_sentinels(mut self) -> Self {
        self.packages.retain(|p| p.name != SENTINEL_PACKAGE);
        self
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_update, 0)
    }

    /// Distinct package names in order of first appearance.
    pub fn package_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.packages
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn find(&self, name: &str, version: &str) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.name == name && p.version == version)
    }

    /// All versions of `name`, highest first. Empty for an unknown name.
    pub fn versions_of(&self, name: &str) -> Vec<String> {
        let packages: Vec<Package> = self
            .packages
            .iter()
            .filter(|p| p.name == name)
            .cloned()
            .collect();

        order_by_version(packages)
            .map(|ordered| ordered.versions())
            .unwrap_or_default()
    }

    pub fn latest_of(&self, name: &str) -> Option<&Package> {
        self.packages
            .iter()
            .filter(|p| p.name == name)
            .fold(None, |best: Option<&Package>, p| match best {
                Some(b) if !p.version.cmp_numeric(&b.version).is_gt() => Some(b),
                _ => Some(p),
            })
    }

    /// One entry per package name, keeping the highest version.
    pub fn latest_packages(&self) -> Vec<Package> {
        latest_per_name(&self.packages)
    }
}
