//! Validated `MAJOR.MINOR.PATCH` package versions.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("valid version pattern"));

/// A version string guaranteed to match `MAJOR.MINOR.PATCH` with numeric
/// components. [`PackageVersion::parse`] is the only way to obtain one.
///
/// Ordering is numeric on the three components (`1.10.0 > 1.9.0`). Two
/// spellings of the same number (`1.0.0` and `01.0.0`) compare by their raw
/// text only to keep `Ord` consistent with `Eq`; [`compare_versions`] treats
/// them as equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageVersion {
    raw: String,
    parts: [u64; 3],
}

impl PackageVersion {
    pub fn parse(input: &str) -> Result<Self> {
        if !VERSION_PATTERN.is_match(input) {
            return Err(RegistryError::InvalidVersion(input.to_string()));
        }

        let mut parts = [0u64; 3];
        for (slot, component) in parts.iter_mut().zip(input.split('.')) {
            *slot = component
                .parse()
                .map_err(|_| RegistryError::InvalidVersion(input.to_string()))?;
        }

        Ok(Self {
            raw: input.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u64 {
        self.parts[0]
    }

    pub fn minor(&self) -> u64 {
        self.parts[1]
    }

    pub fn patch(&self) -> u64 {
        self.parts[2]
    }

    /// Numeric comparison ignoring the textual spelling.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

/// Compares two raw version strings numerically, component by component.
///
/// Returns [`Ordering::Greater`] when `a` is the higher version, so sorting
/// with the arguments swapped yields highest-first order. Inputs that are not
/// `MAJOR.MINOR.PATCH` are rejected rather than read as zero.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    let a = PackageVersion::parse(a)?;
    let b = PackageVersion::parse(b)?;
    Ok(a.cmp_numeric(&b))
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_numeric(other)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PackageVersion {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PackageVersion> for String {
    fn from(value: PackageVersion) -> Self {
        value.raw
    }
}

impl AsRef<str> for PackageVersion {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl PartialEq<str> for PackageVersion {
    fn eq(&self, other: &str) -> bool {
        self.raw == other
    }
}

impl PartialEq<&str> for PackageVersion {
    fn eq(&self, other: &&str) -> bool {
        self.raw == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let v = PackageVersion::parse("1.20.3").unwrap();
        assert_eq!((v.major(), v.minor(), v.patch()), (1, 20, 3));
        assert_eq!(v.as_str(), "1.20.3");
        assert_eq!(v.to_string(), "1.20.3");
    }

    #[test]
    fn test_parse_rejects_non_semver() {
        for input in [
            "", "1", "1.0", "1.0.0.0", "x.x.x", "v1.0.0", "1.0.0-beta", " 1.0.0", "1..0",
            "١.٠.٠",
        ] {
            assert!(
                matches!(PackageVersion::parse(input), Err(RegistryError::InvalidVersion(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let result = PackageVersion::parse("99999999999999999999999.0.0");
        assert!(matches!(result, Err(RegistryError::InvalidVersion(_))));
    }

    #[test]
    fn test_compare_versions_numeric() {
        assert_eq!(compare_versions("2.0.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("1.2.0", "1.2.0").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("1.9.0", "1.10.0").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("0.0.10", "0.0.9").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("01.0.0", "1.0.0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_compare_versions_malformed() {
        assert!(matches!(
            compare_versions("1.a.0", "1.0.0"),
            Err(RegistryError::InvalidVersion(v)) if v == "1.a.0"
        ));
    }

    #[test]
    fn test_serde() {
        let v: PackageVersion = serde_json::from_str(r#""0.1.2""#).unwrap();
        assert_eq!(v, "0.1.2");
        assert_eq!(serde_json::to_string(&v).unwrap(), r#""0.1.2""#);
        assert!(serde_json::from_str::<PackageVersion>(r#""latest""#).is_err());
    }

    #[test]
    fn test_ord_consistent_with_eq() {
        let a = PackageVersion::parse("1.0.0").unwrap();
        let b = PackageVersion::parse("01.0.0").unwrap();
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp_numeric(&b), Ordering::Equal);
    }
}
