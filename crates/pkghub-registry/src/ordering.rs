//! Version ordering and grouping over package lists.
//!
//! The index lists every published version of every package as a flat
//! array. These helpers impose a numeric order on versions, group the flat
//! list by package name and collapse it to the latest version per name.

use std::collections::{btree_map, BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    error::{RegistryError, Result},
    nonempty::NonEmpty,
    package::Package,
};

/// Versions of a single package, highest first.
///
/// Every element shares the same `name`; the list is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderedByVersion(NonEmpty<Package>);

/// Sorts packages that share one name by descending version.
///
/// Packages with numerically equal versions keep their input order.
///
/// # Errors
///
/// - [`RegistryError::EmptyPackageList`] for an empty input
/// - [`RegistryError::MixedPackageNames`] if the names differ
pub fn order_by_version(packages: Vec<Package>) -> Result<OrderedByVersion> {
    let mut packages = NonEmpty::from_vec(packages)
        .ok_or(RegistryError::EmptyPackageList)?
        .into_vec();

    let expected = packages[0].name.clone();
    if let Some(stranger) = packages.iter().find(|p| p.name != expected) {
        return Err(RegistryError::MixedPackageNames {
            expected,
            found: stranger.name.clone(),
        });
    }

    packages.sort_by(|a, b| b.version.cmp_numeric(&a.version));

    NonEmpty::from_vec(packages)
        .map(OrderedByVersion)
        .ok_or(RegistryError::EmptyPackageList)
}

impl OrderedByVersion {
    pub fn name(&self) -> &str {
        &self.0.first().name
    }

    pub fn latest(&self) -> &Package {
        self.0.first()
    }

    /// Version strings, highest first, without duplicates.
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = Vec::with_capacity(self.0.len());
        for package in &self.0 {
            if versions.last().map(String::as_str) != Some(package.version.as_str()) {
                versions.push(package.version.to_string());
            }
        }
        versions
    }

    pub fn find(&self, version: &str) -> Option<&Package> {
        self.0.iter().find(|p| p.version == version)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Package> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Package] {
        self.0.as_slice()
    }

    pub fn into_vec(self) -> Vec<Package> {
        self.0.into_vec()
    }
}

/// Packages partitioned by name, each partition ordered by version.
///
/// Every key equals the `name` of every package in its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupedByVersion(BTreeMap<String, OrderedByVersion>);

/// Partitions packages by name and orders every partition by version.
///
/// # Errors
///
/// Returns [`RegistryError::EmptyPackageList`] for an empty input; an index
/// without packages is not a valid grouping input.
pub fn group_by_version(packages: Vec<Package>) -> Result<GroupedByVersion> {
    if packages.is_empty() {
        return Err(RegistryError::EmptyPackageList);
    }

    let mut partitions: BTreeMap<String, Vec<Package>> = BTreeMap::new();
    for package in packages {
        partitions
            .entry(package.name.clone())
            .or_default()
            .push(package);
    }

    let groups = partitions
        .into_iter()
        .map(|(name, group)| order_by_version(group).map(|ordered| (name, ordered)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    GroupedByVersion::from_groups(groups)
}

impl GroupedByVersion {
    /// Wraps pre-built groups, checking that each key matches its group.
    pub fn from_groups(groups: BTreeMap<String, OrderedByVersion>) -> Result<Self> {
        for (key, group) in &groups {
            if let Some(stranger) = group.iter().find(|p| &p.name != key) {
                return Err(RegistryError::MixedPackageNames {
                    expected: key.clone(),
                    found: stranger.name.clone(),
                });
            }
        }
        Ok(Self(groups))
    }

    pub fn get(&self, name: &str) -> Option<&OrderedByVersion> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Head of every group, in name order.
    pub fn latest(&self) -> Vec<&Package> {
        self.0.values().map(OrderedByVersion::latest).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, OrderedByVersion> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, OrderedByVersion> {
        self.0
    }
}

/// Keeps the highest version of every package name.
///
/// Names appear in the order of their first occurrence. When two entries
/// carry the same version the first one seen wins.
pub fn latest_per_name(packages: &[Package]) -> Vec<Package> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<&Package> = Vec::new();

    for package in packages {
        match slots.get(package.name.as_str()) {
            Some(&slot) => {
                if package.version.cmp_numeric(&latest[slot].version).is_gt() {
                    latest[slot] = package;
                }
            }
            None => {
                slots.insert(&package.name, latest.len());
                latest.push(package);
            }
        }
    }

    latest.into_iter().cloned().collect()
}
