use pkghub_registry::{latest_per_name, Package};

pub fn is_featured<S: AsRef<str>>(package: &Package, featured: &[S]) -> bool {
    featured.iter().any(|name| name.as_ref() == package.name)
}

/// The latest version of each featured package, in `featured` order.
/// Names absent from `packages` are skipped.
pub fn featured<S: AsRef<str>>(packages: &[Package], featured: &[S]) -> Vec<Package> {
    let latest = latest_per_name(packages);
    featured
        .iter()
        .filter_map(|name| latest.iter().find(|p| p.name == name.as_ref()).cloned())
        .collect()
}
