use pkghub_registry::{order_by_version, ArchiveResolver, Package, PackageRepo, PackagesIndex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{OperationError, Result};

/// A package version as shown on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PackageDetails {
    /// All versions of the package, newest first.
    pub versions: Vec<String>,
    pub package: Package,
    /// `None` when the archive could not be fetched or extracted.
    pub repo: Option<PackageRepo>,
}

/// Picks `version` of `name`, or its latest version when `version` is
/// `None`. Returns the selected package and all versions, newest first.
pub fn select_version(
    index: &PackagesIndex,
    name: &str,
    version: Option<&str>,
) -> Result<(Package, Vec<String>)> {
    let candidates: Vec<Package> = index
        .packages
        .iter()
        .filter(|p| p.name == name)
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(OperationError::PackageNotFound(name.to_string()));
    }

    let ordered = order_by_version(candidates)?;
    let versions = ordered.versions();
    let package = match version {
        None => ordered.latest().clone(),
        Some(version) => ordered.find(version).cloned().ok_or_else(|| {
            OperationError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
                available: versions.join(", "),
            }
        })?,
    };

    Ok((package, versions))
}

/// Selects a package version and resolves its archive. Archive failures
/// are logged and leave `repo` empty rather than failing the lookup.
pub async fn resolve_package_details(
    index: &PackagesIndex,
    resolver: &ArchiveResolver,
    name: &str,
    version: Option<&str>,
) -> Result<PackageDetails> {
    let (package, versions) = select_version(index, name, version)?;
    debug!(id = %package.id, "resolving package details");

    let repo = match resolver.resolve(&package).await {
        Ok(repo) => Some(repo),
        Err(err) => {
            warn!(id = %package.id, kind = ?err.kind(), "package archive not available");
            None
        }
    };

    Ok(PackageDetails {
        versions,
        package,
        repo,
    })
}
