//! Resolution of a package's archive into its repository contents.

use std::{
    io::{Cursor, Read},
    sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, warn};
use zip::{result::ZipError, ZipArchive};

use crate::{
    asset::AssetRef,
    error::{RegistryError, Result},
    http_client::{fetch_async, Fetcher},
    manifest::PackageManifest,
    nonempty::NonEmpty,
    package::Package,
};

pub const MANIFEST_FILE: &str = "_manifest.yml";
pub const README_FILE: &str = "README.md";
pub const PACKAGE_YML_FILE: &str = "package.yml";
pub const LICENSE_FILE: &str = "LICENSE";

/// Upper bound on the decompressed size of a single archive entry.
pub const MAX_ENTRY_BYTES: u64 = 8 * 1024 * 1024;

const REQUIRED_FILES: [&str; 3] = [MANIFEST_FILE, README_FILE, PACKAGE_YML_FILE];

static README_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("README image pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Everything a package archive contributes, next to the index record it
/// was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRepo {
    pub package: Package,
    pub manifest: PackageManifest,
    pub readme: String,
    /// `package.yml` first, then every other text file in archive order.
    pub package_yml: NonEmpty<SourceFile>,
    pub license: Option<String>,
}

impl PackageRepo {
    /// Image references in the README, in document order.
    pub fn readme_images(&self) -> Vec<&str> {
        README_IMAGE
            .captures_iter(&self.readme)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// Resolves an asset reference against the manifest's homepage.
    pub fn resolve_asset(&self, reference: &str) -> Result<String> {
        let homepage = self.manifest.homepage.as_deref().unwrap_or_default();
        AssetRef::resolve(homepage, reference)
    }
}

/// Named text entries of an unpacked archive.
pub trait ArchiveEntries {
    /// File entry names in archive order. Directory entries are omitted.
    fn entry_names(&self) -> Vec<String>;

    /// Decodes an entry as UTF-8. Returns `Ok(None)` if there is no such
    /// file and [`RegistryError::EntryEncoding`] if it is not valid UTF-8.
    /// Implementations may refuse oversized entries with
    /// [`RegistryError::EntryTooLarge`].
    fn read_text(&mut self, name: &str) -> Result<Option<String>>;
}

/// [`ArchiveEntries`] over an in-memory zip file. Entries are only
/// decompressed when read.
pub struct ZipEntries {
    url: String,
    archive: ZipArchive<Cursor<Vec<u8>>>,
    entry_limit: u64,
}

impl ZipEntries {
    pub fn new(url: &str, bytes: Vec<u8>) -> Result<Self> {
        let archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|source| RegistryError::InvalidArchive {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            url: url.to_string(),
            archive,
            entry_limit: MAX_ENTRY_BYTES,
        })
    }

    /// Overrides [`MAX_ENTRY_BYTES`] for entries read from this archive.
    pub fn with_entry_limit(mut self, limit: u64) -> Self {
        self.entry_limit = limit;
        self
    }
}

impl ArchiveEntries for ZipEntries {
    fn entry_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(String::from)
            .collect()
    }

    fn read_text(&mut self, name: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(source) => {
                return Err(RegistryError::InvalidArchive {
                    url: self.url.clone(),
                    source,
                })
            }
        };
        if file.is_dir() {
            return Ok(None);
        }

        // The declared size comes from the archive and is not trusted.
        let mut bytes = Vec::new();
        (&mut file)
            .take(self.entry_limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| RegistryError::InvalidArchive {
                url: self.url.clone(),
                source: ZipError::from(err),
            })?;
        if bytes.len() as u64 > self.entry_limit {
            return Err(RegistryError::EntryTooLarge {
                name: name.to_string(),
                limit: self.entry_limit,
            });
        }

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| RegistryError::EntryEncoding {
                name: name.to_string(),
            })
    }
}

fn require<E: ArchiveEntries + ?Sized>(entries: &mut E, name: &str) -> Result<String> {
    entries
        .read_text(name)?
        .ok_or_else(|| RegistryError::MissingEntry(name.to_string()))
}

/// Builds a [`PackageRepo`] from archive entries.
///
/// The manifest, README and `package.yml` must be present; `LICENSE` is
/// optional. Other entries that are not UTF-8 text are skipped.
pub fn extract_package_repo<E: ArchiveEntries + ?Sized>(
    package: &Package,
    entries: &mut E,
) -> Result<PackageRepo> {
    let names = entries.entry_names();

    if let Some(missing) = REQUIRED_FILES
        .iter()
        .find(|required| !names.iter().any(|name| name == *required))
    {
        return Err(RegistryError::MissingEntry(missing.to_string()));
    }

    let manifest = PackageManifest::parse(&package.id, &require(entries, MANIFEST_FILE)?)?;
    let readme = require(entries, README_FILE)?;
    let mut package_yml = NonEmpty::new(SourceFile {
        name: PACKAGE_YML_FILE.to_string(),
        content: require(entries, PACKAGE_YML_FILE)?,
    });
    let license = entries.read_text(LICENSE_FILE)?;

    for name in names {
        if REQUIRED_FILES.contains(&name.as_str()) || name == LICENSE_FILE {
            continue;
        }
        match entries.read_text(&name) {
            Ok(Some(content)) => package_yml.push(SourceFile { name, content }),
            Ok(None) => {}
            Err(RegistryError::EntryEncoding { .. }) => {
                warn!(id = %package.id, entry = %name, "skipping non-text archive entry");
            }
            Err(err) => return Err(err),
        }
    }

    debug!(
        id = %package.id,
        files = package_yml.len(),
        license = license.is_some(),
        "package archive extracted"
    );

    Ok(PackageRepo {
        package: package.clone(),
        manifest,
        readme,
        package_yml,
        license,
    })
}

/// Unpacks already downloaded archive bytes for `package`.
pub fn resolve_archive_bytes(package: &Package, bytes: Vec<u8>) -> Result<PackageRepo> {
    let mut entries = ZipEntries::new(&package.archive_url, bytes)?;
    extract_package_repo(package, &mut entries)
}

/// Downloads and unpacks package archives. Nothing is cached.
#[derive(Clone)]
pub struct ArchiveResolver {
    fetcher: Arc<dyn Fetcher>,
}

impl ArchiveResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(&self, package: &Package) -> Result<PackageRepo> {
        debug!(id = %package.id, url = %package.archive_url, "resolving package archive");

        let bytes = fetch_async(Arc::clone(&self.fetcher), package.archive_url.clone())
            .await
            .inspect_err(|err| {
                error!(id = %package.id, url = %package.archive_url, "failed to fetch archive: {err}")
            })?;

        resolve_archive_bytes(package, bytes).inspect_err(|err| {
            error!(id = %package.id, url = %package.archive_url, "failed to extract archive: {err}")
        })
    }
}
